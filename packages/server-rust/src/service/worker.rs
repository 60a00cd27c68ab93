//! Generic background worker: an mpsc-fed task loop with periodic ticks and
//! cooperative shutdown, shared by the partition ingestion worker and the
//! state-compression loop.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Trait for tasks executed by [`BackgroundWorker`].
#[async_trait]
pub trait BackgroundRunnable: Send + 'static {
    type Task: Send + 'static;

    /// Handles one task pulled off the worker's queue.
    async fn run(&mut self, task: Self::Task);

    /// Called once per tick interval when the task queue is idle.
    async fn on_tick(&mut self) {}

    /// Called once after the shutdown signal fires, before the loop exits.
    async fn shutdown(&mut self) {}
}

/// Drives a [`BackgroundRunnable`] from an mpsc channel, interleaving
/// queued tasks with periodic ticks until told to shut down.
pub struct BackgroundWorker<T> {
    sender: mpsc::Sender<T>,
    handle: JoinHandle<()>,
}

impl<T: Send + 'static> BackgroundWorker<T> {
    /// Spawns the worker loop on the current tokio runtime.
    ///
    /// `tick_interval` governs how often `on_tick` fires when no task is
    /// waiting; `shutdown_rx` is a `watch` channel that signals `true` to
    /// stop the loop (the same contract `ShutdownController` publishes).
    pub fn spawn<R>(
        mut runnable: R,
        queue_capacity: usize,
        tick_interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Self
    where
        R: BackgroundRunnable<Task = T>,
    {
        let (sender, mut receiver) = mpsc::channel::<T>(queue_capacity);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    task = receiver.recv() => {
                        match task {
                            Some(task) => runnable.run(task).await,
                            None => break,
                        }
                    }
                    _ = ticker.tick() => {
                        runnable.on_tick().await;
                    }
                }
            }

            runnable.shutdown().await;
        });

        Self { sender, handle }
    }

    /// Enqueues a task. Returns the task back on error if the worker has
    /// already shut down and dropped its receiver.
    pub async fn submit(&self, task: T) -> Result<(), mpsc::error::SendError<T>> {
        self.sender.send(task).await
    }

    /// A clone of the task sender, for use by multiple producers.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<T> {
        self.sender.clone()
    }

    /// Awaits worker task completion (normally driven by the shutdown signal).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying task panicked.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.handle.await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct Counter {
        runs: Arc<AtomicUsize>,
        ticks: Arc<AtomicUsize>,
        shutdowns: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BackgroundRunnable for Counter {
        type Task = u32;

        async fn run(&mut self, _task: u32) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_tick(&mut self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        async fn shutdown(&mut self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn processes_submitted_tasks_and_shuts_down_cleanly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::new(AtomicUsize::new(0));
        let shutdowns = Arc::new(AtomicUsize::new(0));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = BackgroundWorker::spawn(
            Counter {
                runs: runs.clone(),
                ticks: ticks.clone(),
                shutdowns: shutdowns.clone(),
            },
            16,
            Duration::from_millis(5),
            shutdown_rx,
        );

        for i in 0..5u32 {
            worker.submit(i).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        shutdown_tx.send(true).unwrap();
        worker.join().await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 5);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert!(ticks.load(Ordering::SeqCst) >= 1);
    }
}
