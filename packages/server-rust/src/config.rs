//! `AlarmGenConfig`: the CLI-overridable configuration surface covering
//! every option enumerated in distilled spec §6's Configuration list.

use std::time::Duration;

use clap::Parser;

use alarmgen_core::DEFAULT_PARTITION_COUNT;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Top-level configuration for an alarm-generator instance, loaded via
/// `clap` CLI overrides layered on defaults (donor pattern: `ServerConfig`).
#[derive(Debug, Clone, Parser)]
#[command(name = "alarmgen-server", about = "Alarm generator for UVE streams")]
pub struct AlarmGenConfig {
    /// This instance's worker id, used in discovery registration and as the
    /// `host` half of alarm correlation tokens.
    #[arg(long, env = "ALARMGEN_WORKER_ID")]
    pub worker_id: String,

    /// Introspection HTTP bind host.
    #[arg(long, env = "ALARMGEN_HTTP_HOST", default_value = "0.0.0.0")]
    pub http_host: String,

    /// Introspection HTTP port.
    #[arg(long, env = "ALARMGEN_HTTP_PORT", default_value_t = 8089)]
    pub http_port: u16,

    /// Log destination: `stdout` or a file path.
    #[arg(long, env = "ALARMGEN_LOG_DESTINATION", default_value = "stdout")]
    pub log_destination: String,

    /// Log level filter (tracing-subscriber `EnvFilter` syntax).
    #[arg(long, env = "ALARMGEN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, env = "ALARMGEN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Syslog facility, kept for parity with the original's log-facility
    /// option; only meaningful when `log_destination` names a syslog sink.
    #[arg(long, env = "ALARMGEN_LOG_FACILITY", default_value = "local0")]
    pub log_facility: String,

    /// UVE cache (Redis) password.
    #[arg(long, env = "ALARMGEN_CACHE_PASSWORD", default_value = "")]
    pub cache_password: String,

    /// UVE cache (Redis) endpoints, used when service discovery is disabled.
    #[arg(long, env = "ALARMGEN_CACHE_ENDPOINTS", value_delimiter = ',')]
    pub cache_endpoints: Vec<String>,

    /// Cluster-membership quorum endpoints (e.g. ZooKeeper).
    #[arg(long, env = "ALARMGEN_QUORUM_ENDPOINTS", value_delimiter = ',')]
    pub quorum_endpoints: Vec<String>,

    /// Total number of partitions in the keyspace.
    #[arg(long, env = "ALARMGEN_PARTITION_COUNT", default_value_t = DEFAULT_PARTITION_COUNT)]
    pub partition_count: u32,

    /// Peer alarm-generator instance ids, used only in no-discovery mode.
    #[arg(long, env = "ALARMGEN_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Ingestion-broker (Kafka) bootstrap endpoints.
    #[arg(long, env = "ALARMGEN_INGESTION_BROKERS", value_delimiter = ',')]
    pub ingestion_brokers: Vec<String>,

    /// Closed set of UVE table names this instance evaluates alarms for.
    #[arg(long, env = "ALARMGEN_TABLES", value_delimiter = ',')]
    pub tables: Vec<String>,
}

impl AlarmGenConfig {
    /// Loop pacing floor (§5): if a state-compression iteration completes
    /// faster than this, sleep the remainder.
    #[must_use]
    pub fn loop_pacing_floor(&self) -> Duration {
        Duration::from_millis(500)
    }

    /// Per-send publish timeout (§4.G, §5).
    #[must_use]
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(2)
    }

    /// Publisher batch linger (§4.G: "short linger (~3s)").
    #[must_use]
    pub fn publish_linger(&self) -> Duration {
        Duration::from_secs(3)
    }

    /// Publisher batch size target (§4.G: "small batch (~10 messages)").
    #[must_use]
    pub fn publish_batch_size(&self) -> usize {
        10
    }

    /// Partition start/stop wait (§4.H, §5: "~60s").
    #[must_use]
    pub fn partition_transition_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }
}
