//! Typed error enums at each component boundary.
//!
//! Error kind numbering below matches the Error Handling Design section:
//! kind 1 (transient external), kind 2 (plugin load failure), kind 3
//! (config/bootstrap failure). Kinds 4 and 5 (ownership-transition timeout,
//! programming invariant violation) are not typed errors -- see `DESIGN.md`.

/// Error kind 1: cache read failure.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable")]
    Unavailable,
    /// A partial read: some struct-types could not be fetched. The caller
    /// MAY still use `partial` but MUST downgrade its success result.
    #[error("partial cache read: {missing} struct-type(s) unavailable")]
    PartialRead { missing: usize },
    #[error("failed to decode cache response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Error kind 1: publish failure.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("producer unavailable")]
    ProducerUnavailable,
    #[error("publish timed out")]
    Timeout,
    #[error("publish rejected by broker")]
    Rejected,
}

/// Error kind 1: ingestion-stream read failure.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("ingestion stream closed")]
    StreamClosed,
    #[error("failed to decode ingestion message: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Error kind 2: plugin load failure. Logged once at startup; the plugin is
/// excluded and this error never propagates past the registry boundary.
#[derive(Debug, thiserror::Error)]
#[error("failed to load alarm plugin {table:?}/{name:?}: {reason}")]
pub struct PluginLoadError {
    pub table: String,
    pub name: String,
    pub reason: String,
}

/// Error kind 3: config/bootstrap failure. The Partition Manager retries
/// registration on a backoff rather than propagating this past startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("no membership quorum available")]
    NoQuorum,
    #[error("no-discovery mode configured with an empty peer list")]
    NoPeerList,
}
