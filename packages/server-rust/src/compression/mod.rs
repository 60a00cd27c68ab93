//! State-Compression Loop (§4.F): drains notification sets, fetches
//! authoritative UVE contents, diffs, evaluates alarms, and publishes.

pub mod loop_;

pub use loop_::StateCompressionLoop;
