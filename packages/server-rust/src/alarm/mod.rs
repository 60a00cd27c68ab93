//! Alarm Plugin Registry (§4.E): per-table evaluators, resolved by name,
//! with a missing or failed evaluator never blocking others.

pub mod registry;

pub use registry::{AlarmEvaluator, AlarmPluginRegistry};
