//! Introspection HTTP networking: configuration, router assembly, request
//! middleware, and graceful-shutdown control.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::*;
pub use handlers::AppState;
pub use module::NetworkModule;
pub use shutdown::*;
