//! Telemetry and logging infrastructure
//!
//! Provides structured logging with tracing.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogGuard};
