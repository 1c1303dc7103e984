//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty stdout output
//! - Rolling JSON log files
//! - Audit trail sinks

pub mod audit;
pub mod config;
pub mod logger;

pub use audit::{JsonlAuditSink, TracingAuditSink};
pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
