//! Infrastructure layer: configuration loading, logging and audit output.

pub mod config;
pub mod logging;
