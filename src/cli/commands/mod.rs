//! Subcommand implementations.

pub mod deps;
pub mod migrate;
pub mod serve;
