//! HTTP adapters.

pub mod dependencies_http;

pub use dependencies_http::{DependencyHttpConfig, DependencyHttpServer, TEAM_HEADER};
