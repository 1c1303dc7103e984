//! In-memory adapters.

pub mod dependency_repository;

pub use dependency_repository::InMemoryDependencyRepository;
