//! Storage layer for schedule and fleet directory data.
//!
//! Access goes through the Repository pattern so storage backends can be
//! swapped: a Diesel/Postgres implementation for deployment and an
//! in-memory implementation for unit testing and local development.
//!
//! There is deliberately no process-global repository instance. The
//! application entry point builds one through [`RepositoryFactory`] and
//! threads it through explicitly; tests construct their own.
//!
//! ```ignore
//! use busfleet::db::{RepositoryFactory, RepositoryType};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = RepositoryFactory::create(RepositoryType::Local, None).await?;
//!     let healthy = repo.health_check().await?;
//!     assert!(healthy);
//!     Ok(())
//! }
//! ```

// Feature flag priority: postgres > local
// When multiple features are enabled (e.g., --all-features), postgres takes precedence.
#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    DirectoryRepository, ErrorContext, FullRepository, RepositoryError, RepositoryResult,
    ScheduleRepository,
};
