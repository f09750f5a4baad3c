#[cfg(not(any(feature = "sqlite", feature = "postgresql")))]
compile_error!("enable at least one database driver feature: `sqlite` or `postgresql`");

pub mod config;
pub mod connection;
pub mod model;
pub mod parameters;
pub mod plan;
pub mod query;
pub mod report;
pub mod result;
pub mod runner;
#[cfg(feature = "postgresql")]
pub mod runner_postgresql;
#[cfg(feature = "sqlite")]
pub mod runner_sqlite;
pub mod str_utils;

// Re-export types for convenience
pub use config::{Backend, RunnerConfig};
pub use connection::{DatabaseConnection, check_driver};
pub use model::{LogoType, PaperColor, Ticket};
pub use parameters::{Parameter, ParameterType, ParameterValue};
pub use query::{QueryDef, QueryDefinitions};
pub use result::{CatalogueError, QueryResult, Result};
pub use runner::{RunSummary, Runner};
#[cfg(feature = "postgresql")]
pub use runner_postgresql::query_run_postgresql;
#[cfg(feature = "sqlite")]
pub use runner_sqlite::query_run_sqlite;

// Re-export third-party types used in the public API to provide fallback for dependency conflicts
pub use serde_json::Value as JsonValue;

#[cfg(feature = "sqlite")]
pub use rusqlite::Connection as SqliteConnection;
