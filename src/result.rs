use thiserror::Error;

/// Main error type for the catalogue runner
#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(
        "No database driver for {backend}: rebuild with the `{feature}` feature to connect to this database"
    )]
    DriverUnavailable {
        backend: String,
        feature: &'static str,
    },
    #[error("Unsupported database URL '{0}': expected postgres://, postgresql:// or sqlite:")]
    UnsupportedUrl(String),
    #[error(
        "No database at {target}: check the database name and host, or restore the catalogue backup locally"
    )]
    ConnectionFailed {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("Query not found: {0}")]
    QueryNotFound(String),
    #[error("Parameter not provided: {0}")]
    ParameterNotProvided(String),
    #[error("Parameter type mismatch: expected {expected}, got {got}")]
    ParameterTypeMismatch { expected: String, got: String },
}

impl CatalogueError {
    pub fn new_query_not_found(name: impl Into<String>) -> Self {
        CatalogueError::QueryNotFound(name.into())
    }

    pub fn new_parameter_not_provided(name: impl Into<String>) -> Self {
        CatalogueError::ParameterNotProvided(name.into())
    }

    pub fn new_parameter_type_mismatch(
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        CatalogueError::ParameterTypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }
}

/// Type alias for Results using CatalogueError
pub type Result<T> = std::result::Result<T, CatalogueError>;

/// Outcome of running one named query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// The SQL actually sent to the database, placeholders rewritten for the backend
    pub sql_statement: String,
    /// Rows returned by a read, one JSON object per row in `returns` order
    pub data: Vec<serde_json::Value>,
    /// Rows affected by a write, or rows streamed by a read
    pub rows_affected: u64,
}
