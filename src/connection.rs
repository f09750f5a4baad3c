use crate::{
    CatalogueError, QueryDefinitions,
    config::{Backend, RunnerConfig},
    result::QueryResult,
};
use tracing::{debug, warn};

/// Live PostgreSQL session: the client plus the task driving its socket
#[cfg(feature = "postgresql")]
pub struct PostgresConnection {
    client: tokio_postgres::Client,
    driver: tokio::task::JoinHandle<()>,
}

#[cfg(feature = "postgresql")]
impl PostgresConnection {
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }
}

/// Database connection enum that holds different database backends.
/// Dropping it releases the connection; [`DatabaseConnection::close`] does the same and waits for it.
pub enum DatabaseConnection {
    /// SQLite connection
    #[cfg(feature = "sqlite")]
    SQLite(rusqlite::Connection),
    /// PostgreSQL connection
    #[cfg(feature = "postgresql")]
    PostgreSQL(PostgresConnection),
}

/// Fail fast when the URL names a backend this build has no driver for.
/// Silent: callers log the outcome once per run.
pub fn check_driver(config: &RunnerConfig) -> Result<Backend, CatalogueError> {
    let backend = config.backend()?;
    if backend.is_available() {
        Ok(backend)
    } else {
        Err(CatalogueError::DriverUnavailable {
            backend: backend.to_string(),
            feature: backend.feature(),
        })
    }
}

impl DatabaseConnection {
    /// Open one connection to the configured database
    pub async fn open(config: &RunnerConfig) -> Result<Self, CatalogueError> {
        let backend = check_driver(config)?;
        let target = config.redacted_url();

        match backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite => {
                let conn = open_sqlite(config).map_err(|e| connection_failed(&target, e))?;
                debug!(url = %target, "opened SQLite connection");
                Ok(DatabaseConnection::SQLite(conn))
            }
            #[cfg(feature = "postgresql")]
            Backend::PostgreSql => {
                let conn = open_postgresql(config)
                    .await
                    .map_err(|e| connection_failed(&target, e))?;
                debug!(url = %target, "opened PostgreSQL connection");
                Ok(DatabaseConnection::PostgreSQL(conn))
            }
            #[allow(unreachable_patterns)]
            other => Err(CatalogueError::DriverUnavailable {
                backend: other.to_string(),
                feature: other.feature(),
            }),
        }
    }

    /// Open a throwaway connection to prove the database is reachable, then release it
    pub async fn probe(config: &RunnerConfig) -> Result<(), CatalogueError> {
        let conn = Self::open(config).await?;
        conn.close().await;
        Ok(())
    }

    pub fn backend(&self) -> Backend {
        match self {
            #[cfg(feature = "sqlite")]
            DatabaseConnection::SQLite(_) => Backend::Sqlite,
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(_) => Backend::PostgreSql,
        }
    }

    /// Release the connection and wait until the backend has shut it down
    pub async fn close(self) {
        match self {
            #[cfg(feature = "sqlite")]
            DatabaseConnection::SQLite(conn) => {
                if let Err((_, e)) = conn.close() {
                    warn!("SQLite connection did not close cleanly: {e}");
                }
            }
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(PostgresConnection { client, driver }) => {
                // The driver task ends once its client is gone
                drop(client);
                if let Err(e) = driver.await {
                    warn!("PostgreSQL connection task failed: {e}");
                }
            }
        }
        debug!("connection released");
    }

    /// Stream the rows of a read query into `on_row`
    pub async fn query_each(
        &self,
        queries: &QueryDefinitions,
        query_name: &str,
        request_params: &serde_json::Value,
        on_row: &mut dyn FnMut(serde_json::Value) -> anyhow::Result<()>,
    ) -> anyhow::Result<QueryResult> {
        match self {
            #[cfg(feature = "sqlite")]
            DatabaseConnection::SQLite(conn) => crate::runner_sqlite::query_each_sqlite(
                conn,
                queries,
                query_name,
                request_params,
                on_row,
            ),
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(conn) => {
                crate::runner_postgresql::query_each_postgresql(
                    &conn.client,
                    queries,
                    query_name,
                    request_params,
                    on_row,
                )
                .await
            }
        }
    }

    /// Run a write query and report affected rows
    pub async fn execute(
        &self,
        queries: &QueryDefinitions,
        query_name: &str,
        request_params: &serde_json::Value,
    ) -> anyhow::Result<QueryResult> {
        match self {
            #[cfg(feature = "sqlite")]
            DatabaseConnection::SQLite(conn) => {
                crate::runner_sqlite::execute_sqlite(conn, queries, query_name, request_params)
            }
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(conn) => {
                crate::runner_postgresql::execute_postgresql(
                    &conn.client,
                    queries,
                    query_name,
                    request_params,
                )
                .await
            }
        }
    }

    /// Run any named query: reads collect their rows, writes report affected rows
    pub async fn query_run(
        &self,
        queries: &QueryDefinitions,
        query_name: &str,
        request_params: &serde_json::Value,
    ) -> anyhow::Result<QueryResult> {
        match self {
            #[cfg(feature = "sqlite")]
            DatabaseConnection::SQLite(conn) => {
                crate::runner_sqlite::query_run_sqlite(conn, queries, query_name, request_params)
            }
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(conn) => {
                crate::runner_postgresql::query_run_postgresql(
                    &conn.client,
                    queries,
                    query_name,
                    request_params,
                )
                .await
            }
        }
    }
}

fn connection_failed<E>(target: &str, source: E) -> CatalogueError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CatalogueError::ConnectionFailed {
        target: target.to_string(),
        source: Box::new(source),
    }
}

/// Open an existing SQLite database; a missing file is a connection failure, not a new database
#[cfg(feature = "sqlite")]
fn open_sqlite(config: &RunnerConfig) -> rusqlite::Result<rusqlite::Connection> {
    use rusqlite::OpenFlags;

    match config.sqlite_path() {
        Some(":memory:") => rusqlite::Connection::open_in_memory(),
        Some(path) => rusqlite::Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
        None => Err(rusqlite::Error::InvalidPath(std::path::PathBuf::new())),
    }
}

#[cfg(feature = "postgresql")]
async fn open_postgresql(config: &RunnerConfig) -> Result<PostgresConnection, tokio_postgres::Error> {
    let mut pg_config: tokio_postgres::Config = config.database_url.trim().parse()?;
    if pg_config.get_user().is_none() {
        if let Some(user) = &config.user {
            pg_config.user(user.as_str());
        }
    }
    if let Some(password) = &config.password {
        pg_config.password(password.as_str());
    }

    let (client, connection) = pg_config.connect(tokio_postgres::NoTls).await?;
    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("PostgreSQL connection error: {e}");
        }
    });

    Ok(PostgresConnection { client, driver })
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_open_memory_and_run() {
        let config = RunnerConfig::new("sqlite::memory:");
        let conn = DatabaseConnection::open(&config).await.unwrap();
        assert_eq!(conn.backend(), Backend::Sqlite);

        let queries = QueryDefinitions::from_json(json!({
            "create": {"query": "CREATE TABLE logo_type (id INTEGER PRIMARY KEY, description TEXT)"},
            "add": {
                "query": "INSERT INTO logo_type VALUES (@id, @description)",
                "args": {"id": {"type": "integer"}}
            },
            "all": {"query": "SELECT id, description FROM logo_type", "returns": ["id", "description"]}
        }))
        .unwrap();
        conn.execute(&queries, "create", &json!({})).await.unwrap();
        let added = conn
            .execute(&queries, "add", &json!({"id": 1, "description": "Eagle"}))
            .await
            .unwrap();
        assert_eq!(added.rows_affected, 1);

        let mut rows = Vec::new();
        conn.query_each(&queries, "all", &json!({}), &mut |row| {
            rows.push(row);
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(rows, vec![json!({"id": 1, "description": "Eagle"})]);
        conn.close().await;
    }

    #[tokio::test]
    async fn test_missing_sqlite_file_is_connection_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let config = RunnerConfig::new(format!("sqlite://{}", path.display()));
        let err = DatabaseConnection::probe(&config).await.unwrap_err();
        assert!(matches!(err, CatalogueError::ConnectionFailed { .. }));
        assert!(err.to_string().starts_with("No database at"));
        assert!(!path.exists());
    }

    #[derive(Clone)]
    struct LogSink(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_driver_check_is_not_logged_per_connection() {
        let logs = Arc::new(Mutex::new(Vec::new()));
        let sink = LogSink(logs.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let config = RunnerConfig::new("sqlite::memory:");
        check_driver(&config).unwrap();
        DatabaseConnection::probe(&config).await.unwrap();
        let conn = DatabaseConnection::open(&config).await.unwrap();
        conn.close().await;

        let text = String::from_utf8(logs.lock().unwrap().clone()).unwrap();
        assert_eq!(text.matches("opened SQLite connection").count(), 2);
        assert!(!text.contains("driver"));
    }

    #[test]
    fn test_check_driver_unsupported_scheme() {
        let err = check_driver(&RunnerConfig::new("oracle://db")).unwrap_err();
        assert!(matches!(err, CatalogueError::UnsupportedUrl(_)));
    }

    #[test]
    fn test_check_driver_sqlite() {
        assert_eq!(
            check_driver(&RunnerConfig::new("sqlite::memory:")).unwrap(),
            Backend::Sqlite
        );
    }
}
