//! Runs the catalogue plan against a live PostgreSQL server.
//! Skipped unless POSTGRES_CONNECTION_STRING holds a `postgresql://` URL.

#[cfg(feature = "postgresql")]
mod tests {
    use catalogue_runner::{
        Backend, CatalogueError, DatabaseConnection, QueryDefinitions, Runner, RunnerConfig,
        Ticket, plan,
    };
    use serde_json::json;

    // Temp tables shadow any real catalogue tables for this session only
    const SCHEMA_AND_SEED: &str = r#"
        CREATE TEMP TABLE logo_type (id INTEGER PRIMARY KEY, description TEXT NOT NULL);
        CREATE TEMP TABLE paper_color (id INTEGER PRIMARY KEY, description TEXT NOT NULL);
        CREATE TEMP TABLE main_catalogue (
            id INTEGER PRIMARY KEY,
            type INTEGER NOT NULL,
            description TEXT NOT NULL,
            logo INTEGER REFERENCES logo_type (id),
            paper INTEGER REFERENCES paper_color (id),
            stripe INTEGER,
            date DATE,
            circulation INTEGER,
            rarity INTEGER,
            availability TEXT
        );
        INSERT INTO logo_type VALUES (1, 'Eagle'), (2, 'Metro');
        INSERT INTO paper_color VALUES (1, 'White'), (2, 'Blue'), (3, 'Green');
        INSERT INTO main_catalogue VALUES
            (1, 1, 'Single ride', 1, 1, 0, '2004-05-01', 50000, 3, '+'),
            (2, 1, 'Double ride', 2, 2, 1, '2008-09-01', 150000, 2, '+'),
            (3, 1, 'Day pass', 1, 1, 0, '2006-01-01', 70000, 4, '-'),
            (10, 2, 'Student', 2, 3, 1, '2010-02-15', 30000, 5, '+'),
            (11, 2, 'Pensioner', 1, 2, 1, '2005-12-31', 40000, 1, '-');
    "#;

    fn connection_string() -> Option<String> {
        match std::env::var("POSTGRES_CONNECTION_STRING") {
            Ok(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
                Some(url)
            }
            _ => {
                println!("Skipping PostgreSQL test: POSTGRES_CONNECTION_STRING not set");
                None
            }
        }
    }

    async fn setup_db(url: &str) -> DatabaseConnection {
        let conn = DatabaseConnection::open(&RunnerConfig::new(url))
            .await
            .expect("Failed to connect to PostgreSQL");
        let DatabaseConnection::PostgreSQL(pg) = &conn else {
            panic!("expected a PostgreSQL connection");
        };
        pg.client()
            .batch_execute(SCHEMA_AND_SEED)
            .await
            .expect("Failed to create catalogue tables");
        conn
    }

    #[tokio::test]
    async fn test_postgresql_plan_transcript() {
        let Some(url) = connection_string() else {
            return;
        };
        let conn = setup_db(&url).await;
        assert_eq!(conn.backend(), Backend::PostgreSql);

        let runner = Runner::new(RunnerConfig::new(url.as_str())).unwrap();
        let mut out = Vec::new();
        let summary = runner.execute_plan(&conn, &mut out).await.unwrap();
        let output = String::from_utf8(out).unwrap();

        assert_eq!(summary.steps_completed, 10);
        assert_eq!(summary.rows_written, 3);
        assert!(output.starts_with(
            "Tickets issued after a given date\n\
             ID: 2, Type: 1, Description: Double ride, Logo: 2, Paper: 2, Stripe: 1, Date: 2008-09-01,"
        ));
        assert!(output.contains("Number of tickets of each type\nType: 1, Count: 3\nType: 2, Count: 2\n"));
        assert!(output.ends_with(
            "Ticket types with average circulation below 100000\nType: 2, Avg Circulation: 40000.0\n"
        ));
        conn.close().await;
    }

    #[tokio::test]
    async fn test_postgresql_insert_select_delete() {
        let Some(url) = connection_string() else {
            return;
        };
        let conn = setup_db(&url).await;
        let queries = QueryDefinitions::catalogue().unwrap();
        let ticket = plan::new_ticket();

        let inserted = conn
            .execute(&queries, "insert_ticket", &ticket.to_params().unwrap())
            .await
            .unwrap();
        assert_eq!(inserted.rows_affected, 1);

        let selected = conn
            .query_run(&queries, "select_ticket_by_id", &json!({"id": ticket.id}))
            .await
            .unwrap();
        assert_eq!(Ticket::from_row(&selected.data[0]).unwrap(), ticket);

        let err = conn
            .execute(&queries, "insert_ticket", &ticket.to_params().unwrap())
            .await
            .unwrap_err();
        let pg_err = err
            .downcast_ref::<tokio_postgres::Error>()
            .expect("duplicate key should surface the PostgreSQL error");
        assert_eq!(
            pg_err.code(),
            Some(&tokio_postgres::error::SqlState::UNIQUE_VIOLATION)
        );

        let deleted = conn
            .execute(&queries, "delete_ticket", &json!({"id": ticket.id}))
            .await
            .unwrap();
        assert_eq!(deleted.rows_affected, 1);
        conn.close().await;
    }

    #[tokio::test]
    async fn test_postgresql_unhandled_column_type_fails_the_read() {
        let Some(url) = connection_string() else {
            return;
        };
        let conn = setup_db(&url).await;
        let queries = QueryDefinitions::from_json(json!({
            "raw_average": {
                "query": "SELECT type, AVG(circulation) AS avg_circulation FROM main_catalogue GROUP BY type ORDER BY type",
                "returns": ["type", "avg_circulation"]
            },
            "issued_at": {
                "query": "SELECT id, date::timestamp AS issued_at FROM main_catalogue WHERE id = 1",
                "returns": ["id", "issued_at"]
            }
        }))
        .unwrap();

        // AVG over INTEGER is NUMERIC, which has no JSON conversion
        let err = conn
            .query_run(&queries, "raw_average", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("numeric"));

        let issued = conn
            .query_run(&queries, "issued_at", &json!({}))
            .await
            .unwrap();
        assert_eq!(issued.data[0]["issued_at"], "2004-05-01 00:00:00");
        conn.close().await;
    }

    #[tokio::test]
    async fn test_postgresql_wrong_password_is_connection_failure() {
        let Some(url) = connection_string() else {
            return;
        };
        let config = RunnerConfig::new(url.as_str())
            .with_credentials("no_such_catalogue_user", Some("wrong".to_string()));
        let Err(err) = DatabaseConnection::probe(&config).await else {
            // Trust-authenticated servers accept any credentials
            return;
        };
        assert!(matches!(err, CatalogueError::ConnectionFailed { .. }));
        assert!(!err.to_string().contains("wrong"));
    }
}
