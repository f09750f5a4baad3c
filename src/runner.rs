use crate::{
    QueryDefinitions,
    config::RunnerConfig,
    connection::{DatabaseConnection, check_driver},
    plan::{Step, StepKind, catalogue_plan},
    report::Report,
};
use anyhow::Context;
use std::io::Write;
use tracing::{debug, info};

/// Totals for one pass over the plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps_completed: usize,
    pub rows_read: u64,
    pub rows_written: u64,
}

/// Connects to the catalogue database and runs the demonstration steps in order
pub struct Runner {
    config: RunnerConfig,
    queries: QueryDefinitions,
    plan: Vec<Step>,
}

impl Runner {
    /// Runner over the catalogue plan, with queries from the configured file or the built-in set
    pub fn new(config: RunnerConfig) -> anyhow::Result<Self> {
        let queries = config.load_queries()?;
        Self::with_queries(config, queries)
    }

    pub fn with_queries(config: RunnerConfig, queries: QueryDefinitions) -> anyhow::Result<Self> {
        Ok(Runner {
            config,
            queries,
            plan: catalogue_plan()?,
        })
    }

    pub fn queries(&self) -> &QueryDefinitions {
        &self.queries
    }

    pub fn plan(&self) -> &[Step] {
        &self.plan
    }

    /// Check the driver, check the database, then run every step on one connection.
    /// The first failing step ends the run; the connection is released either way.
    pub async fn run(&self, out: &mut dyn Write) -> anyhow::Result<RunSummary> {
        let backend = check_driver(&self.config)?;
        info!(%backend, "driver check passed");

        DatabaseConnection::probe(&self.config).await?;
        writeln!(out, "Database connection succeeded.")?;
        writeln!(out, "Connecting to database | {}", self.config.redacted_url())?;
        writeln!(out)?;

        let conn = DatabaseConnection::open(&self.config).await?;
        info!(url = %self.config.redacted_url(), "connected");
        let outcome = self.execute_plan(&conn, out).await;
        conn.close().await;

        let summary = outcome?;
        info!(
            steps = summary.steps_completed,
            rows_read = summary.rows_read,
            rows_written = summary.rows_written,
            "run finished"
        );
        Ok(summary)
    }

    /// Run every step of the plan on an already open connection
    pub async fn execute_plan(
        &self,
        conn: &DatabaseConnection,
        out: &mut dyn Write,
    ) -> anyhow::Result<RunSummary> {
        let mut report = Report::new(out);
        let mut summary = RunSummary::default();

        for step in &self.plan {
            self.execute_step(conn, step, &mut report, &mut summary)
                .await
                .with_context(|| format!("step '{}' failed", step.query_name))?;
            summary.steps_completed += 1;
        }

        report.flush()?;
        Ok(summary)
    }

    async fn execute_step(
        &self,
        conn: &DatabaseConnection,
        step: &Step,
        report: &mut Report<'_>,
        summary: &mut RunSummary,
    ) -> anyhow::Result<()> {
        debug!(step = step.query_name, "running step");
        report.heading(step.heading)?;

        match &step.kind {
            StepKind::Read => {
                let result = conn
                    .query_each(&self.queries, step.query_name, &step.params, &mut |row| {
                        report.row(&row).map_err(Into::into)
                    })
                    .await?;
                debug!(sql = %result.sql_statement, rows = result.rows_affected, "read complete");
                summary.rows_read += result.rows_affected;
            }
            StepKind::Write { success, failure } => {
                let result = conn
                    .execute(&self.queries, step.query_name, &step.params)
                    .await?;
                debug!(sql = %result.sql_statement, rows = result.rows_affected, "write complete");
                report.write_outcome(result.rows_affected, success, failure)?;
                summary.rows_written += result.rows_affected;
            }
        }
        Ok(())
    }
}
