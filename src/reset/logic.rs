// dbassist/src/reset/logic.rs
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::ResolvedConfig;
use crate::errors::{AssistError, Result};
use crate::scope::{Session, SessionAction, TARGET_SCHEMA, TableSnapshot};
use crate::utils::process::{ProcessError, ProcessRunner, schema_push_command};

/// Server-side block that drops every table of `schema` with CASCADE, in one statement.
pub fn drop_all_tables_sql(schema: &str) -> String {
    let literal = schema.replace('\'', "''");
    format!(
        r#"
DO $$ DECLARE
    r RECORD;
BEGIN
    FOR r IN (SELECT tablename FROM pg_tables WHERE schemaname = '{literal}') LOOP
        EXECUTE 'DROP TABLE IF EXISTS ' || quote_ident('{literal}') || '.' || quote_ident(r.tablename) || ' CASCADE';
    END LOOP;
END $$;
"#
    )
}

/// What happened to the schema-recreation step.
#[derive(Debug)]
pub enum RecreateOutcome {
    Skipped,
    Recreated,
    /// The push failed after the drop had already committed; reported, not raised.
    Failed(ProcessError),
}

#[derive(Debug)]
pub struct ResetReport {
    pub tables_before: TableSnapshot,
    pub tables_after: TableSnapshot,
    pub recreate: RecreateOutcome,
    pub elapsed: Duration,
}

impl ResetReport {
    /// Tables that survived the drop.
    pub fn leftover_tables(&self) -> &[String] {
        self.tables_after.names()
    }
}

/// Drops every table in the target schema, then optionally pushes the declared schema back.
///
/// Steps run strictly in order: snapshot before, drop, snapshot after, recreate, done.
/// Only the drop is fatal. Leftover tables and a failed recreate are logged as warnings.
pub struct ResetOrchestrator<'a, R> {
    runner: &'a R,
    skip_schema_recreation: bool,
}

impl<'a, R: ProcessRunner> ResetOrchestrator<'a, R> {
    pub fn new(runner: &'a R, skip_schema_recreation: bool) -> Self {
        Self {
            runner,
            skip_schema_recreation,
        }
    }

    async fn snapshot_before<S: Session>(&self, session: &mut S) -> Result<TableSnapshot> {
        info!("📊 Checking tables before reset...");
        let tables = session.list_tables(TARGET_SCHEMA).await?;
        if tables.is_empty() {
            info!("   No tables found in the {} schema.", TARGET_SCHEMA);
        } else {
            for (i, name) in tables.names().iter().enumerate() {
                info!("   {}. {}", i + 1, name);
            }
            info!("   Total: {} tables", tables.len());
        }
        Ok(tables)
    }

    async fn drop_all<S: Session>(&self, session: &mut S) -> Result<()> {
        info!("🗑️ Dropping all tables in {} schema...", TARGET_SCHEMA);
        match session.execute(&drop_all_tables_sql(TARGET_SCHEMA)).await {
            Ok(_) => {
                info!("   All tables in {} schema dropped successfully.", TARGET_SCHEMA);
                Ok(())
            }
            Err(e) => {
                error!("   ❌ Error dropping tables: {}", e);
                Err(AssistError::DropTables {
                    schema: TARGET_SCHEMA.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    async fn snapshot_after<S: Session>(&self, session: &mut S) -> Result<TableSnapshot> {
        info!("📊 Verifying tables after drop...");
        let tables = session.list_tables(TARGET_SCHEMA).await?;
        if tables.is_empty() {
            info!("   Verification successful: No tables found in {} schema.", TARGET_SCHEMA);
        } else {
            warn!(
                "   Warning: {} tables still found in {} schema (a dependency the cascade could not resolve, or missing privileges):",
                tables.len(),
                TARGET_SCHEMA
            );
            for (i, name) in tables.names().iter().enumerate() {
                warn!("   {}. {}", i + 1, name);
            }
        }
        Ok(tables)
    }

    async fn recreate_schema(&self, config: &ResolvedConfig) -> RecreateOutcome {
        if self.skip_schema_recreation {
            info!("⏩ Schema recreation skipped as per --skip-schema-recreation flag.");
            return RecreateOutcome::Skipped;
        }

        info!("🔨 Recreating database schema via drizzle-kit push...");
        let command = schema_push_command(Some(&config.config_file_path), &config.project_root);
        match self.runner.run(&command).await {
            Ok(()) => {
                info!("   Database schema recreated successfully.");
                RecreateOutcome::Recreated
            }
            Err(e) => {
                warn!("   ❌ Error recreating database schema with drizzle-kit push: {}", e);
                warn!("   Tables were already dropped; run the push manually to restore the schema.");
                RecreateOutcome::Failed(e)
            }
        }
    }
}

impl<R: ProcessRunner, S: Session> SessionAction<S> for ResetOrchestrator<'_, R> {
    type Output = ResetReport;

    async fn run(self, session: &mut S, config: &ResolvedConfig) -> Result<ResetReport> {
        info!("🔄 Database reset started...");
        let started = Instant::now();

        let tables_before = self.snapshot_before(session).await?;
        self.drop_all(session).await?;
        let tables_after = self.snapshot_after(session).await?;
        let recreate = self.recreate_schema(config).await;

        let elapsed = started.elapsed();
        info!("✅ Database reset completed in {:.2} seconds.", elapsed.as_secs_f64());

        Ok(ResetReport {
            tables_before,
            tables_after,
            recreate,
            elapsed,
        })
    }
}
