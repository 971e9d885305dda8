// dbassist/src/scope/postgres.rs
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, Executor, PgConnection};
use std::str::FromStr;
use tracing::debug;

use super::{Connector, Session, TableSnapshot};
use crate::errors::Result;

const LIST_TABLES_SQL: &str = r#"
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1
    ORDER BY table_name
"#;

/// Opens single sqlx connections to Postgres; no pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

impl Connector for PgConnector {
    type Session = PgSession;

    async fn connect(&self, connection_string: &str, log_statements: bool) -> Result<PgSession> {
        let mut options = PgConnectOptions::from_str(connection_string)?;
        if !log_statements {
            options = options.disable_statement_logging();
        }
        let conn = options.connect().await?;
        debug!("Connected to Postgres.");
        Ok(PgSession { conn })
    }
}

pub struct PgSession {
    conn: PgConnection,
}

impl Session for PgSession {
    async fn list_tables(&mut self, schema: &str) -> Result<TableSnapshot> {
        let names: Vec<String> = sqlx::query_scalar(LIST_TABLES_SQL)
            .bind(schema)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(TableSnapshot::new(names))
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        // Plain text goes through the simple query protocol, which also admits DO blocks.
        let done = self.conn.execute(sql).await?;
        Ok(done.rows_affected())
    }

    async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}
