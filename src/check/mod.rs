// dbassist/src/check/mod.rs
use tracing::{debug, info};

use crate::config::{AssistOptions, ResolvedConfig, load_and_resolve_config};
use crate::errors::Result;
use crate::scope::{PgConnector, Session, SessionAction, TARGET_SCHEMA, TableSnapshot, with_connection};

/// Lists the tables of the target schema.
pub struct CheckTables;

impl<S: Session> SessionAction<S> for CheckTables {
    type Output = TableSnapshot;

    async fn run(self, session: &mut S, _config: &ResolvedConfig) -> Result<TableSnapshot> {
        info!("Connecting to database to check tables...");
        let tables = session.list_tables(TARGET_SCHEMA).await?;
        if tables.is_empty() {
            info!("No tables found in the {} schema.", TARGET_SCHEMA);
        } else {
            info!("Tables in {} schema:", TARGET_SCHEMA);
        }
        Ok(tables)
    }
}

/// Numbered listing printed to stdout, one table per line.
pub fn format_listing(tables: &TableSnapshot) -> String {
    tables
        .names()
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", i + 1, name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn check_database(options: &AssistOptions) -> Result<TableSnapshot> {
    debug!("Starting check operation.");
    let config = load_and_resolve_config(options).await?;
    let tables = with_connection(&config, &PgConnector, CheckTables).await?;
    info!("Database check completed.");
    Ok(tables)
}
