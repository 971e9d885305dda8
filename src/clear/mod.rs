// dbassist/src/clear/mod.rs
use tracing::{debug, error, info, warn};

use crate::config::{AssistOptions, ResolvedConfig, load_and_resolve_config};
use crate::errors::Result;
use crate::scope::{
    FileSchemaLoader, PgConnector, SchemaAction, SchemaDb, SchemaDescription, Session, with_schema,
};

/// Truncates every table described by the user's schema.
pub struct ClearTables;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearReport {
    /// Qualified names of the truncated tables.
    pub tables: Vec<String>,
}

impl<S: Session> SchemaAction<S> for ClearTables {
    type Output = ClearReport;

    async fn run(
        self,
        db: &mut SchemaDb<S>,
        schema: &SchemaDescription,
        _config: &ResolvedConfig,
    ) -> Result<ClearReport> {
        warn!("🗑️ Clearing database: all rows in {} tables will be deleted.", schema.len());
        match db.truncate(schema.tables()).await {
            Ok(_) => {
                info!("✅ Database cleared successfully.");
                Ok(ClearReport {
                    tables: schema.tables().map(|t| t.qualified_name()).collect(),
                })
            }
            Err(e) => {
                error!("❌ Error clearing database: {}", e);
                Err(e)
            }
        }
    }
}

pub async fn clear_database(options: &AssistOptions) -> Result<ClearReport> {
    debug!("Starting clear operation.");
    let config = load_and_resolve_config(options).await?;
    let report = with_schema(&config, &PgConnector, &FileSchemaLoader, ClearTables).await?;
    info!("Database clear operation finished.");
    Ok(report)
}
