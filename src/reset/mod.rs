mod logic;

use tracing::{debug, info};

use crate::config::{AssistOptions, ResolvedConfig, load_and_resolve_config};
use crate::errors::Result;
use crate::scope::{Connector, PgConnector, with_connection};
use crate::utils::process::{ProcessRunner, TokioProcessRunner};

pub use logic::{RecreateOutcome, ResetOrchestrator, ResetReport, drop_all_tables_sql};

#[derive(Debug, Clone, Copy, Default)]
pub struct ResetOptions {
    /// Stop after dropping tables; do not push the schema back.
    pub skip_schema_recreation: bool,
}

/// Public entry point for the reset command: drops every table in the `public`
/// schema and recreates the declared schema unless told to skip it.
pub async fn reset_database(options: &AssistOptions, reset_options: ResetOptions) -> Result<ResetReport> {
    debug!("Starting reset operation with options: {:?}", reset_options);
    let config = load_and_resolve_config(options).await?;
    let report = run_reset(&config, &PgConnector, &TokioProcessRunner, reset_options).await?;
    info!("Database reset operation finished.");
    Ok(report)
}

/// Runs the reset sequence inside a connection scope.
pub async fn run_reset<C, R>(
    config: &ResolvedConfig,
    connector: &C,
    runner: &R,
    reset_options: ResetOptions,
) -> Result<ResetReport>
where
    C: Connector,
    R: ProcessRunner,
{
    let orchestrator = ResetOrchestrator::new(runner, reset_options.skip_schema_recreation);
    with_connection(config, connector, orchestrator).await
}
