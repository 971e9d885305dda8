// dbassist/src/scope/mod.rs
//! Connection scopes: acquire one connection, run an action, always release it.
//!
//! Two variants exist. [`with_connection`] hands the action a raw session.
//! [`with_schema`] first loads the schema description (failing before any
//! connection is opened) and hands the action a [`SchemaDb`] around the session.

pub mod postgres;
pub mod schema;

use tracing::{debug, error, warn};

use crate::config::ResolvedConfig;
use crate::errors::Result;

pub use postgres::{PgConnector, PgSession};
pub use schema::{FileSchemaLoader, SchemaDb, SchemaDescription, SchemaLoader, TableDescription};

/// Postgres schema every command operates on.
pub const TARGET_SCHEMA: &str = "public";

/// Table names in a schema at one point in time, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot(Vec<String>);

impl TableSnapshot {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[allow(async_fn_in_trait)]
pub trait Connector {
    type Session: Session;

    async fn connect(&self, connection_string: &str, log_statements: bool) -> Result<Self::Session>;
}

/// One live database connection.
#[allow(async_fn_in_trait)]
pub trait Session {
    async fn list_tables(&mut self, schema: &str) -> Result<TableSnapshot>;

    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Consumes the session, so a closed connection cannot be used or closed again.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Work run inside [`with_connection`].
#[allow(async_fn_in_trait)]
pub trait SessionAction<S: Session> {
    type Output;

    async fn run(self, session: &mut S, config: &ResolvedConfig) -> Result<Self::Output>;
}

/// Work run inside [`with_schema`].
#[allow(async_fn_in_trait)]
pub trait SchemaAction<S: Session> {
    type Output;

    async fn run(
        self,
        db: &mut SchemaDb<S>,
        schema: &SchemaDescription,
        config: &ResolvedConfig,
    ) -> Result<Self::Output>;
}

pub async fn with_connection<C, A>(config: &ResolvedConfig, connector: &C, action: A) -> Result<A::Output>
where
    C: Connector,
    A: SessionAction<C::Session>,
{
    debug!("Creating postgres client...");
    let mut session = connector.connect(&config.connection_string, false).await?;

    debug!("Executing action with postgres client.");
    let outcome = action.run(&mut session, config).await;

    debug!("Closing postgres client connection.");
    release(session, outcome).await
}

pub async fn with_schema<C, L, A>(
    config: &ResolvedConfig,
    connector: &C,
    loader: &L,
    action: A,
) -> Result<A::Output>
where
    C: Connector,
    L: SchemaLoader,
    A: SchemaAction<C::Session>,
{
    debug!("Loading user schema from: {}", config.schema_path.display());
    let schema = loader
        .load(&config.schema_path)
        .await
        .inspect_err(|e| error!("{}", e))?;
    debug!("User schema loaded: {} tables.", schema.len());

    debug!("Creating postgres client for schema actions...");
    let session = connector
        .connect(&config.connection_string, config.verbose)
        .await?;
    let mut db = SchemaDb::new(session, config.verbose);

    debug!("Executing action with schema handle.");
    let outcome = action.run(&mut db, &schema, config).await;

    debug!("Closing postgres client connection for schema actions.");
    release(db.into_session(), outcome).await
}

/// Closes the session. The action's error wins over a close error.
async fn release<S: Session, T>(session: S, outcome: Result<T>) -> Result<T> {
    match (session.close().await, outcome) {
        (Ok(()), outcome) => outcome,
        (Err(close_err), Ok(_)) => Err(close_err),
        (Err(close_err), Err(action_err)) => {
            warn!("Failed to close connection after error: {}", close_err);
            Err(action_err)
        }
    }
}
