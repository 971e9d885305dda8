use std::path::PathBuf;
use thiserror::Error;

use crate::utils::process::ProcessError;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("Config file (dbassist.toml or dbassist.json) not found at {searched}")]
    ConfigNotFound { searched: String },

    #[error("Failed to load config file {}: {reason}", .path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("Schema path (schema) not found or invalid in {}", .config_path.display())]
    SchemaPathInvalid { config_path: PathBuf },

    #[error("Schema file specified in config not found: {}", .path.display())]
    SchemaFileMissing { path: PathBuf },

    #[error("Unsupported dialect: {dialect}. Only 'postgresql' is supported")]
    UnsupportedDialect { dialect: String },

    #[error("Database connection string not found in {}: {detail}", .config_path.display())]
    ConnectionStringMissing { config_path: PathBuf, detail: String },

    #[error("Could not load a valid schema object from {}: {reason}", .path.display())]
    SchemaModuleInvalid { path: PathBuf, reason: String },

    #[error("Failed to drop tables in schema '{schema}': {source}")]
    DropTables {
        schema: String,
        #[source]
        source: Box<AssistError>,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

pub type Result<T> = std::result::Result<T, AssistError>;
