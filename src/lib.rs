//! Database admin helpers for projects that declare their Postgres connection
//! and schema in a `dbassist.toml` / `dbassist.json` config file.
//!
//! Configuration is located and normalized by [`config`], connections are
//! scoped by [`scope`], and the commands live in [`check`], [`clear`] and [`reset`].

// dbassist/src/lib.rs
pub mod check;
pub mod clear;
pub mod config;
pub mod errors;
pub mod reset;
pub mod scope;
pub mod utils;

pub use check::check_database;
pub use clear::clear_database;
pub use config::{AssistOptions, ResolvedConfig, load_and_resolve_config};
pub use errors::{AssistError, Result};
pub use reset::{ResetOptions, reset_database};
