// dbassist/src/config/normalize.rs
//! Turns an untyped config document into a [`ResolvedConfig`].
//!
//! The document is parsed once into [`DeclaredConfig`], a tagged union over the
//! `postgresql` dialect shape and the legacy (pre-dialect) shape. Every fallback
//! rule below is a match over that union.

use serde_json::{Map, Value};
use std::cell::Cell;
use std::path::Path;

use super::env::{interpolate, load_dotenv};
use super::loader::kind_of;
use super::{Dialect, ResolvedConfig};
use crate::errors::{AssistError, Result};

/// `driver` value that marks a legacy top-level `connectionString` as Postgres.
pub const LEGACY_PG_DRIVER: &str = "pg";

/// Credentials as declared under `dbCredentials`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `dbCredentials = "postgres://..."`
    Inline(String),
    /// `dbCredentials = { url = "...", connectionString = "..." }`
    Fields {
        url: Option<String>,
        connection_string: Option<String>,
    },
}

impl Credentials {
    fn parse(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::String(s) => Some(Credentials::Inline(s.clone())),
            Value::Object(map) => Some(Credentials::Fields {
                url: string_field(map, "url"),
                connection_string: string_field(map, "connectionString"),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredConfig {
    Postgresql {
        credentials: Option<Credentials>,
    },
    Legacy {
        credentials: Option<Credentials>,
        driver: Option<String>,
        connection_string: Option<String>,
    },
}

impl DeclaredConfig {
    /// Classifies the document by its `dialect` field. Any dialect other than
    /// `postgresql` is rejected here, before credentials are looked at.
    pub fn parse(document: &Map<String, Value>) -> Result<Self> {
        match document.get("dialect") {
            None | Some(Value::Null) => Ok(DeclaredConfig::Legacy {
                credentials: Credentials::parse(document.get("dbCredentials")),
                driver: string_field(document, "driver"),
                connection_string: string_field(document, "connectionString"),
            }),
            Some(Value::String(dialect)) if dialect == Dialect::POSTGRESQL => {
                Ok(DeclaredConfig::Postgresql {
                    credentials: Credentials::parse(document.get("dbCredentials")),
                })
            }
            Some(Value::String(dialect)) => Err(AssistError::UnsupportedDialect {
                dialect: dialect.clone(),
            }),
            Some(other) => Err(AssistError::UnsupportedDialect {
                dialect: other.to_string(),
            }),
        }
    }

    pub fn dialect(&self) -> Option<Dialect> {
        match self {
            DeclaredConfig::Postgresql { .. } => Some(Dialect::Postgresql),
            DeclaredConfig::Legacy { .. } => None,
        }
    }

    /// Picks the connection string following the fallback order of each shape.
    pub fn connection_string(&self) -> Option<&str> {
        match self {
            DeclaredConfig::Postgresql { credentials } => match credentials {
                Some(Credentials::Inline(value)) => Some(value.as_str()),
                Some(Credentials::Fields {
                    url,
                    connection_string,
                }) => url.as_deref().or(connection_string.as_deref()),
                None => None,
            },
            DeclaredConfig::Legacy {
                credentials,
                driver,
                connection_string,
            } => {
                let from_credentials = match credentials {
                    Some(Credentials::Fields {
                        url,
                        connection_string,
                    }) => url.as_deref().or(connection_string.as_deref()),
                    Some(Credentials::Inline(value)) => Some(value.as_str()),
                    None => None,
                };
                from_credentials.or_else(|| match driver.as_deref() {
                    Some(LEGACY_PG_DRIVER) => connection_string.as_deref(),
                    _ => None,
                })
            }
        }
    }
}

/// Validates a loaded config document, reading variables from the process environment.
///
/// The project's `.env` is loaded on the first variable lookup, so configs rejected
/// by an earlier gate never touch the environment.
pub fn normalize(document: &Value, config_file_path: &Path) -> Result<ResolvedConfig> {
    let dotenv_loaded = Cell::new(false);
    normalize_with(document, config_file_path, |name| {
        if !dotenv_loaded.replace(true) {
            if let Some(project_root) = config_file_path.parent() {
                load_dotenv(project_root);
            }
        }
        std::env::var(name).ok()
    })
}

/// Validates a loaded config document. Gates run in order and fail fast:
/// dialect, schema path, connection string.
pub fn normalize_with<F>(document: &Value, config_file_path: &Path, lookup: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let Value::Object(fields) = document else {
        return Err(AssistError::ConfigLoad {
            path: config_file_path.to_path_buf(),
            reason: format!("expected an object at the top level, found {}", kind_of(document)),
        });
    };

    let declared = DeclaredConfig::parse(fields)?;

    let project_root = config_file_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let entry = schema_entry(fields.get("schema")).ok_or_else(|| AssistError::SchemaPathInvalid {
        config_path: config_file_path.to_path_buf(),
    })?;
    let schema_path = project_root.join(entry);
    if !schema_path.exists() {
        return Err(AssistError::SchemaFileMissing { path: schema_path });
    }

    let connection_string = declared
        .connection_string()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AssistError::ConnectionStringMissing {
            config_path: config_file_path.to_path_buf(),
            detail: "expected dbCredentials.url, dbCredentials.connectionString, dbCredentials as a string, \
                     or driver = \"pg\" with a top-level connectionString"
                .to_string(),
        })?;
    let connection_string =
        interpolate(connection_string, lookup).map_err(|name| AssistError::ConnectionStringMissing {
            config_path: config_file_path.to_path_buf(),
            detail: format!("environment variable {} is not set", name),
        })?;
    if connection_string.trim().is_empty() {
        return Err(AssistError::ConnectionStringMissing {
            config_path: config_file_path.to_path_buf(),
            detail: "connection string is empty after expanding environment variables".to_string(),
        });
    }

    Ok(ResolvedConfig {
        connection_string,
        schema_path,
        dialect: declared.dialect(),
        config_file_path: config_file_path.to_path_buf(),
        project_root,
        verbose: fields.get("verbose").and_then(Value::as_bool).unwrap_or(false),
    })
}

/// The honored schema path: the value itself, or the first entry of a list.
fn schema_entry(value: Option<&Value>) -> Option<&str> {
    let entry = match value? {
        Value::String(path) => path.as_str(),
        Value::Array(paths) => paths.first()?.as_str()?,
        _ => return None,
    };
    (!entry.trim().is_empty()).then_some(entry)
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// A project directory with a config path and an existing schema file.
    fn project() -> anyhow::Result<(TempDir, PathBuf)> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("db"))?;
        fs::write(dir.path().join("db").join("schema.json"), r#"{ "users": {} }"#)?;
        let config_path = dir.path().join("dbassist.json");
        Ok((dir, config_path))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_postgresql_url_wins_over_connection_string() -> anyhow::Result<()> {
        let (dir, config_path) = project()?;
        let document = json!({
            "dialect": "postgresql",
            "schema": "./db/schema.json",
            "dbCredentials": { "url": "A", "connectionString": "B" }
        });

        let resolved = normalize_with(&document, &config_path, no_env)?;
        assert_eq!(resolved.connection_string, "A");
        assert_eq!(resolved.dialect, Some(Dialect::Postgresql));
        assert_eq!(resolved.project_root, dir.path());
        assert_eq!(resolved.schema_path, dir.path().join("./db/schema.json"));
        assert_eq!(resolved.config_file_path, config_path);
        Ok(())
    }

    #[test]
    fn test_postgresql_falls_back_to_connection_string_field() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "dialect": "postgresql",
            "schema": "db/schema.json",
            "dbCredentials": { "connectionString": "B" }
        });

        let resolved = normalize_with(&document, &config_path, no_env)?;
        assert_eq!(resolved.connection_string, "B");
        Ok(())
    }

    #[test]
    fn test_postgresql_inline_credentials() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "dialect": "postgresql",
            "schema": "db/schema.json",
            "dbCredentials": "postgres://localhost/app"
        });

        let resolved = normalize_with(&document, &config_path, no_env)?;
        assert_eq!(resolved.connection_string, "postgres://localhost/app");
        Ok(())
    }

    #[test]
    fn test_postgresql_ignores_legacy_top_level_pair() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "dialect": "postgresql",
            "schema": "db/schema.json",
            "driver": "pg",
            "connectionString": "C"
        });

        let err = normalize_with(&document, &config_path, no_env).unwrap_err();
        assert!(matches!(err, AssistError::ConnectionStringMissing { .. }));
        Ok(())
    }

    #[test]
    fn test_legacy_top_level_driver_pair() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "driver": "pg",
            "connectionString": "C",
            "schema": "db/schema.json"
        });

        let resolved = normalize_with(&document, &config_path, no_env)?;
        assert_eq!(resolved.connection_string, "C");
        assert_eq!(resolved.dialect, None);
        Ok(())
    }

    #[test]
    fn test_legacy_requires_pg_driver_for_top_level_pair() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "driver": "mysql2",
            "connectionString": "C",
            "schema": "db/schema.json"
        });

        let err = normalize_with(&document, &config_path, no_env).unwrap_err();
        assert!(matches!(err, AssistError::ConnectionStringMissing { .. }));
        Ok(())
    }

    #[test]
    fn test_legacy_credentials_take_priority_over_top_level_pair() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let object_form = json!({
            "schema": "db/schema.json",
            "dbCredentials": { "connectionString": "B" },
            "driver": "pg",
            "connectionString": "C"
        });
        let string_form = json!({
            "schema": "db/schema.json",
            "dbCredentials": "D",
            "driver": "pg",
            "connectionString": "C"
        });

        assert_eq!(normalize_with(&object_form, &config_path, no_env)?.connection_string, "B");
        assert_eq!(normalize_with(&string_form, &config_path, no_env)?.connection_string, "D");
        Ok(())
    }

    #[test]
    fn test_legacy_empty_credentials_object_falls_through() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "schema": "db/schema.json",
            "dbCredentials": { "host": "localhost" },
            "driver": "pg",
            "connectionString": "C"
        });

        let resolved = normalize_with(&document, &config_path, no_env)?;
        assert_eq!(resolved.connection_string, "C");
        Ok(())
    }

    #[test]
    fn test_unsupported_dialect_checked_before_credentials() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "dialect": "mysql",
            "dbCredentials": { "url": "${DATABASE_URL}" }
        });
        let lookups = Cell::new(0);

        let err = normalize_with(&document, &config_path, |_| {
            lookups.set(lookups.get() + 1);
            Some("postgres://localhost/app".to_string())
        })
        .unwrap_err();

        assert!(matches!(err, AssistError::UnsupportedDialect { ref dialect } if dialect == "mysql"));
        assert_eq!(lookups.get(), 0);
        Ok(())
    }

    #[test]
    fn test_non_string_dialect_is_unsupported() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({ "dialect": 5, "schema": "db/schema.json" });

        let err = normalize_with(&document, &config_path, no_env).unwrap_err();
        assert!(matches!(err, AssistError::UnsupportedDialect { .. }));
        Ok(())
    }

    #[test]
    fn test_schema_list_honors_first_entry() -> anyhow::Result<()> {
        let (dir, config_path) = project()?;
        let document = json!({
            "dialect": "postgresql",
            "schema": ["db/schema.json", "db/missing.json"],
            "dbCredentials": { "url": "A" }
        });

        let resolved = normalize_with(&document, &config_path, no_env)?;
        assert_eq!(resolved.schema_path, dir.path().join("db/schema.json"));
        Ok(())
    }

    #[test]
    fn test_schema_shape_errors() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        for schema in [json!(null), json!(42), json!([]), json!([7]), json!("")] {
            let document = json!({
                "dialect": "postgresql",
                "schema": schema,
                "dbCredentials": { "url": "A" }
            });
            let err = normalize_with(&document, &config_path, no_env).unwrap_err();
            assert!(
                matches!(err, AssistError::SchemaPathInvalid { .. }),
                "schema {} gave {:?}",
                schema,
                err
            );
        }

        let absent = json!({ "dialect": "postgresql", "dbCredentials": { "url": "A" } });
        let err = normalize_with(&absent, &config_path, no_env).unwrap_err();
        assert!(matches!(err, AssistError::SchemaPathInvalid { .. }));
        Ok(())
    }

    #[test]
    fn test_schema_file_must_exist() -> anyhow::Result<()> {
        let (dir, config_path) = project()?;
        let document = json!({
            "dialect": "postgresql",
            "schema": "db/nope.json",
            "dbCredentials": { "url": "A" }
        });

        match normalize_with(&document, &config_path, no_env) {
            Err(AssistError::SchemaFileMissing { path }) => {
                assert_eq!(path, dir.path().join("db/nope.json"))
            }
            other => panic!("expected SchemaFileMissing, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_schema_checked_before_connection_string() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({ "dialect": "postgresql" });

        let err = normalize_with(&document, &config_path, no_env).unwrap_err();
        assert!(matches!(err, AssistError::SchemaPathInvalid { .. }));
        Ok(())
    }

    #[test]
    fn test_missing_or_empty_connection_string() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let missing = json!({ "dialect": "postgresql", "schema": "db/schema.json" });
        let empty = json!({
            "dialect": "postgresql",
            "schema": "db/schema.json",
            "dbCredentials": { "url": "" }
        });

        for document in [missing, empty] {
            let err = normalize_with(&document, &config_path, no_env).unwrap_err();
            assert!(matches!(err, AssistError::ConnectionStringMissing { .. }));
        }
        Ok(())
    }

    #[test]
    fn test_connection_string_env_interpolation() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "dialect": "postgresql",
            "schema": "db/schema.json",
            "dbCredentials": { "url": "${DATABASE_URL}" }
        });

        let resolved = normalize_with(&document, &config_path, |name| {
            (name == "DATABASE_URL").then(|| "postgres://localhost/app".to_string())
        })?;
        assert_eq!(resolved.connection_string, "postgres://localhost/app");

        let err = normalize_with(&document, &config_path, no_env).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
        Ok(())
    }

    #[test]
    fn test_empty_env_value_is_missing_connection_string() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "dialect": "postgresql",
            "schema": "db/schema.json",
            "dbCredentials": { "url": "${DATABASE_URL}" }
        });

        for value in ["", "   "] {
            let result = normalize_with(&document, &config_path, |_| Some(value.to_string()));
            assert!(
                matches!(result, Err(AssistError::ConnectionStringMissing { .. })),
                "value {:?} gave {:?}",
                value,
                result
            );
        }
        Ok(())
    }

    #[test]
    fn test_verbose_flag() -> anyhow::Result<()> {
        let (_dir, config_path) = project()?;
        let document = json!({
            "dialect": "postgresql",
            "schema": "db/schema.json",
            "dbCredentials": { "url": "A" },
            "verbose": true
        });

        assert!(normalize_with(&document, &config_path, no_env)?.verbose);
        Ok(())
    }
}
