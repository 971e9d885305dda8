// dbassist/src/scope/schema.rs
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use super::{Session, TARGET_SCHEMA};
use crate::config::loader::{DocumentFormat, kind_of, parse_document};
use crate::errors::{AssistError, Result};

/// One table declared in the user's schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    /// Table name in the database.
    pub name: String,
    /// Postgres schema the table lives in.
    pub schema: String,
}

impl TableDescription {
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
        }
    }

    /// `"schema"."name"`, quoted for use in SQL.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }
}

#[derive(Debug, Deserialize)]
struct TableEntry {
    name: Option<String>,
    schema: Option<String>,
}

/// Validated, non-empty mapping of table identifiers to table descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescription {
    tables: BTreeMap<String, TableDescription>,
}

impl SchemaDescription {
    pub fn from_tables(tables: impl IntoIterator<Item = (String, TableDescription)>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
        }
    }

    /// Validates a parsed schema document.
    ///
    /// The table map is taken from `default`, then `schema`, then the document itself.
    pub fn from_document(document: &Value, path: &Path) -> Result<Self> {
        let invalid = |reason: String| AssistError::SchemaModuleInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let root = document
            .get("default")
            .or_else(|| document.get("schema"))
            .unwrap_or(document);
        let Value::Object(entries) = root else {
            return Err(invalid(format!("expected an object of tables, found {}", kind_of(root))));
        };
        if entries.is_empty() {
            return Err(invalid(
                "no tables exported (e.g. { \"users\": { \"name\": \"users\" } })".to_string(),
            ));
        }

        let mut tables = BTreeMap::new();
        for (key, value) in entries {
            if !value.is_object() {
                return Err(invalid(format!(
                    "table '{}' must be an object, found {}",
                    key,
                    kind_of(value)
                )));
            }
            let entry: TableEntry = serde_json::from_value(value.clone())
                .map_err(|e| invalid(format!("table '{}': {}", key, e)))?;
            let description = TableDescription {
                name: entry.name.unwrap_or_else(|| key.clone()),
                schema: entry.schema.unwrap_or_else(|| TARGET_SCHEMA.to_string()),
            };
            tables.insert(key.clone(), description);
        }

        Ok(Self { tables })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDescription> {
        self.tables.values()
    }
}

/// Loads and validates the schema description behind `schemaPath`.
#[allow(async_fn_in_trait)]
pub trait SchemaLoader {
    async fn load(&self, path: &Path) -> Result<SchemaDescription>;
}

/// Reads schema descriptions from `.toml` or `.json` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSchemaLoader;

impl SchemaLoader for FileSchemaLoader {
    async fn load(&self, path: &Path) -> Result<SchemaDescription> {
        let invalid = |reason: String| AssistError::SchemaModuleInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let format = DocumentFormat::from_path(path)
            .ok_or_else(|| invalid("unsupported file extension, expected .toml or .json".to_string()))?;
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| invalid(e.to_string()))?;
        let document = parse_document(format, &contents).map_err(invalid)?;
        SchemaDescription::from_document(&document, path)
    }
}

/// Query-building handle around a session, bound to the loaded schema.
///
/// When `verbose` is set every statement is mirrored to the log before it runs.
pub struct SchemaDb<S> {
    session: S,
    verbose: bool,
}

impl<S: Session> SchemaDb<S> {
    pub fn new(session: S, verbose: bool) -> Self {
        Self { session, verbose }
    }

    pub fn into_session(self) -> S {
        self.session
    }

    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        if self.verbose {
            info!("Query: {}", sql);
        }
        self.session.execute(sql).await
    }

    /// Truncates every given table in one statement. Returns the statement run,
    /// or `None` when there was nothing to truncate.
    pub async fn truncate<'a, I>(&mut self, tables: I) -> Result<Option<String>>
    where
        I: IntoIterator<Item = &'a TableDescription>,
    {
        let Some(sql) = truncate_statement(tables) else {
            return Ok(None);
        };
        self.execute(&sql).await?;
        Ok(Some(sql))
    }
}

pub fn truncate_statement<'a, I>(tables: I) -> Option<String>
where
    I: IntoIterator<Item = &'a TableDescription>,
{
    let names: Vec<String> = tables.into_iter().map(TableDescription::qualified_name).collect();
    if names.is_empty() {
        return None;
    }
    Some(format!("TRUNCATE TABLE {} CASCADE;", names.join(", ")))
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
