//! Table mapping and table-reference resolution.
//!
//! A [`TableMapping`] maps a *mapping key* to a *table expression*, an
//! opaque SQL fragment such as `read_parquet('users.parquet')` or
//! `'https://host/data.csv'`. A key is either a bare table name (`users`)
//! or a schema-qualified name (`archive.users`). Keys are compared by
//! exact string equality.
//!
//! # Resolution rule
//!
//! - With a schema, only the `schema.table` key is consulted. If it is
//!   missing the reference compiles as the normal `"schema"."table"`
//!   identifier, even when a bare `table` key exists. An explicit schema
//!   opts the reference out of bare-name lookup entirely.
//! - Without a schema, the bare `table` key is consulted; a miss compiles
//!   as the quoted `"table"` identifier.
//!
//! This lets a logical table default to an external source while an
//! attached catalog holding a same-named table stays reachable through
//! its schema.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The outcome of resolving a table reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Append this table expression verbatim.
    MappedExpression(&'a str),
    /// Compile the reference as a (possibly schema-qualified) identifier.
    DefaultIdentifier,
}

/// Decides how a table reference is rendered.
///
/// The compiler calls this exactly once per table reference it compiles.
pub trait TableResolver: Send + Sync {
    /// Resolves a table reference.
    fn resolve(&self, schema: Option<&str>, table: &str) -> Resolution<'_>;
}

/// Immutable mapping from mapping keys to table expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableMapping {
    entries: HashMap<String, String>,
}

impl TableMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any previous expression for `key`.
    pub fn with(mut self, key: impl Into<String>, expression: impl Into<String>) -> Self {
        self.entries.insert(key.into(), expression.into());
        self
    }

    /// Returns the expression mapped to `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns true if `key` is mapped.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, expression)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for TableMapping
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TableResolver for TableMapping {
    fn resolve(&self, schema: Option<&str>, table: &str) -> Resolution<'_> {
        resolve(self, schema, table)
    }
}

/// Resolves `(schema, table)` against `mapping`.
pub fn resolve<'m>(mapping: &'m TableMapping, schema: Option<&str>, table: &str) -> Resolution<'m> {
    let expression = match schema {
        Some(schema) => mapping.get(&format!("{}.{}", schema, table)),
        None => mapping.get(table),
    };

    match expression {
        Some(expression) => Resolution::MappedExpression(expression),
        None => Resolution::DefaultIdentifier,
    }
}
