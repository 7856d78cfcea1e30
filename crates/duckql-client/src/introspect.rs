//! Schema introspection through `information_schema`.

use duckql_sql::{Expr, JoinKind, Query, QueryBuilder, SortDirection};

use crate::client::Client;
use crate::error::{ClientError, ClientResult};
use crate::row::Row;

/// Schemas hidden unless internal schemas are requested.
const INTERNAL_SCHEMAS: &[&str] = &["information_schema", "pg_catalog"];

/// A schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMetadata {
    /// Schema name.
    pub name: String,
}

/// A column of a table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    /// Column name.
    pub name: String,
    /// DuckDB type name, as reported by the catalog.
    pub data_type: String,
    /// True if the column accepts NULL.
    pub is_nullable: bool,
    /// True if the column has a default value.
    pub has_default_value: bool,
}

/// A table or view with its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// True for views.
    pub is_view: bool,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnMetadata>,
}

/// Introspection options.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntrospectOptions {
    /// Include `information_schema` and `pg_catalog`.
    pub with_internal_schemas: bool,
}

/// Reads catalog metadata through a client.
#[derive(Debug)]
pub struct Introspector<'a> {
    client: &'a Client,
}

impl<'a> Introspector<'a> {
    /// Creates an introspector over `client`.
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Lists schemas.
    pub async fn get_schemas(&self) -> ClientResult<Vec<SchemaMetadata>> {
        let result = self.client.execute(&schemas_query()).await?;
        result
            .iter()
            .map(|row| {
                Ok(SchemaMetadata {
                    name: text(row, "schema_name")?,
                })
            })
            .collect()
    }

    /// Lists tables and views with their columns.
    pub async fn get_tables(&self, options: IntrospectOptions) -> ClientResult<Vec<TableMetadata>> {
        let result = self.client.execute(&tables_query(options)).await?;

        let mut tables: Vec<TableMetadata> = Vec::new();
        for row in result.iter() {
            let schema = text(row, "table_schema")?;
            let name = text(row, "table_name")?;
            let column = ColumnMetadata {
                name: text(row, "column_name")?,
                data_type: text(row, "data_type")?,
                is_nullable: text(row, "is_nullable")? == "YES",
                has_default_value: row.get("column_default").is_some_and(|v| !v.is_null()),
            };

            match tables.last_mut() {
                Some(table) if table.schema == schema && table.name == name => {
                    table.columns.push(column);
                }
                _ => tables.push(TableMetadata {
                    is_view: text(row, "table_type")? == "VIEW",
                    schema,
                    name,
                    columns: vec![column],
                }),
            }
        }

        tracing::debug!(tables = tables.len(), "introspected tables");
        Ok(tables)
    }
}

pub(crate) fn schemas_query() -> Query {
    QueryBuilder::new()
        .select_from("information_schema.schemata")
        .select(&["schema_name"])
        .order_by("schema_name", SortDirection::Asc)
        .build()
}

pub(crate) fn tables_query(options: IntrospectOptions) -> Query {
    let on = Expr::col("c.table_schema")
        .equals(Expr::col("t.table_schema"))
        .and(Expr::col("c.table_name").equals(Expr::col("t.table_name")));

    let mut select = QueryBuilder::new()
        .select_from("information_schema.columns as c")
        .select(&[
            "c.table_schema",
            "c.table_name",
            "t.table_type",
            "c.column_name",
            "c.data_type",
            "c.is_nullable",
            "c.column_default",
        ])
        .join_on(JoinKind::Inner, "information_schema.tables as t", on);

    if !options.with_internal_schemas {
        select = select.where_expr(Expr::InList {
            expr: Box::new(Expr::col("c.table_schema")),
            list: INTERNAL_SCHEMAS.iter().map(|s| Expr::val(*s)).collect(),
            negated: true,
        });
    }

    select
        .order_by("c.table_schema", SortDirection::Asc)
        .order_by("c.table_name", SortDirection::Asc)
        .order_by("c.ordinal_position", SortDirection::Asc)
        .build()
}

fn text(row: &Row, column: &str) -> ClientResult<String> {
    row.get(column)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ClientError::QueryFailed(format!("catalog column '{}' missing", column)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ClientConfig;
    use crate::connection::{ColumnInfo, ResultSet};
    use crate::memory::MemoryConnection;
    use duckql_sql::{LogicalType, NativeValue};

    fn varchar(s: &str) -> NativeValue {
        NativeValue::Varchar(s.to_string())
    }

    fn setup() -> (MemoryConnection, Client) {
        let conn = MemoryConnection::new();
        let client = Client::new(Arc::new(conn.clone()), ClientConfig::default()).unwrap();
        (conn, client)
    }

    #[test]
    fn test_tables_query_sql() {
        let (_conn, client) = setup();
        let sql = client
            .compile(&tables_query(IntrospectOptions::default()))
            .unwrap()
            .sql;
        assert!(sql.starts_with("select \"c\".\"table_schema\""));
        assert!(sql.contains(
            "from \"information_schema\".\"columns\" as \"c\" inner join \
             \"information_schema\".\"tables\" as \"t\""
        ));
        assert!(sql.contains("where \"c\".\"table_schema\" not in (?, ?)"));
    }

    #[tokio::test]
    async fn test_get_schemas() {
        let (conn, client) = setup();
        let sql = client.compile(&schemas_query()).unwrap().sql;
        conn.register(
            sql,
            ResultSet::new(
                vec![ColumnInfo::new("schema_name", LogicalType::Varchar)],
                vec![vec![varchar("archive")], vec![varchar("main")]],
            ),
        );

        let schemas = Introspector::new(&client).get_schemas().await.unwrap();
        assert_eq!(
            schemas,
            vec![
                SchemaMetadata {
                    name: "archive".to_string()
                },
                SchemaMetadata {
                    name: "main".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_get_tables_groups_columns() {
        let (conn, client) = setup();
        let sql = client
            .compile(&tables_query(IntrospectOptions::default()))
            .unwrap()
            .sql;

        let columns = [
            "table_schema",
            "table_name",
            "table_type",
            "column_name",
            "data_type",
            "is_nullable",
            "column_default",
        ]
        .iter()
        .map(|name| ColumnInfo::new(*name, LogicalType::Varchar))
        .collect();

        let row = |schema: &str, table: &str, kind: &str, column: &str, nullable: &str| {
            vec![
                varchar(schema),
                varchar(table),
                varchar(kind),
                varchar(column),
                varchar("INTEGER"),
                varchar(nullable),
                NativeValue::Null,
            ]
        };
        conn.register(
            sql,
            ResultSet::new(
                columns,
                vec![
                    row("main", "users", "BASE TABLE", "id", "NO"),
                    row("main", "users", "BASE TABLE", "age", "YES"),
                    row("main", "v_users", "VIEW", "id", "YES"),
                ],
            ),
        );

        let tables = Introspector::new(&client)
            .get_tables(IntrospectOptions::default())
            .await
            .unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "users");
        assert!(!tables[0].is_view);
        assert_eq!(tables[0].columns.len(), 2);
        assert!(!tables[0].columns[0].is_nullable);
        assert!(tables[0].columns[1].is_nullable);
        assert!(!tables[0].columns[0].has_default_value);
        assert!(tables[1].is_view);
    }
}
