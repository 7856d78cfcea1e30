//! Statements.

use std::fmt;

use super::Expr;
use crate::types::{LogicalType, NativeValue};

/// A reference to a table by (optional) schema and name.
///
/// This is the node the compiler hands to a [`TableResolver`]; whether it
/// becomes a quoted identifier or a mapped table expression is decided
/// there.
///
/// [`TableResolver`]: crate::mapping::TableResolver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Optional schema qualifier.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
    /// Optional alias.
    pub alias: Option<String>,
}

impl TableRef {
    /// Creates an unqualified table reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    /// Creates a schema-qualified table reference.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
            alias: None,
        }
    }

    /// Parses `schema.table`, `table`, and either followed by `as alias`.
    ///
    /// Only the first `.` separates schema from table.
    pub fn parse(reference: &str) -> Self {
        let (name_part, alias) = match reference.split_once(" as ") {
            Some((name, alias)) => (name.trim(), Some(alias.trim().to_string())),
            None => (reference.trim(), None),
        };

        let mut table = match name_part.split_once('.') {
            Some((schema, name)) => Self::qualified(schema, name),
            None => Self::new(name_part),
        };
        table.alias = alias;
        table
    }

    /// Sets the alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " as {}", alias)?;
        }
        Ok(())
    }
}

/// One item of a projection or RETURNING list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `table.*`
    QualifiedWildcard(String),
    /// An expression with an optional alias.
    Expr {
        /// Projected expression.
        expr: Expr,
        /// Output name.
        alias: Option<String>,
    },
}

impl SelectItem {
    /// Projects a column given as `table.column` or `column`; `*` and
    /// `table.*` become wildcards.
    pub fn column(reference: &str) -> Self {
        if reference == "*" {
            return SelectItem::Wildcard;
        }
        if let Some(table) = reference.strip_suffix(".*") {
            return SelectItem::QualifiedWildcard(table.to_string());
        }
        SelectItem::Expr {
            expr: Expr::col(reference),
            alias: None,
        }
    }

    /// Projects an expression under an alias.
    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// Join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// `inner join`
    Inner,
    /// `left join`
    Left,
    /// `right join`
    Right,
    /// `full join`
    Full,
    /// `cross join`
    Cross,
}

impl JoinKind {
    /// Returns the SQL keyword sequence.
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner join",
            JoinKind::Left => "left join",
            JoinKind::Right => "right join",
            JoinKind::Full => "full join",
            JoinKind::Cross => "cross join",
        }
    }
}

/// A join against another table.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join kind.
    pub kind: JoinKind,
    /// Joined table.
    pub table: TableRef,
    /// Join condition; absent for cross joins.
    pub on: Option<Expr>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// An ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    /// Sort key.
    pub expr: Expr,
    /// Direction.
    pub direction: SortDirection,
}

/// A SELECT query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    /// `select distinct`.
    pub distinct: bool,
    /// Projection; empty means `*`.
    pub projection: Vec<SelectItem>,
    /// FROM list.
    pub from: Vec<TableRef>,
    /// Joins, in order.
    pub joins: Vec<Join>,
    /// WHERE condition.
    pub selection: Option<Expr>,
    /// GROUP BY keys.
    pub group_by: Vec<Expr>,
    /// HAVING condition.
    pub having: Option<Expr>,
    /// ORDER BY items.
    pub order_by: Vec<OrderByExpr>,
    /// LIMIT.
    pub limit: Option<Expr>,
    /// OFFSET.
    pub offset: Option<Expr>,
}

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    /// Target table.
    pub table: TableRef,
    /// Column list.
    pub columns: Vec<String>,
    /// Value rows.
    pub values: Vec<Vec<Expr>>,
    /// RETURNING list.
    pub returning: Vec<SelectItem>,
}

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    /// Target table.
    pub table: TableRef,
    /// `column = expr` assignments.
    pub assignments: Vec<(String, Expr)>,
    /// WHERE condition.
    pub selection: Option<Expr>,
    /// RETURNING list.
    pub returning: Vec<SelectItem>,
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    /// Target table.
    pub table: TableRef,
    /// WHERE condition.
    pub selection: Option<Expr>,
    /// RETURNING list.
    pub returning: Vec<SelectItem>,
}

/// A column definition in CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Column type.
    pub data_type: LogicalType,
    /// `not null`.
    pub not_null: bool,
    /// `primary key`.
    pub primary_key: bool,
    /// `unique`.
    pub unique: bool,
    /// Auto-increment; has no DuckDB representation and fails to compile.
    pub auto_increment: bool,
    /// `default <expr>`.
    pub default: Option<Expr>,
}

impl ColumnDef {
    /// Creates a nullable column without constraints.
    pub fn new(name: impl Into<String>, data_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            data_type,
            not_null: false,
            primary_key: false,
            unique: false,
            auto_increment: false,
            default: None,
        }
    }

    /// Adds `not null`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Adds `primary key`.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Adds `unique`.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column auto-increment.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Adds a default expression.
    pub fn default_to(mut self, expr: Expr) -> Self {
        self.default = Some(expr);
        self
    }
}

/// A CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableQuery {
    /// Target table.
    pub table: TableRef,
    /// `if not exists`.
    pub if_not_exists: bool,
    /// Column definitions.
    pub columns: Vec<ColumnDef>,
}

/// A DROP TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableQuery {
    /// Target table.
    pub table: TableRef,
    /// `if exists`.
    pub if_exists: bool,
}

/// An EXPLAIN statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainQuery {
    /// Options such as `analyze`, emitted without a wrapper.
    pub options: Vec<String>,
    /// Explained query.
    pub query: Box<Query>,
}

/// Raw SQL with `?` placeholders and their parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuery {
    /// SQL text.
    pub sql: String,
    /// Positional parameters.
    pub parameters: Vec<NativeValue>,
}

/// A query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// SELECT.
    Select(SelectQuery),
    /// INSERT.
    Insert(InsertQuery),
    /// UPDATE.
    Update(UpdateQuery),
    /// DELETE.
    Delete(DeleteQuery),
    /// CREATE TABLE.
    CreateTable(CreateTableQuery),
    /// DROP TABLE.
    DropTable(DropTableQuery),
    /// EXPLAIN.
    Explain(ExplainQuery),
    /// Raw SQL.
    Raw(RawQuery),
}

impl Query {
    /// Creates a raw query.
    pub fn raw(sql: impl Into<String>, parameters: Vec<NativeValue>) -> Self {
        Query::Raw(RawQuery {
            sql: sql.into(),
            parameters,
        })
    }

    /// Returns the statement kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Select(_) => "select",
            Query::Insert(_) => "insert",
            Query::Update(_) => "update",
            Query::Delete(_) => "delete",
            Query::CreateTable(_) => "create_table",
            Query::DropTable(_) => "drop_table",
            Query::Explain(_) => "explain",
            Query::Raw(_) => "raw",
        }
    }

    /// Wraps this query in EXPLAIN with the given options.
    pub fn explain<I, S>(self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::Explain(ExplainQuery {
            options: options.into_iter().map(Into::into).collect(),
            query: Box::new(self),
        })
    }
}

impl From<SelectQuery> for Query {
    fn from(query: SelectQuery) -> Self {
        Query::Select(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_ref_parse() {
        assert_eq!(TableRef::parse("users"), TableRef::new("users"));
        assert_eq!(
            TableRef::parse("archive.users"),
            TableRef::qualified("archive", "users")
        );
        assert_eq!(
            TableRef::parse("archive.users as u"),
            TableRef::qualified("archive", "users").alias("u")
        );
    }

    #[test]
    fn test_table_ref_parse_splits_on_first_dot() {
        let table = TableRef::parse("db.main.users");
        assert_eq!(table.schema.as_deref(), Some("db"));
        assert_eq!(table.name, "main.users");
    }

    #[test]
    fn test_table_ref_display() {
        let table = TableRef::qualified("archive", "users").alias("u");
        assert_eq!(table.to_string(), "archive.users as u");
    }

    #[test]
    fn test_column_def_builder() {
        let col = ColumnDef::new("id", LogicalType::Integer)
            .not_null()
            .primary_key();
        assert!(col.not_null);
        assert!(col.primary_key);
        assert!(!col.auto_increment);
    }

    #[test]
    fn test_query_kind() {
        let query = Query::raw("select 1", vec![]);
        assert_eq!(query.kind(), "raw");
        assert_eq!(query.explain(["analyze"]).kind(), "explain");
    }
}
