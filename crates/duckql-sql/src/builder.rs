//! Fluent builders over the query tree.
//!
//! Table names are given as `table`, `schema.table`, or either followed
//! by `as alias`. A default schema set with [`QueryBuilder::with_schema`]
//! is applied to every table name written without one.

use crate::ast::{
    ColumnDef, CreateTableQuery, DeleteQuery, DropTableQuery, Expr, InsertQuery, Join, JoinKind,
    OrderByExpr, Query, SelectItem, SelectQuery, SortDirection, TableRef, UpdateQuery,
};
use crate::types::NativeValue;

/// Entry point for building queries.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    /// Schema applied to unqualified table names.
    schema: Option<String>,
}

impl QueryBuilder {
    /// Creates a builder without a default schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualifies every unqualified table name with `schema`.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Parses a table name, applying the default schema.
    pub fn table(&self, reference: &str) -> TableRef {
        let table = TableRef::parse(reference);
        match (&table.schema, &self.schema) {
            (None, Some(schema)) => table.in_schema(schema.clone()),
            _ => table,
        }
    }

    /// Starts a SELECT from `table`.
    pub fn select_from(&self, table: &str) -> SelectBuilder {
        SelectBuilder {
            builder: self.clone(),
            query: SelectQuery {
                from: vec![self.table(table)],
                ..Default::default()
            },
        }
    }

    /// Starts an INSERT into `table`.
    pub fn insert_into(&self, table: &str) -> InsertBuilder {
        InsertBuilder {
            query: InsertQuery {
                table: self.table(table),
                columns: Vec::new(),
                values: Vec::new(),
                returning: Vec::new(),
            },
        }
    }

    /// Starts an UPDATE of `table`.
    pub fn update(&self, table: &str) -> UpdateBuilder {
        UpdateBuilder {
            query: UpdateQuery {
                table: self.table(table),
                assignments: Vec::new(),
                selection: None,
                returning: Vec::new(),
            },
        }
    }

    /// Starts a DELETE from `table`.
    pub fn delete_from(&self, table: &str) -> DeleteBuilder {
        DeleteBuilder {
            query: DeleteQuery {
                table: self.table(table),
                selection: None,
                returning: Vec::new(),
            },
        }
    }

    /// Starts a CREATE TABLE.
    pub fn create_table(&self, table: &str) -> CreateTableBuilder {
        CreateTableBuilder {
            query: CreateTableQuery {
                table: self.table(table),
                if_not_exists: false,
                columns: Vec::new(),
            },
        }
    }

    /// Builds a DROP TABLE.
    pub fn drop_table(&self, table: &str, if_exists: bool) -> Query {
        Query::DropTable(DropTableQuery {
            table: self.table(table),
            if_exists,
        })
    }

    /// Builds a raw query with positional parameters.
    pub fn raw(&self, sql: impl Into<String>, parameters: Vec<NativeValue>) -> Query {
        Query::raw(sql, parameters)
    }
}

/// Adds `condition` to `slot`, combining with AND.
fn and_into(slot: &mut Option<Expr>, condition: Expr) {
    *slot = Some(match slot.take() {
        Some(existing) => existing.and(condition),
        None => condition,
    });
}

/// Builder for SELECT queries.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    builder: QueryBuilder,
    query: SelectQuery,
}

impl SelectBuilder {
    /// Projects columns given as `table.column` or `column`.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.query
            .projection
            .extend(columns.iter().map(|c| SelectItem::column(c)));
        self
    }

    /// Projects `*`.
    pub fn select_all(mut self) -> Self {
        self.query.projection.push(SelectItem::Wildcard);
        self
    }

    /// Projects an expression, optionally aliased.
    pub fn select_expr(mut self, expr: Expr, alias: Option<&str>) -> Self {
        self.query.projection.push(SelectItem::Expr {
            expr,
            alias: alias.map(str::to_string),
        });
        self
    }

    /// Makes the query `select distinct`.
    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self
    }

    /// Adds another table to the FROM list.
    pub fn from(mut self, table: &str) -> Self {
        let table = self.builder.table(table);
        self.query.from.push(table);
        self
    }

    /// Adds a join with an explicit condition.
    pub fn join_on(mut self, kind: JoinKind, table: &str, on: Expr) -> Self {
        let table = self.builder.table(table);
        self.query.joins.push(Join {
            kind,
            table,
            on: Some(on),
        });
        self
    }

    /// `inner join table on left = right`.
    pub fn inner_join(self, table: &str, left: &str, right: &str) -> Self {
        self.join_on(JoinKind::Inner, table, Expr::col(left).equals(Expr::col(right)))
    }

    /// `left join table on left = right`.
    pub fn left_join(self, table: &str, left: &str, right: &str) -> Self {
        self.join_on(JoinKind::Left, table, Expr::col(left).equals(Expr::col(right)))
    }

    /// `cross join table`.
    pub fn cross_join(mut self, table: &str) -> Self {
        let table = self.builder.table(table);
        self.query.joins.push(Join {
            kind: JoinKind::Cross,
            table,
            on: None,
        });
        self
    }

    /// Adds a WHERE condition; repeated calls combine with AND.
    pub fn where_expr(mut self, condition: Expr) -> Self {
        and_into(&mut self.query.selection, condition);
        self
    }

    /// Adds `column = value` to the WHERE clause.
    pub fn where_eq(self, column: &str, value: impl Into<NativeValue>) -> Self {
        self.where_expr(Expr::col(column).equals(Expr::val(value)))
    }

    /// Adds GROUP BY columns.
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.query
            .group_by
            .extend(columns.iter().map(|c| Expr::col(c)));
        self
    }

    /// Adds a HAVING condition; repeated calls combine with AND.
    pub fn having(mut self, condition: Expr) -> Self {
        and_into(&mut self.query.having, condition);
        self
    }

    /// Adds an ORDER BY key.
    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.query.order_by.push(OrderByExpr {
            expr: Expr::col(column),
            direction,
        });
        self
    }

    /// Sets LIMIT, bound as a parameter.
    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(Expr::val(limit));
        self
    }

    /// Sets OFFSET, bound as a parameter.
    pub fn offset(mut self, offset: u64) -> Self {
        self.query.offset = Some(Expr::val(offset));
        self
    }

    /// Returns the select tree.
    pub fn into_select(self) -> SelectQuery {
        self.query
    }

    /// Builds the query.
    pub fn build(self) -> Query {
        Query::Select(self.query)
    }

    /// Builds `explain <options> <query>`.
    pub fn explain(self, options: &[&str]) -> Query {
        self.build().explain(options.iter().copied())
    }
}

/// Builder for INSERT statements.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    query: InsertQuery,
}

impl InsertBuilder {
    /// Sets the column list.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.query.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Appends a row of bound values.
    pub fn values<I, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<NativeValue>,
    {
        self.query
            .values
            .push(row.into_iter().map(|v| Expr::val(v)).collect());
        self
    }

    /// Appends a row of expressions.
    pub fn values_expr(mut self, row: Vec<Expr>) -> Self {
        self.query.values.push(row);
        self
    }

    /// Adds RETURNING columns.
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.query
            .returning
            .extend(columns.iter().map(|c| SelectItem::column(c)));
        self
    }

    /// Builds the statement.
    pub fn build(self) -> Query {
        Query::Insert(self.query)
    }
}

/// Builder for UPDATE statements.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    query: UpdateQuery,
}

impl UpdateBuilder {
    /// Adds `column = value`.
    pub fn set(mut self, column: &str, value: impl Into<NativeValue>) -> Self {
        self.query
            .assignments
            .push((column.to_string(), Expr::val(value)));
        self
    }

    /// Adds `column = expr`.
    pub fn set_expr(mut self, column: &str, expr: Expr) -> Self {
        self.query.assignments.push((column.to_string(), expr));
        self
    }

    /// Adds a WHERE condition; repeated calls combine with AND.
    pub fn where_expr(mut self, condition: Expr) -> Self {
        and_into(&mut self.query.selection, condition);
        self
    }

    /// Adds `column = value` to the WHERE clause.
    pub fn where_eq(self, column: &str, value: impl Into<NativeValue>) -> Self {
        self.where_expr(Expr::col(column).equals(Expr::val(value)))
    }

    /// Adds RETURNING columns.
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.query
            .returning
            .extend(columns.iter().map(|c| SelectItem::column(c)));
        self
    }

    /// Builds the statement.
    pub fn build(self) -> Query {
        Query::Update(self.query)
    }
}

/// Builder for DELETE statements.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    query: DeleteQuery,
}

impl DeleteBuilder {
    /// Adds a WHERE condition; repeated calls combine with AND.
    pub fn where_expr(mut self, condition: Expr) -> Self {
        and_into(&mut self.query.selection, condition);
        self
    }

    /// Adds `column = value` to the WHERE clause.
    pub fn where_eq(self, column: &str, value: impl Into<NativeValue>) -> Self {
        self.where_expr(Expr::col(column).equals(Expr::val(value)))
    }

    /// Adds RETURNING columns.
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.query
            .returning
            .extend(columns.iter().map(|c| SelectItem::column(c)));
        self
    }

    /// Builds the statement.
    pub fn build(self) -> Query {
        Query::Delete(self.query)
    }
}

/// Builder for CREATE TABLE statements.
#[derive(Debug, Clone)]
pub struct CreateTableBuilder {
    query: CreateTableQuery,
}

impl CreateTableBuilder {
    /// Adds `if not exists`.
    pub fn if_not_exists(mut self) -> Self {
        self.query.if_not_exists = true;
        self
    }

    /// Adds a column.
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.query.columns.push(column);
        self
    }

    /// Builds the statement.
    pub fn build(self) -> Query {
        Query::CreateTable(self.query)
    }
}
