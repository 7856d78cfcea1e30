//! SQL text generation for DuckDB.
//!
//! [`QueryCompiler`] walks a [`Query`] and produces SQL text plus the
//! positional parameters for its `?` placeholders. DuckDB specifics:
//!
//! - identifiers are double-quoted with embedded quotes doubled
//! - parameters are positional `?`
//! - EXPLAIN options are written bare (`explain analyze select ...`)
//! - there is no auto-increment column attribute; asking for one fails
//!
//! Every table reference goes through the compiler's [`TableResolver`],
//! which either supplies a table expression to insert verbatim or lets
//! the reference compile as an identifier.

mod ident;

pub use ident::{quote_identifier, unquote_identifier};

use ident::push_quoted;

use crate::ast::{
    BinaryOperator, ColumnDef, CreateTableQuery, DeleteQuery, DropTableQuery, ExplainQuery, Expr,
    InsertQuery, Query, RawQuery, SelectItem, SelectQuery, SortDirection, TableRef, UpdateQuery,
};
use crate::error::{CompileError, CompileResult};
use crate::mapping::{Resolution, TableResolver};
use crate::types::NativeValue;

/// SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Parameters, in placeholder order.
    pub parameters: Vec<NativeValue>,
}

impl CompiledQuery {
    /// Creates a compiled query without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    /// Returns the number of `?` parameters.
    pub fn param_count(&self) -> usize {
        self.parameters.len()
    }
}

/// Compiles query trees into DuckDB SQL.
///
/// A compiler is single-use: [`compile`](Self::compile) consumes it.
pub struct QueryCompiler<'a> {
    /// Table reference strategy.
    resolver: &'a dyn TableResolver,
    /// Output buffer.
    sql: String,
    /// Collected parameters.
    parameters: Vec<NativeValue>,
}

impl<'a> QueryCompiler<'a> {
    /// Creates a compiler that resolves table references with `resolver`.
    pub fn new(resolver: &'a dyn TableResolver) -> Self {
        Self {
            resolver,
            sql: String::new(),
            parameters: Vec::new(),
        }
    }

    /// Compiles `query`.
    pub fn compile(mut self, query: &Query) -> CompileResult<CompiledQuery> {
        self.visit_query(query)?;
        Ok(CompiledQuery {
            sql: self.sql,
            parameters: self.parameters,
        })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn visit_query(&mut self, query: &Query) -> CompileResult<()> {
        match query {
            Query::Select(select) => self.visit_select(select),
            Query::Insert(insert) => self.visit_insert(insert),
            Query::Update(update) => self.visit_update(update),
            Query::Delete(delete) => self.visit_delete(delete),
            Query::CreateTable(create) => self.visit_create_table(create),
            Query::DropTable(drop) => self.visit_drop_table(drop),
            Query::Explain(explain) => self.visit_explain(explain),
            Query::Raw(raw) => {
                self.visit_raw(raw);
                Ok(())
            }
        }
    }

    fn visit_select(&mut self, select: &SelectQuery) -> CompileResult<()> {
        self.sql.push_str("select ");
        if select.distinct {
            self.sql.push_str("distinct ");
        }

        if select.projection.is_empty() {
            self.sql.push('*');
        } else {
            self.visit_select_items(&select.projection)?;
        }

        if !select.from.is_empty() {
            self.sql.push_str(" from ");
            for (i, table) in select.from.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.visit_table(table)?;
            }
        }

        for join in &select.joins {
            self.sql.push(' ');
            self.sql.push_str(join.kind.as_sql());
            self.sql.push(' ');
            self.visit_table(&join.table)?;
            if let Some(on) = &join.on {
                self.sql.push_str(" on ");
                self.visit_expr(on)?;
            }
        }

        if let Some(selection) = &select.selection {
            self.sql.push_str(" where ");
            self.visit_expr(selection)?;
        }

        if !select.group_by.is_empty() {
            self.sql.push_str(" group by ");
            self.visit_expr_list(&select.group_by)?;
        }

        if let Some(having) = &select.having {
            self.sql.push_str(" having ");
            self.visit_expr(having)?;
        }

        if !select.order_by.is_empty() {
            self.sql.push_str(" order by ");
            for (i, item) in select.order_by.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.visit_expr(&item.expr)?;
                self.sql.push_str(match item.direction {
                    SortDirection::Asc => " asc",
                    SortDirection::Desc => " desc",
                });
            }
        }

        if let Some(limit) = &select.limit {
            self.sql.push_str(" limit ");
            self.visit_expr(limit)?;
        }

        if let Some(offset) = &select.offset {
            self.sql.push_str(" offset ");
            self.visit_expr(offset)?;
        }

        Ok(())
    }

    fn visit_insert(&mut self, insert: &InsertQuery) -> CompileResult<()> {
        if insert.values.is_empty() {
            return Err(CompileError::EmptyInsert {
                table: insert.table.to_string(),
            });
        }

        self.sql.push_str("insert into ");
        self.visit_table(&insert.table)?;

        if !insert.columns.is_empty() {
            self.sql.push_str(" (");
            for (i, column) in insert.columns.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.visit_identifier(column)?;
            }
            self.sql.push(')');
        }

        self.sql.push_str(" values ");
        for (row_index, row) in insert.values.iter().enumerate() {
            if !insert.columns.is_empty() && row.len() != insert.columns.len() {
                return Err(CompileError::InsertArity {
                    row: row_index,
                    expected: insert.columns.len(),
                    found: row.len(),
                });
            }
            if row_index > 0 {
                self.sql.push_str(", ");
            }
            self.sql.push('(');
            self.visit_expr_list(row)?;
            self.sql.push(')');
        }

        self.visit_returning(&insert.returning)
    }

    fn visit_update(&mut self, update: &UpdateQuery) -> CompileResult<()> {
        if update.assignments.is_empty() {
            return Err(CompileError::EmptyUpdate {
                table: update.table.to_string(),
            });
        }

        self.sql.push_str("update ");
        self.visit_table(&update.table)?;
        self.sql.push_str(" set ");
        for (i, (column, value)) in update.assignments.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.visit_identifier(column)?;
            self.sql.push_str(" = ");
            self.visit_expr(value)?;
        }

        if let Some(selection) = &update.selection {
            self.sql.push_str(" where ");
            self.visit_expr(selection)?;
        }

        self.visit_returning(&update.returning)
    }

    fn visit_delete(&mut self, delete: &DeleteQuery) -> CompileResult<()> {
        self.sql.push_str("delete from ");
        self.visit_table(&delete.table)?;

        if let Some(selection) = &delete.selection {
            self.sql.push_str(" where ");
            self.visit_expr(selection)?;
        }

        self.visit_returning(&delete.returning)
    }

    fn visit_create_table(&mut self, create: &CreateTableQuery) -> CompileResult<()> {
        if create.columns.is_empty() {
            return Err(CompileError::EmptyCreateTable {
                table: create.table.to_string(),
            });
        }

        self.sql.push_str("create table ");
        if create.if_not_exists {
            self.sql.push_str("if not exists ");
        }
        self.visit_table(&create.table)?;
        self.sql.push_str(" (");
        for (i, column) in create.columns.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.visit_column_def(column)?;
        }
        self.sql.push(')');
        Ok(())
    }

    fn visit_column_def(&mut self, column: &ColumnDef) -> CompileResult<()> {
        if column.auto_increment {
            return Err(CompileError::AutoIncrementUnsupported {
                column: column.name.clone(),
            });
        }

        self.visit_identifier(&column.name)?;
        self.sql.push(' ');
        self.sql.push_str(&column.data_type.to_string());

        if column.primary_key {
            self.sql.push_str(" primary key");
        }
        if column.unique {
            self.sql.push_str(" unique");
        }
        if column.not_null {
            self.sql.push_str(" not null");
        }
        if let Some(default) = &column.default {
            self.sql.push_str(" default ");
            // DDL takes no parameters, so values are inlined.
            match default {
                Expr::Value(value) => self.visit_literal(value)?,
                other => self.visit_expr(other)?,
            }
        }
        Ok(())
    }

    fn visit_drop_table(&mut self, drop: &DropTableQuery) -> CompileResult<()> {
        self.sql.push_str("drop table ");
        if drop.if_exists {
            self.sql.push_str("if exists ");
        }
        self.visit_table(&drop.table)
    }

    fn visit_explain(&mut self, explain: &ExplainQuery) -> CompileResult<()> {
        self.sql.push_str("explain");
        for option in &explain.options {
            self.sql.push(' ');
            self.sql.push_str(option);
        }
        self.sql.push(' ');
        self.visit_query(&explain.query)
    }

    fn visit_raw(&mut self, raw: &RawQuery) {
        self.sql.push_str(&raw.sql);
        self.parameters.extend(raw.parameters.iter().cloned());
    }

    fn visit_returning(&mut self, returning: &[SelectItem]) -> CompileResult<()> {
        if returning.is_empty() {
            return Ok(());
        }
        self.sql.push_str(" returning ");
        self.visit_select_items(returning)
    }

    // =========================================================================
    // Tables and identifiers
    // =========================================================================

    fn visit_table(&mut self, table: &TableRef) -> CompileResult<()> {
        let resolver = self.resolver;
        match resolver.resolve(table.schema.as_deref(), &table.name) {
            Resolution::MappedExpression(expression) => {
                tracing::trace!(table = %table, expression, "table reference mapped");
                self.sql.push_str(expression);
            }
            Resolution::DefaultIdentifier => {
                if let Some(schema) = &table.schema {
                    self.visit_identifier(schema)?;
                    self.sql.push('.');
                }
                self.visit_identifier(&table.name)?;
            }
        }

        if let Some(alias) = &table.alias {
            self.sql.push_str(" as ");
            self.visit_identifier(alias)?;
        }
        Ok(())
    }

    fn visit_identifier(&mut self, ident: &str) -> CompileResult<()> {
        if ident.is_empty() {
            return Err(CompileError::EmptyIdentifier);
        }
        push_quoted(&mut self.sql, ident);
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn visit_select_items(&mut self, items: &[SelectItem]) -> CompileResult<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            match item {
                SelectItem::Wildcard => self.sql.push('*'),
                SelectItem::QualifiedWildcard(table) => {
                    self.visit_identifier(table)?;
                    self.sql.push_str(".*");
                }
                SelectItem::Expr { expr, alias } => {
                    self.visit_expr(expr)?;
                    if let Some(alias) = alias {
                        self.sql.push_str(" as ");
                        self.visit_identifier(alias)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn visit_expr_list(&mut self, exprs: &[Expr]) -> CompileResult<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.visit_expr(expr)?;
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::Column(column) => {
                if let Some(table) = &column.table {
                    self.visit_identifier(table)?;
                    self.sql.push('.');
                }
                self.visit_identifier(&column.name)
            }
            Expr::Value(value) => {
                self.sql.push('?');
                self.parameters.push(value.clone());
                Ok(())
            }
            Expr::Raw(sql) => {
                self.sql.push_str(sql);
                Ok(())
            }
            Expr::Binary { left, op, right } => {
                self.visit_operand(left, *op)?;
                self.sql.push(' ');
                self.sql.push_str(op.as_sql());
                self.sql.push(' ');
                self.visit_operand(right, *op)
            }
            Expr::Not(inner) => {
                self.sql.push_str("not ");
                self.visit_wrapped(inner)
            }
            Expr::IsNull { expr, negated } => {
                self.visit_wrapped(expr)?;
                self.sql
                    .push_str(if *negated { " is not null" } else { " is null" });
                Ok(())
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    return Err(CompileError::EmptyInList);
                }
                self.visit_wrapped(expr)?;
                self.sql.push_str(if *negated { " not in (" } else { " in (" });
                self.visit_expr_list(list)?;
                self.sql.push(')');
                Ok(())
            }
            Expr::Function { name, args } => {
                self.sql.push_str(name);
                self.sql.push('(');
                self.visit_expr_list(args)?;
                self.sql.push(')');
                Ok(())
            }
            Expr::Cast { expr, data_type } => {
                self.sql.push_str("cast(");
                self.visit_expr(expr)?;
                self.sql.push_str(" as ");
                self.sql.push_str(&data_type.to_string());
                self.sql.push(')');
                Ok(())
            }
        }
    }

    /// Compiles a binary operand, parenthesizing it when it binds looser
    /// than `parent` or is a logical expression under a different operator.
    ///
    /// Prefix `not` and the `is null` / `in` predicates only sit bare
    /// beside `and` / `or`.
    fn visit_operand(&mut self, operand: &Expr, parent: BinaryOperator) -> CompileResult<()> {
        let needs_parens = match operand {
            Expr::Binary { op, .. } if op.is_logical() && *op != parent => true,
            Expr::Binary { op, .. } => {
                let (child, outer) = (precedence(*op), precedence(parent));
                child < outer || (child == outer && !(*op == parent && is_associative(parent)))
            }
            Expr::Not(_) | Expr::IsNull { .. } | Expr::InList { .. } => !parent.is_logical(),
            _ => false,
        };

        if needs_parens {
            self.sql.push('(');
            self.visit_expr(operand)?;
            self.sql.push(')');
            Ok(())
        } else {
            self.visit_expr(operand)
        }
    }

    /// Compiles `expr`, parenthesizing any compound expression.
    fn visit_wrapped(&mut self, expr: &Expr) -> CompileResult<()> {
        if matches!(
            expr,
            Expr::Binary { .. } | Expr::Not(_) | Expr::IsNull { .. } | Expr::InList { .. }
        ) {
            self.sql.push('(');
            self.visit_expr(expr)?;
            self.sql.push(')');
            Ok(())
        } else {
            self.visit_expr(expr)
        }
    }

    fn visit_literal(&mut self, value: &NativeValue) -> CompileResult<()> {
        let literal = match value {
            NativeValue::Null => "null".to_string(),
            NativeValue::Boolean(b) => b.to_string(),
            NativeValue::TinyInt(v) => v.to_string(),
            NativeValue::SmallInt(v) => v.to_string(),
            NativeValue::Integer(v) => v.to_string(),
            NativeValue::BigInt(v) => v.to_string(),
            NativeValue::HugeInt(v) => v.to_string(),
            NativeValue::UTinyInt(v) => v.to_string(),
            NativeValue::USmallInt(v) => v.to_string(),
            NativeValue::UInteger(v) => v.to_string(),
            NativeValue::UBigInt(v) => v.to_string(),
            NativeValue::Float(v) if v.is_finite() => v.to_string(),
            NativeValue::Double(v) if v.is_finite() => v.to_string(),
            NativeValue::Varchar(s) => format!("'{}'", s.replace('\'', "''")),
            other => {
                return Err(CompileError::UnsupportedLiteral {
                    type_id: other.tag(),
                })
            }
        };
        self.sql.push_str(&literal);
        Ok(())
    }
}

fn precedence(op: BinaryOperator) -> u8 {
    match op {
        BinaryOperator::Or => 1,
        BinaryOperator::And => 2,
        BinaryOperator::Eq
        | BinaryOperator::NotEq
        | BinaryOperator::Lt
        | BinaryOperator::LtEq
        | BinaryOperator::Gt
        | BinaryOperator::GtEq
        | BinaryOperator::Like
        | BinaryOperator::NotLike => 3,
        BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Concat => 4,
        BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 5,
    }
}

fn is_associative(op: BinaryOperator) -> bool {
    matches!(
        op,
        BinaryOperator::And
            | BinaryOperator::Or
            | BinaryOperator::Plus
            | BinaryOperator::Multiply
            | BinaryOperator::Concat
    )
}
