//! Expressions.

use std::fmt;

use crate::types::{LogicalType, NativeValue};

/// A column reference (`table.column` or just `column`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Optional table (or alias) qualifier.
    pub table: Option<String>,
    /// Column name.
    pub name: String,
}

impl ColumnRef {
    /// Creates an unqualified column reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    /// Creates a qualified column reference.
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Parses `table.column` or `column`.
    pub fn parse(reference: &str) -> Self {
        match reference.split_once('.') {
            Some((table, name)) => Self::qualified(table, name),
            None => Self::new(reference),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `and`
    And,
    /// `or`
    Or,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `like`
    Like,
    /// `not like`
    NotLike,
    /// `||`
    Concat,
}

impl BinaryOperator {
    /// Returns the SQL text of this operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Like => "like",
            BinaryOperator::NotLike => "not like",
            BinaryOperator::Concat => "||",
        }
    }

    /// Returns true for `and` / `or`.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

/// An expression in a query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference.
    Column(ColumnRef),
    /// Bound parameter, compiled to a `?` placeholder.
    Value(NativeValue),
    /// Raw SQL fragment, inserted verbatim.
    Raw(String),
    /// Binary operation.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOperator,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Logical negation.
    Not(Box<Expr>),
    /// `is null` / `is not null`.
    IsNull {
        /// Tested expression.
        expr: Box<Expr>,
        /// True for `is not null`.
        negated: bool,
    },
    /// `in (...)` / `not in (...)`.
    InList {
        /// Tested expression.
        expr: Box<Expr>,
        /// Candidates.
        list: Vec<Expr>,
        /// True for `not in`.
        negated: bool,
    },
    /// Function call.
    Function {
        /// Function name, emitted as is.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// `cast(expr as type)`.
    Cast {
        /// Cast operand.
        expr: Box<Expr>,
        /// Target type.
        data_type: LogicalType,
    },
}

impl Expr {
    /// Creates a column reference from `table.column` or `column`.
    pub fn col(reference: &str) -> Self {
        Expr::Column(ColumnRef::parse(reference))
    }

    /// Creates a bound parameter.
    pub fn val(value: impl Into<NativeValue>) -> Self {
        Expr::Value(value.into())
    }

    /// Creates a raw SQL fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    /// Creates a function call.
    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    /// Creates a binary expression.
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// `self = other`
    pub fn equals(self, other: impl Into<Expr>) -> Self {
        Self::binary(self, BinaryOperator::Eq, other.into())
    }

    /// `self <> other`
    pub fn not_equals(self, other: impl Into<Expr>) -> Self {
        Self::binary(self, BinaryOperator::NotEq, other.into())
    }

    /// `self < other`
    pub fn lt(self, other: impl Into<Expr>) -> Self {
        Self::binary(self, BinaryOperator::Lt, other.into())
    }

    /// `self <= other`
    pub fn lt_eq(self, other: impl Into<Expr>) -> Self {
        Self::binary(self, BinaryOperator::LtEq, other.into())
    }

    /// `self > other`
    pub fn gt(self, other: impl Into<Expr>) -> Self {
        Self::binary(self, BinaryOperator::Gt, other.into())
    }

    /// `self >= other`
    pub fn gt_eq(self, other: impl Into<Expr>) -> Self {
        Self::binary(self, BinaryOperator::GtEq, other.into())
    }

    /// `self like pattern`
    pub fn like(self, pattern: impl Into<Expr>) -> Self {
        Self::binary(self, BinaryOperator::Like, pattern.into())
    }

    /// `self and other`
    pub fn and(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::And, other)
    }

    /// `self or other`
    pub fn or(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::Or, other)
    }

    /// `not self`
    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// `self is null`
    pub fn is_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// `self is not null`
    pub fn is_not_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// `self in (list)`
    pub fn in_list(self, list: Vec<Expr>) -> Self {
        Expr::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    /// `cast(self as data_type)`
    pub fn cast(self, data_type: LogicalType) -> Self {
        Expr::Cast {
            expr: Box::new(self),
            data_type,
        }
    }
}

impl From<ColumnRef> for Expr {
    fn from(column: ColumnRef) -> Self {
        Expr::Column(column)
    }
}

impl From<NativeValue> for Expr {
    fn from(value: NativeValue) -> Self {
        Expr::Value(value)
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::val(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::val(v)
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::val(v)
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::val(v)
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Expr::val(v)
    }
}

impl From<String> for Expr {
    fn from(v: String) -> Self {
        Expr::val(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref_parse() {
        assert_eq!(ColumnRef::parse("id"), ColumnRef::new("id"));
        assert_eq!(ColumnRef::parse("u.id"), ColumnRef::qualified("u", "id"));
        assert_eq!(ColumnRef::parse("u.id").to_string(), "u.id");
    }

    #[test]
    fn test_expr_helpers() {
        let expr = Expr::col("age").gt(18).and(Expr::col("name").is_not_null());
        match expr {
            Expr::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOperator::And);
                assert!(matches!(*left, Expr::Binary { op: BinaryOperator::Gt, .. }));
            }
            other => panic!("unexpected expression: {:?}", other),
        }
    }

    #[test]
    fn test_string_converts_to_parameter() {
        let expr: Expr = "alice".into();
        assert_eq!(expr, Expr::Value(NativeValue::Varchar("alice".to_string())));
    }

    #[test]
    fn test_operator_sql() {
        assert_eq!(BinaryOperator::NotEq.as_sql(), "<>");
        assert_eq!(BinaryOperator::NotLike.as_sql(), "not like");
        assert!(BinaryOperator::Or.is_logical());
        assert!(!BinaryOperator::Plus.is_logical());
    }
}
