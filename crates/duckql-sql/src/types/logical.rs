//! DuckDB logical types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compiler::quote_identifier;

/// Logical types understood by duckql.
///
/// `Display` renders the type the way it is written in DDL and casts
/// (`integer`, `varchar[]`, `struct("a" integer)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// Boolean type.
    Boolean,
    /// 8-bit signed integer.
    TinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    BigInt,
    /// 128-bit signed integer.
    HugeInt,
    /// 8-bit unsigned integer.
    UTinyInt,
    /// 16-bit unsigned integer.
    USmallInt,
    /// 32-bit unsigned integer.
    UInteger,
    /// 64-bit unsigned integer.
    UBigInt,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Fixed-point decimal.
    Decimal {
        /// Total number of digits.
        width: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Variable-length string.
    Varchar,
    /// Binary data.
    Blob,
    /// Bit string.
    Bit,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp without time zone.
    Timestamp,
    /// Timestamp with time zone (an absolute instant).
    TimestampTz,
    /// Interval of months, days and microseconds.
    Interval,
    /// UUID.
    Uuid,
    /// Variable-length list.
    List(Box<LogicalType>),
    /// Fixed-length array.
    Array(Box<LogicalType>, usize),
    /// Struct with ordered named fields.
    Struct(Vec<(String, LogicalType)>),
    /// Map from keys to values.
    Map(Box<LogicalType>, Box<LogicalType>),
    /// Enumeration over a fixed dictionary of labels.
    Enum(Vec<String>),
}

impl LogicalType {
    /// Creates a list type.
    pub fn list(element: LogicalType) -> Self {
        LogicalType::List(Box::new(element))
    }

    /// Creates a fixed-size array type.
    pub fn array(element: LogicalType, size: usize) -> Self {
        LogicalType::Array(Box::new(element), size)
    }

    /// Creates a struct type from `(name, type)` pairs.
    pub fn struct_of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, LogicalType)>,
        S: Into<String>,
    {
        LogicalType::Struct(fields.into_iter().map(|(n, t)| (n.into(), t)).collect())
    }

    /// Creates a map type.
    pub fn map(key: LogicalType, value: LogicalType) -> Self {
        LogicalType::Map(Box::new(key), Box::new(value))
    }

    /// Creates an enum type from its labels.
    pub fn enumeration<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LogicalType::Enum(labels.into_iter().map(Into::into).collect())
    }

    /// Returns the DuckDB type id, as used in error messages.
    pub fn id(&self) -> &'static str {
        match self {
            LogicalType::Boolean => "BOOLEAN",
            LogicalType::TinyInt => "TINYINT",
            LogicalType::SmallInt => "SMALLINT",
            LogicalType::Integer => "INTEGER",
            LogicalType::BigInt => "BIGINT",
            LogicalType::HugeInt => "HUGEINT",
            LogicalType::UTinyInt => "UTINYINT",
            LogicalType::USmallInt => "USMALLINT",
            LogicalType::UInteger => "UINTEGER",
            LogicalType::UBigInt => "UBIGINT",
            LogicalType::Float => "FLOAT",
            LogicalType::Double => "DOUBLE",
            LogicalType::Decimal { .. } => "DECIMAL",
            LogicalType::Varchar => "VARCHAR",
            LogicalType::Blob => "BLOB",
            LogicalType::Bit => "BIT",
            LogicalType::Date => "DATE",
            LogicalType::Time => "TIME",
            LogicalType::Timestamp => "TIMESTAMP",
            LogicalType::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            LogicalType::Interval => "INTERVAL",
            LogicalType::Uuid => "UUID",
            LogicalType::List(_) => "LIST",
            LogicalType::Array(_, _) => "ARRAY",
            LogicalType::Struct(_) => "STRUCT",
            LogicalType::Map(_, _) => "MAP",
            LogicalType::Enum(_) => "ENUM",
        }
    }

    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LogicalType::TinyInt
                | LogicalType::SmallInt
                | LogicalType::Integer
                | LogicalType::BigInt
                | LogicalType::HugeInt
                | LogicalType::UTinyInt
                | LogicalType::USmallInt
                | LogicalType::UInteger
                | LogicalType::UBigInt
                | LogicalType::Float
                | LogicalType::Double
                | LogicalType::Decimal { .. }
        )
    }

    /// Returns true if this type is a temporal type.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            LogicalType::Date
                | LogicalType::Time
                | LogicalType::Timestamp
                | LogicalType::TimestampTz
                | LogicalType::Interval
        )
    }

    /// Returns true if this type nests other types.
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            LogicalType::List(_)
                | LogicalType::Array(_, _)
                | LogicalType::Struct(_)
                | LogicalType::Map(_, _)
        )
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Decimal { width, scale } => write!(f, "decimal({}, {})", width, scale),
            LogicalType::TimestampTz => write!(f, "timestamptz"),
            LogicalType::List(element) => write!(f, "{}[]", element),
            LogicalType::Array(element, size) => write!(f, "{}[{}]", element, size),
            LogicalType::Struct(fields) => {
                write!(f, "struct(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", quote_identifier(name), ty)?;
                }
                write!(f, ")")
            }
            LogicalType::Map(key, value) => write!(f, "map({}, {})", key, value),
            LogicalType::Enum(labels) => {
                write!(f, "enum(")?;
                for (i, label) in labels.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}'", label.replace('\'', "''"))?;
                }
                write!(f, ")")
            }
            other => write!(f, "{}", other.id().to_lowercase()),
        }
    }
}
