//! Engine-native values.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A value in the representation DuckDB hands over for a column.
///
/// Temporal values are offsets from the Unix epoch: dates in days,
/// timestamps in microseconds (UTC for `TimestampTz`), times in
/// microseconds since midnight. Enums carry their dictionary index; the
/// labels live in the column's [`LogicalType::Enum`](super::LogicalType).
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// NULL of any type.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 8-bit signed integer.
    TinyInt(i8),
    /// 16-bit signed integer.
    SmallInt(i16),
    /// 32-bit signed integer.
    Integer(i32),
    /// 64-bit signed integer.
    BigInt(i64),
    /// 128-bit signed integer.
    HugeInt(i128),
    /// 8-bit unsigned integer.
    UTinyInt(u8),
    /// 16-bit unsigned integer.
    USmallInt(u16),
    /// 32-bit unsigned integer.
    UInteger(u32),
    /// 64-bit unsigned integer.
    UBigInt(u64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// Decimal stored as a scaled integer.
    Decimal {
        /// Unscaled value.
        value: i128,
        /// Total number of digits.
        width: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// String value.
    Varchar(String),
    /// Binary data.
    Blob(Vec<u8>),
    /// Bit string.
    Bit(BitString),
    /// Days since 1970-01-01.
    Date(i32),
    /// Microseconds since midnight.
    Time(i64),
    /// Microseconds since the epoch, no time zone.
    Timestamp(i64),
    /// Microseconds since the epoch, UTC.
    TimestampTz(i64),
    /// Interval components, never normalized against each other.
    Interval {
        /// Months.
        months: i32,
        /// Days.
        days: i32,
        /// Microseconds.
        micros: i64,
    },
    /// UUID as a 128-bit integer.
    Uuid(u128),
    /// Items of a variable-length list.
    List(Vec<NativeValue>),
    /// Items of a fixed-size array.
    Array(Vec<NativeValue>),
    /// Struct fields in declaration order.
    Struct(Vec<(String, NativeValue)>),
    /// Map entries.
    Map(Vec<(NativeValue, NativeValue)>),
    /// Enum dictionary index.
    Enum(u32),
}

impl NativeValue {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Returns the runtime tag of this value, as used in error messages.
    pub fn tag(&self) -> &'static str {
        match self {
            NativeValue::Null => "NULL",
            NativeValue::Boolean(_) => "BOOLEAN",
            NativeValue::TinyInt(_) => "TINYINT",
            NativeValue::SmallInt(_) => "SMALLINT",
            NativeValue::Integer(_) => "INTEGER",
            NativeValue::BigInt(_) => "BIGINT",
            NativeValue::HugeInt(_) => "HUGEINT",
            NativeValue::UTinyInt(_) => "UTINYINT",
            NativeValue::USmallInt(_) => "USMALLINT",
            NativeValue::UInteger(_) => "UINTEGER",
            NativeValue::UBigInt(_) => "UBIGINT",
            NativeValue::Float(_) => "FLOAT",
            NativeValue::Double(_) => "DOUBLE",
            NativeValue::Decimal { .. } => "DECIMAL",
            NativeValue::Varchar(_) => "VARCHAR",
            NativeValue::Blob(_) => "BLOB",
            NativeValue::Bit(_) => "BIT",
            NativeValue::Date(_) => "DATE",
            NativeValue::Time(_) => "TIME",
            NativeValue::Timestamp(_) => "TIMESTAMP",
            NativeValue::TimestampTz(_) => "TIMESTAMP WITH TIME ZONE",
            NativeValue::Interval { .. } => "INTERVAL",
            NativeValue::Uuid(_) => "UUID",
            NativeValue::List(_) => "LIST",
            NativeValue::Array(_) => "ARRAY",
            NativeValue::Struct(_) => "STRUCT",
            NativeValue::Map(_) => "MAP",
            NativeValue::Enum(_) => "ENUM",
        }
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::Boolean(v)
    }
}

impl From<i32> for NativeValue {
    fn from(v: i32) -> Self {
        NativeValue::Integer(v)
    }
}

impl From<i64> for NativeValue {
    fn from(v: i64) -> Self {
        NativeValue::BigInt(v)
    }
}

impl From<u64> for NativeValue {
    fn from(v: u64) -> Self {
        NativeValue::UBigInt(v)
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        NativeValue::Double(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        NativeValue::Varchar(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        NativeValue::Varchar(v)
    }
}

impl From<Vec<u8>> for NativeValue {
    fn from(v: Vec<u8>) -> Self {
        NativeValue::Blob(v)
    }
}

impl From<BitString> for NativeValue {
    fn from(v: BitString) -> Self {
        NativeValue::Bit(v)
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => NativeValue::Null,
        }
    }
}

/// Error returned when parsing a bit string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bit {character:?} at position {position}")]
pub struct ParseBitStringError {
    /// Zero-based character position.
    pub position: usize,
    /// The offending character.
    pub character: char,
}

/// A packed bit string, most significant bit first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitString {
    /// Number of bits.
    len: usize,
    /// Packed bits; trailing padding bits are zero.
    bytes: Vec<u8>,
}

impl BitString {
    /// Creates a bit string from individual bits.
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let mut out = BitString::default();
        for bit in bits {
            out.push(bit);
        }
        out
    }

    /// Appends a bit.
    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there are no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bit at `index`.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        Some(self.bytes[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    /// Iterates over the bits.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.bytes[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    /// Returns the packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl FromStr for BitString {
    type Err = ParseBitStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = BitString::default();
        for (position, character) in s.chars().enumerate() {
            match character {
                '0' => out.push(false),
                '1' => out.push(true),
                _ => {
                    return Err(ParseBitStringError {
                        position,
                        character,
                    })
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}
