//! Construction helpers for DuckDB-native parameter values.
//!
//! These build [`NativeValue`]s for composite and temporal types that have
//! no unambiguous host form, so they can be bound as query parameters.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use duckql_sql::{BitString, NativeValue};

use crate::error::{CodecError, CodecResult};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
pub(crate) const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Microseconds per second.
pub(crate) const MICROS_PER_SEC: i64 = 1_000_000;

/// Microseconds per day; as a TIME this is `24:00:00`.
pub(crate) const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SEC;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Builds a LIST value.
pub fn list_value<I, V>(items: I) -> NativeValue
where
    I: IntoIterator<Item = V>,
    V: Into<NativeValue>,
{
    NativeValue::List(items.into_iter().map(Into::into).collect())
}

/// Builds a fixed-size ARRAY value.
pub fn array_value<I, V>(items: I) -> NativeValue
where
    I: IntoIterator<Item = V>,
    V: Into<NativeValue>,
{
    NativeValue::Array(items.into_iter().map(Into::into).collect())
}

/// Builds a STRUCT value; field order is kept.
pub fn struct_value<I, K, V>(fields: I) -> NativeValue
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<NativeValue>,
{
    NativeValue::Struct(
        fields
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect(),
    )
}

/// Builds a MAP value.
pub fn map_value<I, K, V>(entries: I) -> NativeValue
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<NativeValue>,
    V: Into<NativeValue>,
{
    NativeValue::Map(
        entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect(),
    )
}

/// Builds a BIT value from text such as `"010110"`.
pub fn bit_value(bits: &str) -> CodecResult<NativeValue> {
    bits.parse::<BitString>()
        .map(NativeValue::Bit)
        .map_err(|e| CodecError::InvalidBitString(e.to_string()))
}

/// Builds a BLOB value.
pub fn blob_value(bytes: impl Into<Vec<u8>>) -> NativeValue {
    NativeValue::Blob(bytes.into())
}

/// Builds a DATE value.
pub fn date_value(date: NaiveDate) -> NativeValue {
    NativeValue::Date(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

/// Builds a TIME value with microsecond precision.
///
/// A leap second in the last second of the day stands for `24:00:00`.
/// Any other leap second is held at the end of its second.
pub fn time_value(time: NaiveTime) -> NativeValue {
    let secs = i64::from(time.num_seconds_from_midnight());
    let nanos = time.nanosecond();
    if nanos < NANOS_PER_SEC {
        return NativeValue::Time(secs * MICROS_PER_SEC + i64::from(nanos / 1_000));
    }
    if secs == 86_399 {
        NativeValue::Time(MICROS_PER_DAY)
    } else {
        NativeValue::Time(secs * MICROS_PER_SEC + MICROS_PER_SEC - 1)
    }
}

/// Builds a TIMESTAMP value with microsecond precision.
pub fn timestamp_value(timestamp: NaiveDateTime) -> NativeValue {
    NativeValue::Timestamp(timestamp.and_utc().timestamp_micros())
}

/// Builds a TIMESTAMP WITH TIME ZONE value.
///
/// Any offset is accepted; the stored value is the UTC instant.
pub fn timestamp_tz_value<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> NativeValue {
    NativeValue::TimestampTz(timestamp.timestamp_micros())
}

/// Builds an INTERVAL value.
pub fn interval_value(months: i32, days: i32, micros: i64) -> NativeValue {
    NativeValue::Interval {
        months,
        days,
        micros,
    }
}

/// Builds an ENUM value by looking `label` up in `labels`.
pub fn enum_value<S: AsRef<str>>(labels: &[S], label: &str) -> CodecResult<NativeValue> {
    labels
        .iter()
        .position(|l| l.as_ref() == label)
        .and_then(|index| u32::try_from(index).ok())
        .map(NativeValue::Enum)
        .ok_or_else(|| CodecError::UnknownEnumLabel(label.to_string()))
}

/// Builds a UUID value from its hyphenated or plain hex form.
pub fn uuid_value(uuid: &str) -> CodecResult<NativeValue> {
    let digits: String = uuid.chars().filter(|c| *c != '-').collect();
    if digits.len() != 32 {
        return Err(CodecError::InvalidUuid(uuid.to_string()));
    }
    let mut bytes = [0u8; 16];
    hex::decode_to_slice(&digits, &mut bytes)
        .map_err(|_| CodecError::InvalidUuid(uuid.to_string()))?;
    Ok(NativeValue::Uuid(u128::from_be_bytes(bytes)))
}
