//! Conversion between engine-native values and host values.
//!
//! [`decode`] is strict: the native value's tag must agree with the
//! declared [`LogicalType`], otherwise it fails with
//! [`CodecError::TypeMismatch`]. NULL decodes to [`Value::Null`] for any
//! type. [`encode`] is its left inverse.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use duckql_sql::{LogicalType, NativeValue};

use super::construct::{
    bit_value, date_value, enum_value, time_value, timestamp_tz_value, timestamp_value, uuid_value,
    MICROS_PER_DAY, MICROS_PER_SEC, UNIX_EPOCH_DAYS_FROM_CE,
};
use super::{Interval, Value};
use crate::error::{CodecError, CodecResult};

/// Decodes a native value declared as `ty`.
pub fn decode(native: &NativeValue, ty: &LogicalType) -> CodecResult<Value> {
    if native.is_null() {
        return Ok(Value::Null);
    }

    let value = match (ty, native) {
        (LogicalType::Boolean, NativeValue::Boolean(b)) => Value::Boolean(*b),
        (LogicalType::TinyInt, NativeValue::TinyInt(v)) => Value::Integer(i64::from(*v)),
        (LogicalType::SmallInt, NativeValue::SmallInt(v)) => Value::Integer(i64::from(*v)),
        (LogicalType::Integer, NativeValue::Integer(v)) => Value::Integer(i64::from(*v)),
        (LogicalType::BigInt, NativeValue::BigInt(v)) => Value::Integer(*v),
        (LogicalType::HugeInt, NativeValue::HugeInt(v)) => Value::HugeInt(*v),
        (LogicalType::UTinyInt, NativeValue::UTinyInt(v)) => Value::Integer(i64::from(*v)),
        (LogicalType::USmallInt, NativeValue::USmallInt(v)) => Value::Integer(i64::from(*v)),
        (LogicalType::UInteger, NativeValue::UInteger(v)) => Value::Integer(i64::from(*v)),
        (LogicalType::UBigInt, NativeValue::UBigInt(v)) => Value::HugeInt(i128::from(*v)),
        (LogicalType::Float, NativeValue::Float(v)) => Value::Float(f64::from(*v)),
        (LogicalType::Double, NativeValue::Double(v)) => Value::Float(*v),
        (
            LogicalType::Decimal { scale, .. },
            NativeValue::Decimal {
                value,
                scale: native_scale,
                ..
            },
        ) if scale == native_scale => Value::Decimal {
            value: *value,
            scale: *scale,
        },
        (LogicalType::Varchar, NativeValue::Varchar(s)) => Value::String(s.clone()),
        (LogicalType::Blob, NativeValue::Blob(b)) => Value::Bytes(b.clone()),
        (LogicalType::Bit, NativeValue::Bit(bits)) => Value::String(bits.to_string()),
        (LogicalType::Date, NativeValue::Date(days)) => Value::Date(decode_date(*days)?),
        (LogicalType::Time, NativeValue::Time(micros)) => Value::Time(decode_time(*micros)?),
        (LogicalType::Timestamp, NativeValue::Timestamp(micros)) => {
            Value::Timestamp(decode_instant(*micros, "TIMESTAMP")?.naive_utc())
        }
        (LogicalType::TimestampTz, NativeValue::TimestampTz(micros)) => {
            Value::TimestampTz(decode_instant(*micros, "TIMESTAMP WITH TIME ZONE")?)
        }
        (
            LogicalType::Interval,
            NativeValue::Interval {
                months,
                days,
                micros,
            },
        ) => Value::Interval(Interval::new(*months, *days, *micros)),
        (LogicalType::Uuid, NativeValue::Uuid(uuid)) => Value::String(format_uuid(*uuid)),
        (LogicalType::List(element), NativeValue::List(items)) => Value::List(
            items
                .iter()
                .map(|item| decode(item, element))
                .collect::<CodecResult<_>>()?,
        ),
        (LogicalType::Array(element, size), NativeValue::Array(items)) => {
            check_arity(*size, items.len())?;
            Value::List(
                items
                    .iter()
                    .map(|item| decode(item, element))
                    .collect::<CodecResult<_>>()?,
            )
        }
        (LogicalType::Struct(fields), NativeValue::Struct(items)) => {
            check_arity(fields.len(), items.len())?;
            let mut decoded = Vec::with_capacity(fields.len());
            for ((name, field_ty), (native_name, item)) in fields.iter().zip(items) {
                check_field(name, native_name)?;
                decoded.push((name.clone(), decode(item, field_ty)?));
            }
            Value::Struct(decoded)
        }
        (LogicalType::Map(key_ty, value_ty), NativeValue::Map(entries)) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((decode(k, key_ty)?, decode(v, value_ty)?)))
                .collect::<CodecResult<_>>()?,
        ),
        (LogicalType::Enum(labels), NativeValue::Enum(index)) => {
            let label = usize::try_from(*index)
                .ok()
                .and_then(|i| labels.get(i))
                .ok_or(CodecError::EnumIndexOutOfRange {
                    index: *index,
                    size: labels.len(),
                })?;
            Value::String(label.clone())
        }
        _ => {
            return Err(CodecError::TypeMismatch {
                expected: ty.id().to_string(),
                found: native.tag().to_string(),
            })
        }
    };
    Ok(value)
}

/// Encodes a host value as a native value of type `ty`.
pub fn encode(value: &Value, ty: &LogicalType) -> CodecResult<NativeValue> {
    if value.is_null() {
        return Ok(NativeValue::Null);
    }

    let native = match (ty, value) {
        (LogicalType::Boolean, Value::Boolean(b)) => NativeValue::Boolean(*b),
        (LogicalType::TinyInt, Value::Integer(_) | Value::HugeInt(_)) => {
            NativeValue::TinyInt(narrow(value, ty)?)
        }
        (LogicalType::SmallInt, Value::Integer(_) | Value::HugeInt(_)) => {
            NativeValue::SmallInt(narrow(value, ty)?)
        }
        (LogicalType::Integer, Value::Integer(_) | Value::HugeInt(_)) => {
            NativeValue::Integer(narrow(value, ty)?)
        }
        (LogicalType::BigInt, Value::Integer(_) | Value::HugeInt(_)) => {
            NativeValue::BigInt(narrow(value, ty)?)
        }
        (LogicalType::HugeInt, Value::Integer(_) | Value::HugeInt(_)) => {
            NativeValue::HugeInt(narrow(value, ty)?)
        }
        (LogicalType::UTinyInt, Value::Integer(_) | Value::HugeInt(_)) => {
            NativeValue::UTinyInt(narrow(value, ty)?)
        }
        (LogicalType::USmallInt, Value::Integer(_) | Value::HugeInt(_)) => {
            NativeValue::USmallInt(narrow(value, ty)?)
        }
        (LogicalType::UInteger, Value::Integer(_) | Value::HugeInt(_)) => {
            NativeValue::UInteger(narrow(value, ty)?)
        }
        (LogicalType::UBigInt, Value::Integer(_) | Value::HugeInt(_)) => {
            NativeValue::UBigInt(narrow(value, ty)?)
        }
        (LogicalType::Float, Value::Float(v)) if v.is_finite() && v.abs() > f64::from(f32::MAX) => {
            return Err(out_of_range("FLOAT", v));
        }
        (LogicalType::Float, Value::Float(v)) => NativeValue::Float(*v as f32),
        (LogicalType::Double, Value::Float(v)) => NativeValue::Double(*v),
        (LogicalType::Decimal { width, scale }, Value::Decimal { value: v, scale: s }) => {
            NativeValue::Decimal {
                value: rescale(*v, *s, *scale, ty)?,
                width: *width,
                scale: *scale,
            }
        }
        (LogicalType::Varchar, Value::String(s)) => NativeValue::Varchar(s.clone()),
        (LogicalType::Blob, Value::Bytes(b)) => NativeValue::Blob(b.clone()),
        (LogicalType::Bit, Value::String(s)) => bit_value(s)?,
        (LogicalType::Date, Value::Date(d)) => date_value(*d),
        (LogicalType::Time, Value::Time(t)) => time_value(*t),
        (LogicalType::Timestamp, Value::Timestamp(ts)) => timestamp_value(*ts),
        (LogicalType::TimestampTz, Value::TimestampTz(ts)) => timestamp_tz_value(ts),
        (LogicalType::Interval, Value::Interval(i)) => NativeValue::Interval {
            months: i.months,
            days: i.days,
            micros: i.micros,
        },
        (LogicalType::Uuid, Value::String(s)) => uuid_value(s)?,
        (LogicalType::List(element), Value::List(items)) => NativeValue::List(
            items
                .iter()
                .map(|item| encode(item, element))
                .collect::<CodecResult<_>>()?,
        ),
        (LogicalType::Array(element, size), Value::List(items)) => {
            check_arity(*size, items.len())?;
            NativeValue::Array(
                items
                    .iter()
                    .map(|item| encode(item, element))
                    .collect::<CodecResult<_>>()?,
            )
        }
        (LogicalType::Struct(fields), Value::Struct(items)) => {
            check_arity(fields.len(), items.len())?;
            let mut encoded = Vec::with_capacity(fields.len());
            for ((name, field_ty), (item_name, item)) in fields.iter().zip(items) {
                check_field(name, item_name)?;
                encoded.push((name.clone(), encode(item, field_ty)?));
            }
            NativeValue::Struct(encoded)
        }
        (LogicalType::Map(key_ty, value_ty), Value::Map(entries)) => NativeValue::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((encode(k, key_ty)?, encode(v, value_ty)?)))
                .collect::<CodecResult<_>>()?,
        ),
        (LogicalType::Enum(labels), Value::String(label)) => enum_value(labels.as_slice(), label)?,
        _ => {
            return Err(CodecError::TypeMismatch {
                expected: ty.id().to_string(),
                found: value.type_name().to_string(),
            })
        }
    };
    Ok(native)
}

fn decode_date(days: i32) -> CodecResult<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| out_of_range("DATE", days))
}

fn decode_time(micros: i64) -> CodecResult<NaiveTime> {
    // 24:00:00 has no chrono form; it decodes as the leap second ending the day.
    if micros == MICROS_PER_DAY {
        return NaiveTime::from_hms_micro_opt(23, 59, 59, 1_999_999)
            .ok_or_else(|| out_of_range("TIME", micros));
    }
    let secs = u32::try_from(micros.div_euclid(MICROS_PER_SEC)).ok();
    let nanos = (micros.rem_euclid(MICROS_PER_SEC) * 1_000) as u32;
    secs.filter(|_| micros >= 0)
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos))
        .ok_or_else(|| out_of_range("TIME", micros))
}

fn decode_instant(micros: i64, target: &str) -> CodecResult<DateTime<Utc>> {
    let secs = micros.div_euclid(MICROS_PER_SEC);
    let nanos = (micros.rem_euclid(MICROS_PER_SEC) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| out_of_range(target, micros))
}

fn format_uuid(uuid: u128) -> String {
    let hex = hex::encode(uuid.to_be_bytes());
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

fn narrow<T: TryFrom<i128>>(value: &Value, ty: &LogicalType) -> CodecResult<T> {
    let wide = value.as_i128().ok_or_else(|| CodecError::TypeMismatch {
        expected: ty.id().to_string(),
        found: value.type_name().to_string(),
    })?;
    T::try_from(wide).map_err(|_| out_of_range(ty.id(), wide))
}

fn rescale(value: i128, from: u8, to: u8, ty: &LogicalType) -> CodecResult<i128> {
    if from > to {
        return Err(CodecError::OutOfRange {
            target: ty.to_string(),
            value: Value::Decimal { value, scale: from }.to_string(),
        });
    }
    10i128
        .checked_pow(u32::from(to - from))
        .and_then(|factor| value.checked_mul(factor))
        .ok_or_else(|| out_of_range(&ty.to_string(), value))
}

fn check_arity(expected: usize, found: usize) -> CodecResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(CodecError::Arity { expected, found })
    }
}

fn check_field(expected: &str, found: &str) -> CodecResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(CodecError::StructShape {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

fn out_of_range(target: &str, value: impl ToString) -> CodecError {
    CodecError::OutOfRange {
        target: target.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Timelike};
    use duckql_sql::BitString;

    fn round_trip(value: Value, ty: &LogicalType) {
        let native = encode(&value, ty).unwrap();
        assert_eq!(decode(&native, ty).unwrap(), value, "type {}", ty);
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(
            decode(&NativeValue::TinyInt(-3), &LogicalType::TinyInt).unwrap(),
            Value::Integer(-3)
        );
        assert_eq!(
            decode(&NativeValue::UBigInt(u64::MAX), &LogicalType::UBigInt).unwrap(),
            Value::HugeInt(i128::from(u64::MAX))
        );
        assert_eq!(
            decode(&NativeValue::Float(1.5), &LogicalType::Float).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            decode(&NativeValue::Blob(vec![0, 255]), &LogicalType::Blob).unwrap(),
            Value::Bytes(vec![0, 255])
        );
    }

    #[test]
    fn test_null_decodes_for_any_type() {
        for ty in [
            LogicalType::Integer,
            LogicalType::list(LogicalType::Varchar),
            LogicalType::struct_of([("a", LogicalType::Bit)]),
        ] {
            assert_eq!(decode(&NativeValue::Null, &ty).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_decode_is_strict() {
        let err = decode(&NativeValue::Varchar("1".to_string()), &LogicalType::Integer).unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                expected: "INTEGER".to_string(),
                found: "VARCHAR".to_string(),
            }
        );
        // Same width, different signedness.
        assert!(decode(&NativeValue::UInteger(1), &LogicalType::Integer).is_err());
    }

    #[test]
    fn test_decode_bit_to_text() {
        let bits: BitString = "010101".parse().unwrap();
        assert_eq!(
            decode(&NativeValue::Bit(bits), &LogicalType::Bit).unwrap(),
            Value::String("010101".to_string())
        );
    }

    #[test]
    fn test_decode_temporal() {
        assert_eq!(
            decode(&NativeValue::Date(19_723), &LogicalType::Date).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(
            decode(&NativeValue::Time(3_723_000_004), &LogicalType::Time).unwrap(),
            Value::Time(NaiveTime::from_hms_micro_opt(1, 2, 3, 4).unwrap())
        );
        assert_eq!(
            decode(&NativeValue::Timestamp(-1), &LogicalType::Timestamp).unwrap(),
            Value::Timestamp(
                NaiveDate::from_ymd_opt(1969, 12, 31)
                    .unwrap()
                    .and_hms_micro_opt(23, 59, 59, 999_999)
                    .unwrap()
            )
        );
        assert!(decode(&NativeValue::Time(-1), &LogicalType::Time).is_err());
    }

    #[test]
    fn test_time_end_of_day() {
        let decoded = decode(&NativeValue::Time(MICROS_PER_DAY), &LogicalType::Time).unwrap();
        let Value::Time(time) = decoded else {
            panic!("expected a TIME, got {:?}", decoded);
        };
        assert_eq!(time.num_seconds_from_midnight(), 86_399);
        assert!(time.nanosecond() >= 1_000_000_000);
        assert_eq!(
            encode(&Value::Time(time), &LogicalType::Time).unwrap(),
            NativeValue::Time(MICROS_PER_DAY)
        );
        assert!(decode(&NativeValue::Time(MICROS_PER_DAY + 1), &LogicalType::Time).is_err());
    }

    #[test]
    fn test_decode_enum() {
        let ty = LogicalType::enumeration(["sad", "ok", "happy"]);
        assert_eq!(
            decode(&NativeValue::Enum(1), &ty).unwrap(),
            Value::String("ok".to_string())
        );
        assert_eq!(
            decode(&NativeValue::Enum(3), &ty).unwrap_err(),
            CodecError::EnumIndexOutOfRange { index: 3, size: 3 }
        );
    }

    #[test]
    fn test_decode_uuid_hyphenated() {
        let uuid = 0x0123_4567_89ab_cdef_0123_4567_89ab_cdefu128;
        assert_eq!(
            decode(&NativeValue::Uuid(uuid), &LogicalType::Uuid).unwrap(),
            Value::String("01234567-89ab-cdef-0123-456789abcdef".to_string())
        );
    }

    #[test]
    fn test_decode_struct_checks_shape() {
        let ty = LogicalType::struct_of([("id", LogicalType::Integer), ("name", LogicalType::Varchar)]);
        let native = NativeValue::Struct(vec![
            ("id".to_string(), NativeValue::Integer(1)),
            ("label".to_string(), NativeValue::Varchar("x".to_string())),
        ]);
        assert_eq!(
            decode(&native, &ty).unwrap_err(),
            CodecError::StructShape {
                expected: "name".to_string(),
                found: "label".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_nested_list_of_structs() {
        let ty = LogicalType::list(LogicalType::struct_of([
            ("k", LogicalType::Varchar),
            ("v", LogicalType::list(LogicalType::Integer)),
        ]));
        let native = NativeValue::List(vec![NativeValue::Struct(vec![
            ("k".to_string(), NativeValue::Varchar("a".to_string())),
            (
                "v".to_string(),
                NativeValue::List(vec![NativeValue::Integer(1), NativeValue::Null]),
            ),
        ])]);
        assert_eq!(
            decode(&native, &ty).unwrap(),
            Value::List(vec![Value::Struct(vec![
                ("k".to_string(), Value::from("a")),
                (
                    "v".to_string(),
                    Value::List(vec![Value::Integer(1), Value::Null])
                ),
            ])])
        );
    }

    #[test]
    fn test_array_arity() {
        let ty = LogicalType::array(LogicalType::Double, 3);
        let native = NativeValue::Array(vec![NativeValue::Double(1.0)]);
        assert_eq!(
            decode(&native, &ty).unwrap_err(),
            CodecError::Arity {
                expected: 3,
                found: 1
            }
        );
    }

    #[test]
    fn test_round_trip_composites() {
        round_trip(
            Value::List(vec![Value::from("a"), Value::Null, Value::from("c")]),
            &LogicalType::list(LogicalType::Varchar),
        );
        round_trip(
            Value::Struct(vec![
                ("id".to_string(), Value::Integer(7)),
                (
                    "tags".to_string(),
                    Value::List(vec![Value::from("x"), Value::from("y")]),
                ),
            ]),
            &LogicalType::struct_of([
                ("id", LogicalType::Integer),
                ("tags", LogicalType::list(LogicalType::Varchar)),
            ]),
        );
        round_trip(Value::from("1100101"), &LogicalType::Bit);
        round_trip(Value::from(""), &LogicalType::Bit);
        round_trip(
            Value::Interval(Interval::new(14, -3, 86_400_000_001)),
            &LogicalType::Interval,
        );
        round_trip(
            Value::Map(vec![(Value::from("a"), Value::Integer(1))]),
            &LogicalType::map(LogicalType::Varchar, LogicalType::BigInt),
        );
        round_trip(
            Value::from("happy"),
            &LogicalType::enumeration(["sad", "happy"]),
        );
        round_trip(
            Value::from("01234567-89ab-cdef-0123-456789abcdef"),
            &LogicalType::Uuid,
        );
    }

    #[test]
    fn test_timestamp_with_offset_is_instant_equal() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let local = offset
            .with_ymd_and_hms(2024, 3, 10, 8, 30, 15)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(123))
            .unwrap();
        let native = timestamp_tz_value(&local);
        let decoded = decode(&native, &LogicalType::TimestampTz).unwrap();
        assert_eq!(decoded, Value::TimestampTz(local.with_timezone(&Utc)));
        // Instant-equal, not string-equal.
        assert_ne!(decoded.to_string(), local.to_string());
    }

    #[test]
    fn test_encode_narrowing() {
        assert_eq!(
            encode(&Value::Integer(127), &LogicalType::TinyInt).unwrap(),
            NativeValue::TinyInt(127)
        );
        assert!(matches!(
            encode(&Value::Integer(128), &LogicalType::TinyInt),
            Err(CodecError::OutOfRange { .. })
        ));
        assert!(matches!(
            encode(&Value::Integer(-1), &LogicalType::UBigInt),
            Err(CodecError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_encode_float_overflow() {
        assert!(matches!(
            encode(&Value::Float(1e300), &LogicalType::Float),
            Err(CodecError::OutOfRange { .. })
        ));
        assert!(matches!(
            encode(&Value::Float(-1e39), &LogicalType::Float),
            Err(CodecError::OutOfRange { .. })
        ));
        assert_eq!(
            encode(&Value::Float(1.5), &LogicalType::Float).unwrap(),
            NativeValue::Float(1.5)
        );
        assert_eq!(
            encode(&Value::Float(f64::INFINITY), &LogicalType::Float).unwrap(),
            NativeValue::Float(f32::INFINITY)
        );
        assert_eq!(
            encode(&Value::Float(1e300), &LogicalType::Double).unwrap(),
            NativeValue::Double(1e300)
        );
    }

    #[test]
    fn test_encode_decimal_rescales_up() {
        let ty = LogicalType::Decimal { width: 18, scale: 3 };
        assert_eq!(
            encode(&Value::Decimal { value: 15, scale: 1 }, &ty).unwrap(),
            NativeValue::Decimal {
                value: 1_500,
                width: 18,
                scale: 3
            }
        );
        assert!(encode(&Value::Decimal { value: 15, scale: 4 }, &ty).is_err());
    }

    #[test]
    fn test_encode_mismatch() {
        assert_eq!(
            encode(&Value::Boolean(true), &LogicalType::Varchar).unwrap_err(),
            CodecError::TypeMismatch {
                expected: "VARCHAR".to_string(),
                found: "BOOLEAN".to_string(),
            }
        );
    }
}
