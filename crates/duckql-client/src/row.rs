//! Decoded result rows.

use std::fmt;
use std::sync::Arc;

use duckql_sql::NativeValue;

use crate::connection::ColumnInfo;
use crate::error::{ClientError, ClientResult};
use crate::value::codec::decode;
use crate::value::{FromValue, Value};

/// A decoded row: column names paired with owned values.
///
/// Column names are shared between all rows of one result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column names, shared across the result.
    columns: Arc<[String]>,
    /// Values, in column order.
    values: Vec<Value>,
}

impl Row {
    /// Creates a row. `values` must be in `columns` order.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Decodes a row of native values against the column descriptors.
    ///
    /// A field that fails to decode is reported with its column name.
    pub fn decode(
        columns: &[ColumnInfo],
        names: &Arc<[String]>,
        natives: Vec<NativeValue>,
    ) -> ClientResult<Self> {
        if natives.len() != columns.len() {
            return Err(ClientError::Internal(format!(
                "row has {} values for {} columns",
                natives.len(),
                columns.len()
            )));
        }

        let values = columns
            .iter()
            .zip(&natives)
            .map(|(column, native)| {
                decode(native, &column.logical_type)
                    .map_err(|e| ClientError::decode(column.name.clone(), e))
            })
            .collect::<ClientResult<Vec<_>>>()?;

        Ok(Self {
            columns: Arc::clone(names),
            values,
        })
    }

    /// Returns the number of columns in this row.
    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the value at the given index.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value of the first column named `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    /// Returns the value of column `name` converted to `T`.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(T::from_value)
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Returns the values as a slice.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row and returns the values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use duckql_sql::LogicalType;

    fn columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo::new("id", LogicalType::Integer),
            ColumnInfo::new("tags", LogicalType::list(LogicalType::Varchar)),
        ]
    }

    #[test]
    fn test_decode_row() {
        let columns = columns();
        let names = ColumnInfo::names(&columns);
        let row = Row::decode(
            &columns,
            &names,
            vec![
                NativeValue::Integer(1),
                NativeValue::List(vec![NativeValue::Varchar("a".to_string())]),
            ],
        )
        .unwrap();

        assert_eq!(row.get_as::<i64>("id"), Some(1));
        assert_eq!(row.get("tags"), Some(&Value::List(vec![Value::from("a")])));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.to_string(), "(id: 1, tags: [a])");
    }

    #[test]
    fn test_decode_error_carries_column() {
        let columns = columns();
        let names = ColumnInfo::names(&columns);
        let err = Row::decode(
            &columns,
            &names,
            vec![NativeValue::Integer(1), NativeValue::Varchar("a".to_string())],
        )
        .unwrap_err();

        match err {
            ClientError::Decode { column, source } => {
                assert_eq!(column, "tags");
                assert!(matches!(source, CodecError::TypeMismatch { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_row_arity_checked() {
        let columns = columns();
        let names = ColumnInfo::names(&columns);
        assert!(Row::decode(&columns, &names, vec![NativeValue::Null]).is_err());
    }
}
