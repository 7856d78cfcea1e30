//! DuckDB logical types and engine-native values.
//!
//! [`LogicalType`] is the type tag DuckDB declares for a column or value.
//! [`NativeValue`] is a value as the engine hands it over: integers keep
//! their width, temporal values are epoch offsets, enums are dictionary
//! indexes. Conversion to host values lives in the client crate's codec.

mod logical;
mod native;

pub use logical::*;
pub use native::*;
