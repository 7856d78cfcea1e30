//! Error types for the client library.

use duckql_sql::CompileError;
use thiserror::Error;

/// Value codec error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A value's tag disagrees with the declared logical type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared logical type.
        expected: String,
        /// Tag of the value actually present.
        found: String,
    },

    /// An enum index outside the type's dictionary.
    #[error("enum index {index} out of range for {size} labels")]
    EnumIndexOutOfRange {
        /// Native index.
        index: u32,
        /// Dictionary size.
        size: usize,
    },

    /// A label not present in the enum's dictionary.
    #[error("unknown enum label '{0}'")]
    UnknownEnumLabel(String),

    /// A value outside the representable range of the target type.
    #[error("value out of range for {target}: {value}")]
    OutOfRange {
        /// Target type.
        target: String,
        /// Rendered value.
        value: String,
    },

    /// A string that is not a bit string.
    #[error("invalid bit string: {0}")]
    InvalidBitString(String),

    /// A string that is not a UUID.
    #[error("invalid uuid: {0}")]
    InvalidUuid(String),

    /// A struct whose fields disagree with the declared shape.
    #[error("struct shape mismatch: expected field '{expected}', found '{found}'")]
    StructShape {
        /// Declared field name.
        expected: String,
        /// Field name actually present.
        found: String,
    },

    /// A struct or array with the wrong number of elements.
    #[error("expected {expected} elements, found {found}")]
    Arity {
        /// Declared element count.
        expected: usize,
        /// Element count actually present.
        found: usize,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Query compilation failed.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// A field could not be decoded.
    #[error("cannot decode column '{column}': {source}")]
    Decode {
        /// Offending column.
        column: String,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// A value could not be encoded.
    #[error("cannot encode value: {0}")]
    Encode(#[source] CodecError),

    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A stream was pulled after it failed.
    #[error("stream failed: {0}")]
    StreamFailed(String),

    /// Result handles are still open.
    #[error("{0} result handle(s) still open")]
    HandlesOutstanding(usize),

    /// Transaction error.
    #[error("transaction error: {0}")]
    TransactionError(String),

    /// Transaction already active.
    #[error("transaction already active")]
    TransactionActive,

    /// No transaction active.
    #[error("no transaction active")]
    NoTransaction,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Wraps a codec error with the column it came from.
    pub fn decode(column: impl Into<String>, source: CodecError) -> Self {
        ClientError::Decode {
            column: column.into(),
            source,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
