//! Error types for the compact serialization engine.

use std::io;

use thiserror::Error;

use crate::serialization::compact::FieldKind;

/// Errors that can occur while encoding or decoding compact records.
#[derive(Debug, Error)]
pub enum CompactError {
    /// A schema id could not be resolved from the catalog or an embedded
    /// schema table.
    #[error("schema {schema_id:#018x} not found")]
    SchemaNotFound {
        /// The unresolved schema fingerprint.
        schema_id: u64,
    },

    /// A schema definition listed the same field name twice.
    #[error("duplicate field name '{name}' in schema definition")]
    DuplicateFieldName {
        /// The repeated field name.
        name: String,
    },

    /// A required field was never written before the record was finished.
    #[error("field '{name}' was not set")]
    MissingField {
        /// The unset field name.
        name: String,
    },

    /// A field was written more than once for the same record.
    #[error("field '{name}' was already set")]
    DuplicateField {
        /// The repeated field name.
        name: String,
    },

    /// A field was accessed with a kind that does not match its schema.
    #[error("field '{name}' kind mismatch: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        /// The field name.
        name: String,
        /// The kind recorded in the schema.
        expected: FieldKind,
        /// The kind the caller asked for.
        actual: FieldKind,
    },

    /// No registration or resolver could produce a deserializer for a
    /// type name found on the wire.
    #[error("type name '{type_name}' is not registered")]
    UnresolvableType {
        /// The unresolved wire type name.
        type_name: String,
    },

    /// Generic serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, CompactError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_not_found_formats_hex_id() {
        let err = CompactError::SchemaNotFound { schema_id: 0xabcd };
        assert_eq!(err.to_string(), "schema 0x000000000000abcd not found");
    }

    #[test]
    fn type_mismatch_names_both_kinds() {
        let err = CompactError::TypeMismatch {
            name: "age".to_string(),
            expected: FieldKind::Int32,
            actual: FieldKind::String,
        };
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("Int32"));
        assert!(msg.contains("String"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: CompactError = io_err.into();
        assert!(matches!(err, CompactError::Io(_)));
    }
}
