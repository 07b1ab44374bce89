//! Compact, schema-evolving binary serialization for distributed
//! in-memory data grids.
//!
//! Values implementing [`Compact`] are encoded as schema-described
//! records. Schemas are derived once per type, identified by a 64-bit
//! fingerprint, and distributed either through a shared
//! [`SchemaCatalog`] (schema-by-reference payloads) or embedded in the
//! payload itself. Readers without a registered type for a payload fall
//! back to [`GenericRecord`] access, and readers with a newer view of a
//! type than its writer receive defaults for the missing fields.

#![warn(missing_docs)]

pub mod error;
pub mod serialization;

pub use error::{CompactError, Result};
pub use serialization::compact::{
    Compact, CompactReader, CompactSerializer, CompactWithSchemaSerializer, CompactWriter,
    Decoded, DefaultCompactReader, DefaultCompactWriter, FieldDescriptor, FieldKind, FieldValue,
    GenericRecord, GenericRecordBuilder, GenericRecordCloner, InMemorySchemaCatalog,
    LazySchemaReader, Schema, SchemaCatalog, SchemaCollector, TypeRegistration, TypeRegistry,
    TypeResolver,
};
pub use serialization::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};
