//! Compact binary serialization with schema evolution support.
//!
//! Compact serialization encodes a value as a record laid out by a
//! [`Schema`]: fixed-size fields first, bit-packed booleans next, then
//! variable-size payloads addressed through a trailing offset table. Each
//! schema is identified by a 64-bit Rabin fingerprint of its type name and
//! sorted field definitions, so two parties that derive the same schema
//! independently agree on its id without coordination.
//!
//! Records travel in one of two framings: schema-by-reference, where only
//! the fingerprint precedes the record and readers resolve it through a
//! [`SchemaCatalog`], or schema-embedded, where every schema used by the
//! record is appended in a trailing table for self-contained decoding.

mod catalog;
mod generic_record;
mod reader;
mod registry;
mod serializer;
mod writer;

pub use catalog::{InMemorySchemaCatalog, SchemaCatalog};
pub use generic_record::{FieldValue, GenericRecord, GenericRecordBuilder, GenericRecordCloner};
pub use reader::{CompactReader, DefaultCompactReader};
pub use registry::{TypeRegistration, TypeRegistry, TypeResolver};
pub use serializer::{
    CompactSerializer, CompactWithSchemaSerializer, Decoded, LazySchemaReader,
};
pub use writer::{CompactWriter, DefaultCompactWriter, SchemaCollector};

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::error::{CompactError, Result};
use crate::serialization::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};

/// Initial value and reducing polynomial for the 64-bit Rabin fingerprint.
pub(crate) const RABIN_FINGERPRINT_INIT: u64 = 0xc15d213aa4d7a795;

/// Computes the 64-bit Rabin fingerprint of `data`.
pub(crate) fn rabin_fingerprint_64(data: &[u8]) -> u64 {
    let mut fp = RABIN_FINGERPRINT_INIT;
    for &byte in data {
        fp ^= u64::from(byte);
        for _ in 0..8 {
            if fp & 1 == 1 {
                fp = (fp >> 1) ^ RABIN_FINGERPRINT_INIT;
            } else {
                fp >>= 1;
            }
        }
    }
    fp
}

/// A type that can be written to and read from the compact format.
///
/// Implementations must write the same set of fields on every call so that
/// the schema derived from one instance is valid for all instances.
pub trait Compact: Send + Sync + 'static {
    /// The wire-level type name, shared by every party exchanging this type.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Writes every field of `self` through the writer.
    fn write<W: CompactWriter>(&self, writer: &mut W) -> Result<()>
    where
        Self: Sized;

    /// Reads an instance field by field through the reader.
    fn read<R: CompactReader>(reader: &mut R) -> Result<Self>
    where
        Self: Sized;
}

/// The kind of a field within a compact schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FieldKind {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Decimal,
    Time,
    Date,
    Timestamp,
    TimestampWithTimezone,
    Compact,
    ArrayOfBoolean,
    ArrayOfInt8,
    ArrayOfInt16,
    ArrayOfInt32,
    ArrayOfInt64,
    ArrayOfFloat32,
    ArrayOfFloat64,
    ArrayOfString,
    ArrayOfDecimal,
    ArrayOfTime,
    ArrayOfDate,
    ArrayOfTimestamp,
    ArrayOfTimestampWithTimezone,
    ArrayOfCompact,
}

impl FieldKind {
    /// Returns the wire tag for this kind.
    pub fn id(&self) -> u8 {
        match self {
            FieldKind::Boolean => 0,
            FieldKind::Int8 => 1,
            FieldKind::Int16 => 2,
            FieldKind::Int32 => 3,
            FieldKind::Int64 => 4,
            FieldKind::Float32 => 5,
            FieldKind::Float64 => 6,
            FieldKind::String => 7,
            FieldKind::Decimal => 8,
            FieldKind::Time => 9,
            FieldKind::Date => 10,
            FieldKind::Timestamp => 11,
            FieldKind::TimestampWithTimezone => 12,
            FieldKind::Compact => 13,
            FieldKind::ArrayOfBoolean => 14,
            FieldKind::ArrayOfInt8 => 15,
            FieldKind::ArrayOfInt16 => 16,
            FieldKind::ArrayOfInt32 => 17,
            FieldKind::ArrayOfInt64 => 18,
            FieldKind::ArrayOfFloat32 => 19,
            FieldKind::ArrayOfFloat64 => 20,
            FieldKind::ArrayOfString => 21,
            FieldKind::ArrayOfDecimal => 22,
            FieldKind::ArrayOfTime => 23,
            FieldKind::ArrayOfDate => 24,
            FieldKind::ArrayOfTimestamp => 25,
            FieldKind::ArrayOfTimestampWithTimezone => 26,
            FieldKind::ArrayOfCompact => 27,
        }
    }

    /// Returns the kind for a wire tag.
    pub fn from_id(id: u8) -> Result<Self> {
        Ok(match id {
            0 => FieldKind::Boolean,
            1 => FieldKind::Int8,
            2 => FieldKind::Int16,
            3 => FieldKind::Int32,
            4 => FieldKind::Int64,
            5 => FieldKind::Float32,
            6 => FieldKind::Float64,
            7 => FieldKind::String,
            8 => FieldKind::Decimal,
            9 => FieldKind::Time,
            10 => FieldKind::Date,
            11 => FieldKind::Timestamp,
            12 => FieldKind::TimestampWithTimezone,
            13 => FieldKind::Compact,
            14 => FieldKind::ArrayOfBoolean,
            15 => FieldKind::ArrayOfInt8,
            16 => FieldKind::ArrayOfInt16,
            17 => FieldKind::ArrayOfInt32,
            18 => FieldKind::ArrayOfInt64,
            19 => FieldKind::ArrayOfFloat32,
            20 => FieldKind::ArrayOfFloat64,
            21 => FieldKind::ArrayOfString,
            22 => FieldKind::ArrayOfDecimal,
            23 => FieldKind::ArrayOfTime,
            24 => FieldKind::ArrayOfDate,
            25 => FieldKind::ArrayOfTimestamp,
            26 => FieldKind::ArrayOfTimestampWithTimezone,
            27 => FieldKind::ArrayOfCompact,
            other => {
                return Err(CompactError::Serialization(format!(
                    "unknown field kind tag: {other}"
                )))
            }
        })
    }

    /// Returns the encoded size in bytes for fixed-size kinds.
    ///
    /// Booleans report one byte here but are bit-packed by the layout.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            FieldKind::Boolean | FieldKind::Int8 => Some(1),
            FieldKind::Int16 => Some(2),
            FieldKind::Int32 | FieldKind::Float32 => Some(4),
            FieldKind::Int64 | FieldKind::Float64 => Some(8),
            _ => None,
        }
    }

    /// Returns true for kinds stored in the fixed-size region.
    pub fn has_definite_size(&self) -> bool {
        self.fixed_size().is_some()
    }

    /// Returns true for array kinds.
    pub fn is_array(&self) -> bool {
        self.id() >= 14
    }
}

/// A single field definition within a [`Schema`].
///
/// The layout fields (`offset`, `bit_offset`, `index`) are computed by
/// [`Schema::new`] and are never part of the wire encoding or the
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    offset: i32,
    bit_offset: i8,
    index: i32,
}

impl FieldDescriptor {
    /// Creates a descriptor with unassigned layout positions.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            offset: -1,
            bit_offset: -1,
            index: -1,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Byte offset within the fixed-size region, or -1 for variable-size
    /// fields.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Bit position within the byte at `offset` for booleans, or -1.
    pub fn bit_offset(&self) -> i8 {
        self.bit_offset
    }

    /// Slot index into the offset table for variable-size fields, or -1.
    pub fn index(&self) -> i32 {
        self.index
    }
}

/// An immutable, validated description of a record type.
///
/// Construction assigns the deterministic layout: fixed-size fields are
/// packed in descending size order (name order on ties), booleans are
/// bit-packed eight to a byte after them, and variable-size fields get
/// dense offset-table indices in name order. The layout depends only on
/// the field set, never on insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    type_name: String,
    fields: BTreeMap<String, FieldDescriptor>,
    fixed_size_len: usize,
    var_field_count: usize,
    has_nested_records: bool,
    schema_id: u64,
}

impl Schema {
    /// Builds a schema from a type name and field definitions.
    ///
    /// Fails with [`CompactError::DuplicateFieldName`] if two definitions
    /// share a name.
    pub fn new(type_name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Result<Self> {
        let type_name = type_name.into();
        let mut field_map: BTreeMap<String, FieldDescriptor> = BTreeMap::new();
        for field in fields {
            let name = field.name.clone();
            if field_map.insert(name.clone(), field).is_some() {
                return Err(CompactError::DuplicateFieldName { name });
            }
        }

        let mut fixed: Vec<(String, usize)> = field_map
            .values()
            .filter(|f| f.kind != FieldKind::Boolean && f.kind.has_definite_size())
            .map(|f| (f.name.clone(), f.kind.fixed_size().unwrap_or(0)))
            .collect();
        fixed.sort_by(|a, b| b.1.cmp(&a.1));

        let mut offset = 0i32;
        for (name, size) in &fixed {
            if let Some(field) = field_map.get_mut(name) {
                field.offset = offset;
            }
            offset += *size as i32;
        }

        let booleans: Vec<String> = field_map
            .values()
            .filter(|f| f.kind == FieldKind::Boolean)
            .map(|f| f.name.clone())
            .collect();
        for (position, name) in booleans.iter().enumerate() {
            if let Some(field) = field_map.get_mut(name) {
                field.offset = offset + (position / 8) as i32;
                field.bit_offset = (position % 8) as i8;
            }
        }
        let mut fixed_size_len = offset as usize;
        if !booleans.is_empty() {
            fixed_size_len += (booleans.len() + 7) / 8;
        }

        let variable: Vec<String> = field_map
            .values()
            .filter(|f| !f.kind.has_definite_size())
            .map(|f| f.name.clone())
            .collect();
        let mut has_nested_records = false;
        for (index, name) in variable.iter().enumerate() {
            if let Some(field) = field_map.get_mut(name) {
                field.index = index as i32;
                if matches!(field.kind, FieldKind::Compact | FieldKind::ArrayOfCompact) {
                    has_nested_records = true;
                }
            }
        }

        let schema_id = Self::compute_fingerprint(&type_name, &field_map);

        Ok(Self {
            type_name,
            var_field_count: variable.len(),
            fields: field_map,
            fixed_size_len,
            has_nested_records,
            schema_id,
        })
    }

    /// Fingerprints the type name and the sorted field definitions.
    ///
    /// Only names and kind tags contribute; layout positions do not, so
    /// the id is stable across layout algorithm revisions.
    fn compute_fingerprint(type_name: &str, fields: &BTreeMap<String, FieldDescriptor>) -> u64 {
        let mut canonical = ObjectDataOutput::with_capacity(64);
        let _ = canonical.write_string(type_name);
        let _ = canonical.write_int(fields.len() as i32);
        for field in fields.values() {
            let _ = canonical.write_string(&field.name);
            let _ = canonical.write_byte(field.kind.id() as i8);
        }
        rabin_fingerprint_64(canonical.as_bytes())
    }

    /// Returns the wire-level type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the schema fingerprint.
    pub fn schema_id(&self) -> u64 {
        self.schema_id
    }

    /// Returns the total byte length of the fixed-size region.
    pub fn fixed_size_len(&self) -> usize {
        self.fixed_size_len
    }

    /// Returns the number of variable-size fields.
    pub fn var_field_count(&self) -> usize {
        self.var_field_count
    }

    /// Returns true if any field holds a nested compact record.
    pub fn has_nested_records(&self) -> bool {
        self.has_nested_records
    }

    /// Returns the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Looks up a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Returns true if the schema defines the given field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterates over field definitions in name order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    /// Writes the schema definition without layout positions.
    pub fn write_to(&self, out: &mut ObjectDataOutput) -> Result<()> {
        out.write_string(&self.type_name)?;
        out.write_int(self.fields.len() as i32)?;
        for field in self.fields.values() {
            out.write_string(&field.name)?;
            out.write_byte(field.kind.id() as i8)?;
        }
        Ok(())
    }

    /// Reads a schema definition and recomputes the layout.
    pub fn read_from(input: &mut ObjectDataInput<'_>) -> Result<Self> {
        let type_name = input.read_string()?;
        let field_count = input.read_int()?;
        if field_count < 0 {
            return Err(CompactError::Serialization(format!(
                "negative field count in schema definition: {field_count}"
            )));
        }
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let name = input.read_string()?;
            let kind = FieldKind::from_id(input.read_byte()? as u8)?;
            fields.push(FieldDescriptor::new(name, kind));
        }
        Schema::new(type_name, fields)
    }
}

impl Hash for Schema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema_id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_of(fields: Vec<(&str, FieldKind)>) -> Schema {
        Schema::new(
            "test.Type",
            fields
                .into_iter()
                .map(|(name, kind)| FieldDescriptor::new(name, kind))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn fingerprint_matches_known_vector() {
        // Empty input leaves the initial polynomial untouched only after
        // mixing; the function must be deterministic and spread bits.
        let a = rabin_fingerprint_64(b"hello");
        let b = rabin_fingerprint_64(b"hello");
        let c = rabin_fingerprint_64(b"hellp");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fixed_fields_pack_in_descending_size_order() {
        let schema = schema_of(vec![
            ("a", FieldKind::Int8),
            ("b", FieldKind::Int64),
            ("c", FieldKind::Int32),
            ("d", FieldKind::Int16),
        ]);
        assert_eq!(schema.field("b").unwrap().offset(), 0);
        assert_eq!(schema.field("c").unwrap().offset(), 8);
        assert_eq!(schema.field("d").unwrap().offset(), 12);
        assert_eq!(schema.field("a").unwrap().offset(), 14);
        assert_eq!(schema.fixed_size_len(), 15);
    }

    #[test]
    fn equal_size_fields_order_by_name() {
        let schema = schema_of(vec![
            ("zeta", FieldKind::Int32),
            ("alpha", FieldKind::Int32),
        ]);
        assert_eq!(schema.field("alpha").unwrap().offset(), 0);
        assert_eq!(schema.field("zeta").unwrap().offset(), 4);
    }

    #[test]
    fn eight_booleans_share_one_byte() {
        let names = ["b0", "b1", "b2", "b3", "b4", "b5", "b6", "b7"];
        let schema = schema_of(names.iter().map(|n| (*n, FieldKind::Boolean)).collect());
        assert_eq!(schema.fixed_size_len(), 1);
        for (i, name) in names.iter().enumerate() {
            let field = schema.field(name).unwrap();
            assert_eq!(field.offset(), 0);
            assert_eq!(field.bit_offset(), i as i8);
        }
    }

    #[test]
    fn ninth_boolean_starts_second_byte() {
        let names: Vec<String> = (0..9).map(|i| format!("b{i}")).collect();
        let schema = schema_of(names.iter().map(|n| (n.as_str(), FieldKind::Boolean)).collect());
        assert_eq!(schema.fixed_size_len(), 2);
        let ninth = schema.field("b8").unwrap();
        assert_eq!(ninth.offset(), 1);
        assert_eq!(ninth.bit_offset(), 0);
    }

    #[test]
    fn booleans_follow_fixed_fields() {
        let schema = schema_of(vec![
            ("flag", FieldKind::Boolean),
            ("count", FieldKind::Int32),
        ]);
        assert_eq!(schema.field("count").unwrap().offset(), 0);
        assert_eq!(schema.field("flag").unwrap().offset(), 4);
        assert_eq!(schema.field("flag").unwrap().bit_offset(), 0);
        assert_eq!(schema.fixed_size_len(), 5);
    }

    #[test]
    fn variable_fields_get_dense_indices_in_name_order() {
        let schema = schema_of(vec![
            ("zz", FieldKind::String),
            ("aa", FieldKind::ArrayOfInt32),
            ("mm", FieldKind::Compact),
        ]);
        assert_eq!(schema.field("aa").unwrap().index(), 0);
        assert_eq!(schema.field("mm").unwrap().index(), 1);
        assert_eq!(schema.field("zz").unwrap().index(), 2);
        assert_eq!(schema.var_field_count(), 3);
        assert!(schema.has_nested_records());
    }

    #[test]
    fn schema_id_is_insertion_order_independent() {
        let a = schema_of(vec![("x", FieldKind::Int32), ("y", FieldKind::String)]);
        let b = schema_of(vec![("y", FieldKind::String), ("x", FieldKind::Int32)]);
        assert_eq!(a.schema_id(), b.schema_id());
        assert_eq!(a, b);
    }

    #[test]
    fn schema_id_changes_with_type_name_field_name_and_kind() {
        let base = schema_of(vec![("x", FieldKind::Int32)]);
        let renamed_type =
            Schema::new("test.Other", vec![FieldDescriptor::new("x", FieldKind::Int32)]).unwrap();
        let renamed_field = schema_of(vec![("y", FieldKind::Int32)]);
        let rekinded = schema_of(vec![("x", FieldKind::Int64)]);
        assert_ne!(base.schema_id(), renamed_type.schema_id());
        assert_ne!(base.schema_id(), renamed_field.schema_id());
        assert_ne!(base.schema_id(), rekinded.schema_id());
    }

    #[test]
    fn duplicate_field_name_rejected() {
        let err = Schema::new(
            "test.Type",
            vec![
                FieldDescriptor::new("x", FieldKind::Int32),
                FieldDescriptor::new("x", FieldKind::String),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CompactError::DuplicateFieldName { name } if name == "x"));
    }

    #[test]
    fn empty_schema_is_valid() {
        let schema = Schema::new("test.Empty", Vec::new()).unwrap();
        assert_eq!(schema.fixed_size_len(), 0);
        assert_eq!(schema.var_field_count(), 0);
        assert_eq!(schema.field_count(), 0);
    }

    #[test]
    fn wire_round_trip_preserves_id_and_layout() {
        let schema = schema_of(vec![
            ("active", FieldKind::Boolean),
            ("id", FieldKind::Int64),
            ("name", FieldKind::String),
        ]);
        let mut out = ObjectDataOutput::new();
        schema.write_to(&mut out).unwrap();
        let bytes = out.into_bytes();
        let mut input = ObjectDataInput::new(&bytes);
        let decoded = Schema::read_from(&mut input).unwrap();
        assert_eq!(decoded, schema);
        assert_eq!(decoded.schema_id(), schema.schema_id());
        assert_eq!(decoded.field("id").unwrap().offset(), 0);
    }

    #[test]
    fn unknown_kind_tag_rejected() {
        assert!(FieldKind::from_id(99).is_err());
        assert_eq!(FieldKind::from_id(27).unwrap(), FieldKind::ArrayOfCompact);
        assert!(FieldKind::ArrayOfCompact.is_array());
        assert!(!FieldKind::String.is_array());
    }
}
