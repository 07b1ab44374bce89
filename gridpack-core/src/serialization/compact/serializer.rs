//! Entry points tying schemas, registry and catalog into wire encodings.
//!
//! [`CompactSerializer`] produces schema-by-reference payloads: only the
//! schema fingerprint travels with the record and readers resolve it
//! through the shared [`SchemaCatalog`]. [`CompactWithSchemaSerializer`]
//! produces self-contained payloads that append every schema the record
//! uses, for storage formats and cold paths where no catalog can be
//! assumed.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{CompactError, Result};
use crate::serialization::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};

use super::reader::{read_object, DefaultCompactReader, ReadSession};
use super::writer::{write_generic_record, write_object, WriteSession};
use super::{Compact, GenericRecord, Schema, SchemaCatalog, TypeRegistry};

/// The result of decoding a payload without knowing its type up front.
pub enum Decoded {
    /// The type was registered; holds the materialized value.
    Object(Box<dyn Any + Send + Sync>),
    /// The type was not registered; holds a schema-driven view.
    Record(GenericRecord),
}

impl Decoded {
    /// Returns true if decoding fell back to a generic record.
    pub fn is_record(&self) -> bool {
        matches!(self, Decoded::Record(_))
    }

    /// Downcasts a decoded object to its concrete type.
    pub fn into_object<T: 'static>(self) -> Result<T> {
        match self {
            Decoded::Object(boxed) => boxed.downcast::<T>().map(|b| *b).map_err(|_| {
                CompactError::Serialization("decoded object has a different type".to_string())
            }),
            Decoded::Record(record) => Err(CompactError::UnresolvableType {
                type_name: record.type_name().to_string(),
            }),
        }
    }

    /// Extracts the generic record fallback.
    pub fn into_record(self) -> Result<GenericRecord> {
        match self {
            Decoded::Record(record) => Ok(record),
            Decoded::Object(_) => Err(CompactError::Serialization(
                "payload decoded to a registered type, not a generic record".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for Decoded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decoded::Object(_) => f.write_str("Decoded::Object"),
            Decoded::Record(record) => f.debug_tuple("Decoded::Record").field(record).finish(),
        }
    }
}

/// Indexes an embedded schema table without parsing its entries.
///
/// Construction records only each entry's position and length; a schema
/// body is parsed the first time its id is requested and memoized after
/// that, so untouched entries cost nothing.
pub struct LazySchemaReader<'a> {
    buf: &'a [u8],
    slots: HashMap<u64, SchemaSlot>,
}

struct SchemaSlot {
    offset: usize,
    len: usize,
    schema: Option<Arc<Schema>>,
}

impl<'a> LazySchemaReader<'a> {
    /// Indexes the schema table starting at `table_offset` in `buf`.
    pub fn new(buf: &'a [u8], table_offset: usize) -> Result<Self> {
        let mut input = ObjectDataInput::new(buf);
        input.set_position(table_offset)?;
        let count = input.read_int()?;
        if count < 0 {
            return Err(CompactError::Serialization(format!(
                "negative schema count in table: {count}"
            )));
        }
        let mut slots = HashMap::with_capacity(count as usize);
        for _ in 0..count {
            let schema_id = input.read_u64()?;
            let len = input.read_int()?;
            if len < 0 {
                return Err(CompactError::Serialization(format!(
                    "negative schema body length: {len}"
                )));
            }
            let offset = input.position();
            input.skip(len as usize)?;
            slots.insert(
                schema_id,
                SchemaSlot {
                    offset,
                    len: len as usize,
                    schema: None,
                },
            );
        }
        Ok(Self { buf, slots })
    }

    /// Returns the number of table entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Resolves a schema by id, parsing its body on first access.
    pub fn get_schema(&mut self, schema_id: u64) -> Result<Option<Arc<Schema>>> {
        let Some(slot) = self.slots.get_mut(&schema_id) else {
            return Ok(None);
        };
        if let Some(schema) = &slot.schema {
            return Ok(Some(Arc::clone(schema)));
        }
        let buf = self.buf;
        let mut input = ObjectDataInput::new(&buf[slot.offset..slot.offset + slot.len]);
        let schema = Arc::new(Schema::read_from(&mut input)?);
        if schema.schema_id() != schema_id {
            return Err(CompactError::Serialization(format!(
                "schema table entry {:#018x} decodes to fingerprint {:#018x}",
                schema_id,
                schema.schema_id()
            )));
        }
        tracing::trace!(schema_id, "schema materialized from embedded table");
        slot.schema = Some(Arc::clone(&schema));
        Ok(Some(schema))
    }

    /// Parses every remaining entry and returns all schemas.
    pub(crate) fn materialize_all(&mut self) -> Result<Vec<Arc<Schema>>> {
        let ids: Vec<u64> = self.slots.keys().copied().collect();
        let mut schemas = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(schema) = self.get_schema(id)? {
                schemas.push(schema);
            }
        }
        Ok(schemas)
    }
}

fn top_schema_id(data: &[u8]) -> Result<u64> {
    ObjectDataInput::new(data).read_u64()
}

fn read_typed<'a, T: Compact>(data: &'a [u8], session: &mut ReadSession<'a>) -> Result<T> {
    let schema = session.resolve(top_schema_id(data)?)?;
    if schema.type_name() != T::type_name() {
        return Err(CompactError::Serialization(format!(
            "record of type '{}' cannot be read as '{}'",
            schema.type_name(),
            T::type_name()
        )));
    }
    read_object::<T>(data, session)
}

fn decode_dynamic<'a>(
    registry: &Arc<TypeRegistry>,
    data: &'a [u8],
    session: &mut ReadSession<'a>,
) -> Result<Decoded> {
    let schema = session.resolve(top_schema_id(data)?)?;
    match registry.registration_for_name(schema.type_name()) {
        Some(registration) => {
            let mut reader = DefaultCompactReader::new(data, schema, session)?;
            Ok(Decoded::Object(registration.read_boxed(&mut reader)?))
        }
        None => {
            tracing::debug!(
                type_name = schema.type_name(),
                "no registration for type, falling back to generic record"
            );
            Ok(Decoded::Record(decode_generic(data, schema, session)?))
        }
    }
}

fn decode_generic<'a>(
    data: &'a [u8],
    schema: Arc<Schema>,
    session: &mut ReadSession<'a>,
) -> Result<GenericRecord> {
    // The record may outlive this session's buffer, so nested schemas
    // must be resolvable through the catalog afterwards.
    if schema.has_nested_records() {
        session.drain_into_catalog()?;
    }
    Ok(GenericRecord::decoded(
        schema,
        Bytes::copy_from_slice(data),
        Arc::clone(session.catalog()),
    ))
}

/// Schema-by-reference serializer.
///
/// Payloads carry only the schema fingerprint; writer and reader must
/// share a catalog, directly or through out-of-band schema distribution.
pub struct CompactSerializer {
    registry: Arc<TypeRegistry>,
    catalog: Arc<dyn SchemaCatalog>,
}

impl CompactSerializer {
    /// Creates a serializer over the given registry and catalog.
    pub fn new(registry: Arc<TypeRegistry>, catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self { registry, catalog }
    }

    /// Returns the type registry.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Returns the schema catalog.
    pub fn catalog(&self) -> &Arc<dyn SchemaCatalog> {
        &self.catalog
    }

    /// Writes `value` as a record, publishing new schemas to the catalog.
    pub fn write<T: Compact>(&self, out: &mut ObjectDataOutput, value: &T) -> Result<()> {
        let mut session = WriteSession::reference(
            Arc::clone(&self.registry),
            Arc::clone(&self.catalog),
        );
        write_object(out, &mut session, value)
    }

    /// Writes a generic record, publishing new schemas to the catalog.
    pub fn write_record(&self, out: &mut ObjectDataOutput, record: &GenericRecord) -> Result<()> {
        let mut session = WriteSession::reference(
            Arc::clone(&self.registry),
            Arc::clone(&self.catalog),
        );
        write_generic_record(out, &mut session, record)
    }

    /// Encodes `value` into a standalone byte vector.
    pub fn to_bytes<T: Compact>(&self, value: &T) -> Result<Vec<u8>> {
        let mut out = ObjectDataOutput::new();
        self.write(&mut out, value)?;
        Ok(out.into_bytes())
    }

    /// Encodes a generic record into a standalone byte vector.
    pub fn record_to_bytes(&self, record: &GenericRecord) -> Result<Vec<u8>> {
        let mut out = ObjectDataOutput::new();
        self.write_record(&mut out, record)?;
        Ok(out.into_bytes())
    }

    /// Decodes a payload, dispatching on the registered type name.
    pub fn read(&self, data: &[u8]) -> Result<Decoded> {
        let mut session = ReadSession::new(Arc::clone(&self.catalog));
        decode_dynamic(&self.registry, data, &mut session)
    }

    /// Decodes a payload as a known type.
    pub fn read_as<T: Compact>(&self, data: &[u8]) -> Result<T> {
        let mut session = ReadSession::new(Arc::clone(&self.catalog));
        read_typed::<T>(data, &mut session)
    }

    /// Decodes a payload as a generic record regardless of registrations.
    pub fn read_record(&self, data: &[u8]) -> Result<GenericRecord> {
        let mut session = ReadSession::new(Arc::clone(&self.catalog));
        let schema = session.resolve(top_schema_id(data)?)?;
        decode_generic(data, schema, &mut session)
    }
}

/// Schema-embedded serializer.
///
/// Payload layout: a 4-byte offset to the schema table, the record, then
/// the table itself as a count followed by `(id, length, body)` entries.
/// Readers need no pre-populated catalog.
pub struct CompactWithSchemaSerializer {
    registry: Arc<TypeRegistry>,
    catalog: Arc<dyn SchemaCatalog>,
}

impl CompactWithSchemaSerializer {
    /// Creates a serializer over the given registry and catalog.
    pub fn new(registry: Arc<TypeRegistry>, catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self { registry, catalog }
    }

    /// Returns the type registry.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Returns the schema catalog.
    pub fn catalog(&self) -> &Arc<dyn SchemaCatalog> {
        &self.catalog
    }

    /// Writes `value` followed by every schema the record used.
    pub fn write<T: Compact>(&self, out: &mut ObjectDataOutput, value: &T) -> Result<()> {
        let envelope_start = out.position();
        out.write_int(0)?;
        let mut session = WriteSession::embedded(
            Arc::clone(&self.registry),
            Arc::clone(&self.catalog),
        );
        write_object(out, &mut session, value)?;
        Self::finish(out, envelope_start, &session)
    }

    /// Writes a generic record followed by every schema it used.
    pub fn write_record(&self, out: &mut ObjectDataOutput, record: &GenericRecord) -> Result<()> {
        let envelope_start = out.position();
        out.write_int(0)?;
        let mut session = WriteSession::embedded(
            Arc::clone(&self.registry),
            Arc::clone(&self.catalog),
        );
        write_generic_record(out, &mut session, record)?;
        Self::finish(out, envelope_start, &session)
    }

    fn finish(
        out: &mut ObjectDataOutput,
        envelope_start: usize,
        session: &WriteSession,
    ) -> Result<()> {
        let table_offset = out.position() - envelope_start;
        out.patch_int(envelope_start, table_offset as i32)?;
        let schemas = session.touched_schemas();
        out.write_int(schemas.len() as i32)?;
        for schema in schemas {
            out.write_u64(schema.schema_id())?;
            let mut body = ObjectDataOutput::with_capacity(64);
            schema.write_to(&mut body)?;
            out.write_int(body.len() as i32)?;
            out.write_bytes(body.as_bytes())?;
        }
        Ok(())
    }

    /// Encodes `value` into a standalone self-contained byte vector.
    pub fn to_bytes<T: Compact>(&self, value: &T) -> Result<Vec<u8>> {
        let mut out = ObjectDataOutput::new();
        self.write(&mut out, value)?;
        Ok(out.into_bytes())
    }

    /// Encodes a generic record into a standalone self-contained byte
    /// vector.
    pub fn record_to_bytes(&self, record: &GenericRecord) -> Result<Vec<u8>> {
        let mut out = ObjectDataOutput::new();
        self.write_record(&mut out, record)?;
        Ok(out.into_bytes())
    }

    fn split(data: &[u8]) -> Result<(&[u8], LazySchemaReader<'_>)> {
        let table_offset = ObjectDataInput::new(data).read_int()?;
        if table_offset < 4 || table_offset as usize > data.len() {
            return Err(CompactError::Serialization(format!(
                "schema table offset {} is outside the payload",
                table_offset
            )));
        }
        let record = &data[4..table_offset as usize];
        let lazy = LazySchemaReader::new(data, table_offset as usize)?;
        Ok((record, lazy))
    }

    /// Decodes a self-contained payload, dispatching on the registered
    /// type name.
    pub fn read(&self, data: &[u8]) -> Result<Decoded> {
        let (record, lazy) = Self::split(data)?;
        let mut session = ReadSession::with_lazy(Arc::clone(&self.catalog), lazy);
        decode_dynamic(&self.registry, record, &mut session)
    }

    /// Decodes a self-contained payload as a known type.
    pub fn read_as<T: Compact>(&self, data: &[u8]) -> Result<T> {
        let (record, lazy) = Self::split(data)?;
        let mut session = ReadSession::with_lazy(Arc::clone(&self.catalog), lazy);
        read_typed::<T>(record, &mut session)
    }

    /// Decodes a self-contained payload as a generic record.
    pub fn read_record(&self, data: &[u8]) -> Result<GenericRecord> {
        let (record, lazy) = Self::split(data)?;
        let mut session = ReadSession::with_lazy(Arc::clone(&self.catalog), lazy);
        let schema = session.resolve(top_schema_id(record)?)?;
        decode_generic(record, schema, &mut session)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{CompactReader, CompactWriter, InMemorySchemaCatalog};
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Compact for Point {
        fn type_name() -> &'static str {
            "test.Point"
        }

        fn write<W: CompactWriter>(&self, writer: &mut W) -> Result<()> {
            writer.write_int32("x", self.x)?;
            writer.write_int32("y", self.y)?;
            Ok(())
        }

        fn read<R: CompactReader>(reader: &mut R) -> Result<Self> {
            Ok(Self {
                x: reader.read_int32("x")?,
                y: reader.read_int32("y")?,
            })
        }
    }

    fn reference_serializer() -> CompactSerializer {
        CompactSerializer::new(
            Arc::new(TypeRegistry::new()),
            Arc::new(InMemorySchemaCatalog::new()),
        )
    }

    fn embedded_serializer() -> CompactWithSchemaSerializer {
        CompactWithSchemaSerializer::new(
            Arc::new(TypeRegistry::new()),
            Arc::new(InMemorySchemaCatalog::new()),
        )
    }

    #[test]
    fn reference_round_trip_with_shared_catalog() {
        let serializer = reference_serializer();
        let bytes = serializer.to_bytes(&Point { x: 3, y: -4 }).unwrap();
        let point: Point = serializer.read_as(&bytes).unwrap();
        assert_eq!(point, Point { x: 3, y: -4 });
    }

    #[test]
    fn reference_read_fails_without_schema() {
        let writer = reference_serializer();
        let bytes = writer.to_bytes(&Point { x: 1, y: 2 }).unwrap();
        let reader = reference_serializer();
        let err = reader.read(&bytes).unwrap_err();
        assert!(matches!(err, CompactError::SchemaNotFound { .. }));
    }

    #[test]
    fn embedded_round_trip_needs_no_shared_state() {
        let writer = embedded_serializer();
        let bytes = writer.to_bytes(&Point { x: 9, y: 10 }).unwrap();
        let reader = embedded_serializer();
        reader.registry().register::<Point>();
        let point: Point = reader.read_as(&bytes).unwrap();
        assert_eq!(point, Point { x: 9, y: 10 });
    }

    #[test]
    fn dynamic_read_returns_object_for_registered_type() {
        let serializer = reference_serializer();
        let bytes = serializer.to_bytes(&Point { x: 1, y: 1 }).unwrap();
        let decoded = serializer.read(&bytes).unwrap();
        assert!(!decoded.is_record());
        assert_eq!(decoded.into_object::<Point>().unwrap(), Point { x: 1, y: 1 });
    }

    #[test]
    fn dynamic_read_falls_back_to_generic_record() {
        let writer = embedded_serializer();
        let bytes = writer.to_bytes(&Point { x: 5, y: 6 }).unwrap();
        let reader = embedded_serializer();
        let decoded = reader.read(&bytes).unwrap();
        let record = decoded.into_record().unwrap();
        assert_eq!(record.type_name(), "test.Point");
        assert_eq!(record.get_int32("x").unwrap(), 5);
        assert_eq!(record.get_int32("y").unwrap(), 6);
    }

    #[test]
    fn read_as_rejects_mismatched_type_name() {
        #[derive(Debug)]
        struct Other;
        impl Compact for Other {
            fn type_name() -> &'static str {
                "test.Other"
            }
            fn write<W: CompactWriter>(&self, _writer: &mut W) -> Result<()> {
                Ok(())
            }
            fn read<R: CompactReader>(_reader: &mut R) -> Result<Self> {
                Ok(Self)
            }
        }

        let serializer = reference_serializer();
        let bytes = serializer.to_bytes(&Point { x: 0, y: 0 }).unwrap();
        assert!(serializer.read_as::<Other>(&bytes).is_err());
    }

    #[test]
    fn embedded_payload_has_backfilled_table_offset() {
        let serializer = embedded_serializer();
        let bytes = serializer.to_bytes(&Point { x: 1, y: 2 }).unwrap();
        let table_offset =
            i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        // record: id(8) + two ints(8), no var fields
        assert_eq!(table_offset, 4 + 16);
        let count = i32::from_be_bytes([
            bytes[table_offset],
            bytes[table_offset + 1],
            bytes[table_offset + 2],
            bytes[table_offset + 3],
        ]);
        assert_eq!(count, 1);
    }

    #[test]
    fn lazy_reader_memoizes_parsed_schemas() {
        let serializer = embedded_serializer();
        let bytes = serializer.to_bytes(&Point { x: 1, y: 2 }).unwrap();
        let table_offset =
            i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let mut lazy = LazySchemaReader::new(&bytes, table_offset).unwrap();
        assert_eq!(lazy.len(), 1);
        let schema_id = top_schema_id(&bytes[4..]).unwrap();
        let first = lazy.get_schema(schema_id).unwrap().unwrap();
        let second = lazy.get_schema(schema_id).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(lazy.get_schema(schema_id ^ 1).unwrap().is_none());
    }

    #[test]
    fn corrupt_table_offset_rejected() {
        let serializer = embedded_serializer();
        let mut bytes = serializer.to_bytes(&Point { x: 1, y: 2 }).unwrap();
        bytes[0..4].copy_from_slice(&i32::MAX.to_be_bytes());
        assert!(serializer.read(&bytes).is_err());
        bytes[0..4].copy_from_slice(&0i32.to_be_bytes());
        assert!(serializer.read(&bytes).is_err());
    }
}
