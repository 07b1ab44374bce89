//! Compact record encoders.
//!
//! Writing a record is layout-directed: the schema decides where each
//! field lands, so fields may be written in any order. Fixed-size values
//! are patched into a pre-zeroed region, booleans are set bit by bit, and
//! variable-size payloads are appended with their offsets collected for
//! the trailing offset table.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;

use crate::error::{CompactError, Result};
use crate::serialization::{DataOutput, ObjectDataOutput};

use super::generic_record::{FieldValue, GenericRecord};
use super::{Compact, FieldDescriptor, FieldKind, Schema, SchemaCatalog, TypeRegistry};

/// Field-by-field writer interface implemented by compact encoders.
///
/// Each method writes one named field. Writing a field that the schema
/// does not define, writing it with the wrong kind, or writing it twice
/// is an error; leaving a field unwritten fails when the record is
/// finished.
#[allow(missing_docs)]
pub trait CompactWriter {
    fn write_boolean(&mut self, name: &str, value: bool) -> Result<()>;
    fn write_int8(&mut self, name: &str, value: i8) -> Result<()>;
    fn write_int16(&mut self, name: &str, value: i16) -> Result<()>;
    fn write_int32(&mut self, name: &str, value: i32) -> Result<()>;
    fn write_int64(&mut self, name: &str, value: i64) -> Result<()>;
    fn write_float32(&mut self, name: &str, value: f32) -> Result<()>;
    fn write_float64(&mut self, name: &str, value: f64) -> Result<()>;
    fn write_string(&mut self, name: &str, value: Option<&str>) -> Result<()>;
    fn write_decimal(&mut self, name: &str, value: Option<Decimal>) -> Result<()>;
    fn write_time(&mut self, name: &str, value: Option<NaiveTime>) -> Result<()>;
    fn write_date(&mut self, name: &str, value: Option<NaiveDate>) -> Result<()>;
    fn write_timestamp(&mut self, name: &str, value: Option<NaiveDateTime>) -> Result<()>;
    fn write_timestamp_with_timezone(
        &mut self,
        name: &str,
        value: Option<DateTime<FixedOffset>>,
    ) -> Result<()>;
    /// Writes a nested compact record.
    fn write_compact<T: Compact>(&mut self, name: &str, value: Option<&T>) -> Result<()>
    where
        Self: Sized;
    fn write_array_of_boolean(&mut self, name: &str, value: Option<&[bool]>) -> Result<()>;
    fn write_array_of_int8(&mut self, name: &str, value: Option<&[i8]>) -> Result<()>;
    fn write_array_of_int16(&mut self, name: &str, value: Option<&[i16]>) -> Result<()>;
    fn write_array_of_int32(&mut self, name: &str, value: Option<&[i32]>) -> Result<()>;
    fn write_array_of_int64(&mut self, name: &str, value: Option<&[i64]>) -> Result<()>;
    fn write_array_of_float32(&mut self, name: &str, value: Option<&[f32]>) -> Result<()>;
    fn write_array_of_float64(&mut self, name: &str, value: Option<&[f64]>) -> Result<()>;
    fn write_array_of_string(&mut self, name: &str, value: Option<&[Option<String>]>)
        -> Result<()>;
    fn write_array_of_decimal(
        &mut self,
        name: &str,
        value: Option<&[Option<Decimal>]>,
    ) -> Result<()>;
    fn write_array_of_time(&mut self, name: &str, value: Option<&[Option<NaiveTime>]>)
        -> Result<()>;
    fn write_array_of_date(&mut self, name: &str, value: Option<&[Option<NaiveDate>]>)
        -> Result<()>;
    fn write_array_of_timestamp(
        &mut self,
        name: &str,
        value: Option<&[Option<NaiveDateTime>]>,
    ) -> Result<()>;
    fn write_array_of_timestamp_with_timezone(
        &mut self,
        name: &str,
        value: Option<&[Option<DateTime<FixedOffset>>]>,
    ) -> Result<()>;
    /// Writes an array of nested compact records.
    fn write_array_of_compact<T: Compact>(&mut self, name: &str, value: Option<&[T]>) -> Result<()>
    where
        Self: Sized;
}

/// A [`CompactWriter`] that records field definitions instead of bytes.
///
/// Running a value's write function against a collector yields the field
/// set needed to build its [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaCollector {
    fields: Vec<FieldDescriptor>,
    seen: HashSet<String>,
}

impl SchemaCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the collector and returns the recorded field definitions.
    pub fn into_fields(self) -> Vec<FieldDescriptor> {
        self.fields
    }

    fn record(&mut self, name: &str, kind: FieldKind) -> Result<()> {
        if !self.seen.insert(name.to_string()) {
            return Err(CompactError::DuplicateFieldName {
                name: name.to_string(),
            });
        }
        self.fields.push(FieldDescriptor::new(name, kind));
        Ok(())
    }
}

macro_rules! collector_methods {
    ($(($method:ident, $kind:ident, $ty:ty)),* $(,)?) => {
        $(
            fn $method(&mut self, name: &str, _value: $ty) -> Result<()> {
                self.record(name, FieldKind::$kind)
            }
        )*
    };
}

impl CompactWriter for SchemaCollector {
    collector_methods!(
        (write_boolean, Boolean, bool),
        (write_int8, Int8, i8),
        (write_int16, Int16, i16),
        (write_int32, Int32, i32),
        (write_int64, Int64, i64),
        (write_float32, Float32, f32),
        (write_float64, Float64, f64),
        (write_string, String, Option<&str>),
        (write_decimal, Decimal, Option<Decimal>),
        (write_time, Time, Option<NaiveTime>),
        (write_date, Date, Option<NaiveDate>),
        (write_timestamp, Timestamp, Option<NaiveDateTime>),
        (
            write_timestamp_with_timezone,
            TimestampWithTimezone,
            Option<DateTime<FixedOffset>>
        ),
        (write_array_of_boolean, ArrayOfBoolean, Option<&[bool]>),
        (write_array_of_int8, ArrayOfInt8, Option<&[i8]>),
        (write_array_of_int16, ArrayOfInt16, Option<&[i16]>),
        (write_array_of_int32, ArrayOfInt32, Option<&[i32]>),
        (write_array_of_int64, ArrayOfInt64, Option<&[i64]>),
        (write_array_of_float32, ArrayOfFloat32, Option<&[f32]>),
        (write_array_of_float64, ArrayOfFloat64, Option<&[f64]>),
        (write_array_of_string, ArrayOfString, Option<&[Option<String>]>),
        (write_array_of_decimal, ArrayOfDecimal, Option<&[Option<Decimal>]>),
        (write_array_of_time, ArrayOfTime, Option<&[Option<NaiveTime>]>),
        (write_array_of_date, ArrayOfDate, Option<&[Option<NaiveDate>]>),
        (
            write_array_of_timestamp,
            ArrayOfTimestamp,
            Option<&[Option<NaiveDateTime>]>
        ),
        (
            write_array_of_timestamp_with_timezone,
            ArrayOfTimestampWithTimezone,
            Option<&[Option<DateTime<FixedOffset>>]>
        ),
    );

    fn write_compact<T: Compact>(&mut self, name: &str, _value: Option<&T>) -> Result<()> {
        self.record(name, FieldKind::Compact)
    }

    fn write_array_of_compact<T: Compact>(
        &mut self,
        name: &str,
        _value: Option<&[T]>,
    ) -> Result<()> {
        self.record(name, FieldKind::ArrayOfCompact)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Schemas are published to the catalog; only ids travel on the wire.
    Reference,
    /// Every schema used by the record is collected for an embedded table.
    Embedded,
}

/// Per-encode state shared by a writer and its nested writers.
pub(crate) struct WriteSession {
    registry: Arc<TypeRegistry>,
    catalog: Arc<dyn SchemaCatalog>,
    mode: WriteMode,
    touched: Vec<Arc<Schema>>,
    touched_ids: HashSet<u64>,
}

impl WriteSession {
    pub(crate) fn reference(registry: Arc<TypeRegistry>, catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self::with_mode(registry, catalog, WriteMode::Reference)
    }

    pub(crate) fn embedded(registry: Arc<TypeRegistry>, catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self::with_mode(registry, catalog, WriteMode::Embedded)
    }

    fn with_mode(
        registry: Arc<TypeRegistry>,
        catalog: Arc<dyn SchemaCatalog>,
        mode: WriteMode,
    ) -> Self {
        Self {
            registry,
            catalog,
            mode,
            touched: Vec::new(),
            touched_ids: HashSet::new(),
        }
    }

    pub(crate) fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Records a schema used during this encode.
    ///
    /// In reference mode a schema unknown to the catalog is published; in
    /// embedded mode it is kept locally and queued for the schema table.
    pub(crate) fn touch(&mut self, schema: &Arc<Schema>) -> Result<()> {
        let fresh = self.catalog.get(schema.schema_id()).is_none();
        match self.mode {
            WriteMode::Reference => {
                if fresh {
                    self.catalog.put(Arc::clone(schema))?;
                }
            }
            WriteMode::Embedded => {
                if self.touched_ids.insert(schema.schema_id()) {
                    self.touched.push(Arc::clone(schema));
                }
                if fresh {
                    self.catalog.put_local(Arc::clone(schema))?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn touched_schemas(&self) -> &[Arc<Schema>] {
        &self.touched
    }
}

/// Encodes one typed value as a record, registering its schema.
pub(crate) fn write_object<T: Compact>(
    out: &mut ObjectDataOutput,
    session: &mut WriteSession,
    value: &T,
) -> Result<()> {
    let schema = session.registry().clone().schema_for_value(value)?;
    session.touch(&schema)?;
    let mut writer = DefaultCompactWriter::begin(out, session, schema)?;
    value.write(&mut writer)?;
    writer.end()
}

/// Encodes a nested record with a length prefix.
fn write_nested_object<T: Compact>(
    out: &mut ObjectDataOutput,
    session: &mut WriteSession,
    value: &T,
) -> Result<()> {
    let length_position = out.position();
    out.write_int(0)?;
    let body_start = out.position();
    write_object(out, session, value)?;
    out.patch_int(length_position, (out.position() - body_start) as i32)
}

/// Encodes a generic record, driving the writer from its schema.
pub(crate) fn write_generic_record(
    out: &mut ObjectDataOutput,
    session: &mut WriteSession,
    record: &GenericRecord,
) -> Result<()> {
    let schema = Arc::clone(record.schema());
    session.touch(&schema)?;
    let mut writer = DefaultCompactWriter::begin(out, session, Arc::clone(&schema))?;
    for field in schema.fields() {
        let value = record.get_value(field.name())?;
        writer.write_value(field.name(), &value)?;
    }
    writer.end()
}

fn write_nested_generic_record(
    out: &mut ObjectDataOutput,
    session: &mut WriteSession,
    record: &GenericRecord,
) -> Result<()> {
    let length_position = out.position();
    out.write_int(0)?;
    let body_start = out.position();
    write_generic_record(out, session, record)?;
    out.patch_int(length_position, (out.position() - body_start) as i32)
}

/// The standard record encoder.
///
/// Created per record by the serializers; nested records are written by a
/// child writer over the same output and session.
pub struct DefaultCompactWriter<'a> {
    out: &'a mut ObjectDataOutput,
    session: &'a mut WriteSession,
    schema: Arc<Schema>,
    start: usize,
    var_offsets: Vec<i32>,
    written: HashSet<String>,
}

impl<'a> DefaultCompactWriter<'a> {
    pub(crate) fn begin(
        out: &'a mut ObjectDataOutput,
        session: &'a mut WriteSession,
        schema: Arc<Schema>,
    ) -> Result<Self> {
        let start = out.position();
        out.write_u64(schema.schema_id())?;
        out.write_zeros(schema.fixed_size_len())?;
        let var_offsets = vec![-1i32; schema.var_field_count()];
        Ok(Self {
            out,
            session,
            schema,
            start,
            var_offsets,
            written: HashSet::new(),
        })
    }

    /// Finishes the record: validates that every field was written and
    /// appends the offset table.
    pub(crate) fn end(self) -> Result<()> {
        if self.written.len() != self.schema.field_count() {
            for field in self.schema.fields() {
                if !self.written.contains(field.name()) {
                    return Err(CompactError::MissingField {
                        name: field.name().to_string(),
                    });
                }
            }
        }
        for offset in &self.var_offsets {
            self.out.write_int(*offset)?;
        }
        Ok(())
    }

    fn descriptor(&self, name: &str, kind: FieldKind) -> Result<FieldDescriptor> {
        let field = self.schema.field(name).ok_or_else(|| {
            CompactError::Serialization(format!(
                "schema '{}' has no field '{}'",
                self.schema.type_name(),
                name
            ))
        })?;
        if field.kind() != kind {
            return Err(CompactError::TypeMismatch {
                name: name.to_string(),
                expected: field.kind(),
                actual: kind,
            });
        }
        if self.written.contains(name) {
            return Err(CompactError::DuplicateField {
                name: name.to_string(),
            });
        }
        Ok(field.clone())
    }

    fn mark(&mut self, name: &str) {
        self.written.insert(name.to_string());
    }

    fn fixed_position(&self, field: &FieldDescriptor) -> usize {
        self.start + 8 + field.offset() as usize
    }

    /// Claims the current output position as this field's offset-table
    /// entry. Offsets are relative to the record start.
    fn begin_var(&mut self, field: &FieldDescriptor) {
        self.var_offsets[field.index() as usize] = (self.out.position() - self.start) as i32;
    }

    fn write_fixed(&mut self, name: &str, kind: FieldKind, bytes: &[u8]) -> Result<()> {
        let field = self.descriptor(name, kind)?;
        let position = self.fixed_position(&field);
        self.out.patch_bytes(position, bytes)?;
        self.mark(name);
        Ok(())
    }

    fn put_decimal(out: &mut ObjectDataOutput, value: Decimal) -> Result<()> {
        out.write_int(value.scale() as i32)?;
        out.write_bytes(&value.mantissa().to_be_bytes())
    }

    fn put_time(out: &mut ObjectDataOutput, value: NaiveTime) -> Result<()> {
        out.write_byte(value.hour() as i8)?;
        out.write_byte(value.minute() as i8)?;
        out.write_byte(value.second() as i8)?;
        out.write_int(value.nanosecond() as i32)
    }

    fn put_date(out: &mut ObjectDataOutput, value: NaiveDate) -> Result<()> {
        out.write_int(value.year())?;
        out.write_byte(value.month() as i8)?;
        out.write_byte(value.day() as i8)
    }

    fn put_timestamp(out: &mut ObjectDataOutput, value: NaiveDateTime) -> Result<()> {
        Self::put_date(out, value.date())?;
        Self::put_time(out, value.time())
    }

    fn put_timestamp_with_timezone(
        out: &mut ObjectDataOutput,
        value: DateTime<FixedOffset>,
    ) -> Result<()> {
        Self::put_timestamp(out, value.naive_local())?;
        out.write_int(value.offset().local_minus_utc())
    }

    /// Writes an optional variable-size payload via `encode`.
    fn write_var<F>(&mut self, name: &str, kind: FieldKind, present: bool, encode: F) -> Result<()>
    where
        F: FnOnce(&mut ObjectDataOutput) -> Result<()>,
    {
        let field = self.descriptor(name, kind)?;
        if present {
            self.begin_var(&field);
            encode(self.out)?;
        }
        self.mark(name);
        Ok(())
    }

    fn write_primitive_array<T, F>(
        &mut self,
        name: &str,
        kind: FieldKind,
        value: Option<&[T]>,
        mut encode: F,
    ) -> Result<()>
    where
        T: Copy,
        F: FnMut(&mut ObjectDataOutput, T) -> Result<()>,
    {
        let field = self.descriptor(name, kind)?;
        if let Some(items) = value {
            self.begin_var(&field);
            self.out.write_int(items.len() as i32)?;
            for &item in items {
                encode(self.out, item)?;
            }
        }
        self.mark(name);
        Ok(())
    }

    fn write_nullable_array<T, F>(
        &mut self,
        name: &str,
        kind: FieldKind,
        value: Option<&[Option<T>]>,
        mut encode: F,
    ) -> Result<()>
    where
        T: Copy,
        F: FnMut(&mut ObjectDataOutput, T) -> Result<()>,
    {
        let field = self.descriptor(name, kind)?;
        if let Some(items) = value {
            self.begin_var(&field);
            self.out.write_int(items.len() as i32)?;
            for item in items {
                match item {
                    Some(v) => {
                        self.out.write_bool(true)?;
                        encode(self.out, *v)?;
                    }
                    None => self.out.write_bool(false)?,
                }
            }
        }
        self.mark(name);
        Ok(())
    }

    /// Writes a dynamically typed field value, dispatching on its kind.
    pub(crate) fn write_value(&mut self, name: &str, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::Boolean(v) => self.write_boolean(name, *v),
            FieldValue::Int8(v) => self.write_int8(name, *v),
            FieldValue::Int16(v) => self.write_int16(name, *v),
            FieldValue::Int32(v) => self.write_int32(name, *v),
            FieldValue::Int64(v) => self.write_int64(name, *v),
            FieldValue::Float32(v) => self.write_float32(name, *v),
            FieldValue::Float64(v) => self.write_float64(name, *v),
            FieldValue::String(v) => self.write_string(name, v.as_deref()),
            FieldValue::Decimal(v) => self.write_decimal(name, *v),
            FieldValue::Time(v) => self.write_time(name, *v),
            FieldValue::Date(v) => self.write_date(name, *v),
            FieldValue::Timestamp(v) => self.write_timestamp(name, *v),
            FieldValue::TimestampWithTimezone(v) => {
                self.write_timestamp_with_timezone(name, *v)
            }
            FieldValue::Record(v) => self.write_record(name, v.as_ref()),
            FieldValue::ArrayOfBoolean(v) => self.write_array_of_boolean(name, v.as_deref()),
            FieldValue::ArrayOfInt8(v) => self.write_array_of_int8(name, v.as_deref()),
            FieldValue::ArrayOfInt16(v) => self.write_array_of_int16(name, v.as_deref()),
            FieldValue::ArrayOfInt32(v) => self.write_array_of_int32(name, v.as_deref()),
            FieldValue::ArrayOfInt64(v) => self.write_array_of_int64(name, v.as_deref()),
            FieldValue::ArrayOfFloat32(v) => self.write_array_of_float32(name, v.as_deref()),
            FieldValue::ArrayOfFloat64(v) => self.write_array_of_float64(name, v.as_deref()),
            FieldValue::ArrayOfString(v) => self.write_array_of_string(name, v.as_deref()),
            FieldValue::ArrayOfDecimal(v) => self.write_array_of_decimal(name, v.as_deref()),
            FieldValue::ArrayOfTime(v) => self.write_array_of_time(name, v.as_deref()),
            FieldValue::ArrayOfDate(v) => self.write_array_of_date(name, v.as_deref()),
            FieldValue::ArrayOfTimestamp(v) => self.write_array_of_timestamp(name, v.as_deref()),
            FieldValue::ArrayOfTimestampWithTimezone(v) => {
                self.write_array_of_timestamp_with_timezone(name, v.as_deref())
            }
            FieldValue::ArrayOfRecord(v) => self.write_record_array(name, v.as_deref()),
        }
    }

    fn write_record(&mut self, name: &str, value: Option<&GenericRecord>) -> Result<()> {
        let field = self.descriptor(name, FieldKind::Compact)?;
        if let Some(record) = value {
            self.begin_var(&field);
            write_nested_generic_record(self.out, self.session, record)?;
        }
        self.mark(name);
        Ok(())
    }

    fn write_record_array(
        &mut self,
        name: &str,
        value: Option<&[Option<GenericRecord>]>,
    ) -> Result<()> {
        let field = self.descriptor(name, FieldKind::ArrayOfCompact)?;
        if let Some(items) = value {
            self.begin_var(&field);
            self.out.write_int(items.len() as i32)?;
            for item in items {
                match item {
                    Some(record) => {
                        self.out.write_bool(true)?;
                        write_nested_generic_record(self.out, self.session, record)?;
                    }
                    None => self.out.write_bool(false)?,
                }
            }
        }
        self.mark(name);
        Ok(())
    }
}

impl CompactWriter for DefaultCompactWriter<'_> {
    fn write_boolean(&mut self, name: &str, value: bool) -> Result<()> {
        let field = self.descriptor(name, FieldKind::Boolean)?;
        let position = self.fixed_position(&field);
        self.out.set_bit(position, field.bit_offset() as u8, value)?;
        self.mark(name);
        Ok(())
    }

    fn write_int8(&mut self, name: &str, value: i8) -> Result<()> {
        self.write_fixed(name, FieldKind::Int8, &value.to_be_bytes())
    }

    fn write_int16(&mut self, name: &str, value: i16) -> Result<()> {
        self.write_fixed(name, FieldKind::Int16, &value.to_be_bytes())
    }

    fn write_int32(&mut self, name: &str, value: i32) -> Result<()> {
        self.write_fixed(name, FieldKind::Int32, &value.to_be_bytes())
    }

    fn write_int64(&mut self, name: &str, value: i64) -> Result<()> {
        self.write_fixed(name, FieldKind::Int64, &value.to_be_bytes())
    }

    fn write_float32(&mut self, name: &str, value: f32) -> Result<()> {
        self.write_fixed(name, FieldKind::Float32, &value.to_be_bytes())
    }

    fn write_float64(&mut self, name: &str, value: f64) -> Result<()> {
        self.write_fixed(name, FieldKind::Float64, &value.to_be_bytes())
    }

    fn write_string(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        self.write_var(name, FieldKind::String, value.is_some(), |out| match value {
            Some(s) => out.write_string(s),
            None => Ok(()),
        })
    }

    fn write_decimal(&mut self, name: &str, value: Option<Decimal>) -> Result<()> {
        self.write_var(name, FieldKind::Decimal, value.is_some(), |out| match value {
            Some(v) => Self::put_decimal(out, v),
            None => Ok(()),
        })
    }

    fn write_time(&mut self, name: &str, value: Option<NaiveTime>) -> Result<()> {
        self.write_var(name, FieldKind::Time, value.is_some(), |out| match value {
            Some(v) => Self::put_time(out, v),
            None => Ok(()),
        })
    }

    fn write_date(&mut self, name: &str, value: Option<NaiveDate>) -> Result<()> {
        self.write_var(name, FieldKind::Date, value.is_some(), |out| match value {
            Some(v) => Self::put_date(out, v),
            None => Ok(()),
        })
    }

    fn write_timestamp(&mut self, name: &str, value: Option<NaiveDateTime>) -> Result<()> {
        self.write_var(name, FieldKind::Timestamp, value.is_some(), |out| match value {
            Some(v) => Self::put_timestamp(out, v),
            None => Ok(()),
        })
    }

    fn write_timestamp_with_timezone(
        &mut self,
        name: &str,
        value: Option<DateTime<FixedOffset>>,
    ) -> Result<()> {
        self.write_var(
            name,
            FieldKind::TimestampWithTimezone,
            value.is_some(),
            |out| match value {
                Some(v) => Self::put_timestamp_with_timezone(out, v),
                None => Ok(()),
            },
        )
    }

    fn write_compact<T: Compact>(&mut self, name: &str, value: Option<&T>) -> Result<()> {
        let field = self.descriptor(name, FieldKind::Compact)?;
        if let Some(nested) = value {
            self.begin_var(&field);
            write_nested_object(self.out, self.session, nested)?;
        }
        self.mark(name);
        Ok(())
    }

    fn write_array_of_boolean(&mut self, name: &str, value: Option<&[bool]>) -> Result<()> {
        self.write_primitive_array(name, FieldKind::ArrayOfBoolean, value, |out, v| {
            out.write_bool(v)
        })
    }

    fn write_array_of_int8(&mut self, name: &str, value: Option<&[i8]>) -> Result<()> {
        self.write_primitive_array(name, FieldKind::ArrayOfInt8, value, |out, v| {
            out.write_byte(v)
        })
    }

    fn write_array_of_int16(&mut self, name: &str, value: Option<&[i16]>) -> Result<()> {
        self.write_primitive_array(name, FieldKind::ArrayOfInt16, value, |out, v| {
            out.write_short(v)
        })
    }

    fn write_array_of_int32(&mut self, name: &str, value: Option<&[i32]>) -> Result<()> {
        self.write_primitive_array(name, FieldKind::ArrayOfInt32, value, |out, v| {
            out.write_int(v)
        })
    }

    fn write_array_of_int64(&mut self, name: &str, value: Option<&[i64]>) -> Result<()> {
        self.write_primitive_array(name, FieldKind::ArrayOfInt64, value, |out, v| {
            out.write_long(v)
        })
    }

    fn write_array_of_float32(&mut self, name: &str, value: Option<&[f32]>) -> Result<()> {
        self.write_primitive_array(name, FieldKind::ArrayOfFloat32, value, |out, v| {
            out.write_float(v)
        })
    }

    fn write_array_of_float64(&mut self, name: &str, value: Option<&[f64]>) -> Result<()> {
        self.write_primitive_array(name, FieldKind::ArrayOfFloat64, value, |out, v| {
            out.write_double(v)
        })
    }

    fn write_array_of_string(
        &mut self,
        name: &str,
        value: Option<&[Option<String>]>,
    ) -> Result<()> {
        let field = self.descriptor(name, FieldKind::ArrayOfString)?;
        if let Some(items) = value {
            self.begin_var(&field);
            self.out.write_int(items.len() as i32)?;
            for item in items {
                match item {
                    Some(s) => {
                        self.out.write_bool(true)?;
                        self.out.write_string(s)?;
                    }
                    None => self.out.write_bool(false)?,
                }
            }
        }
        self.mark(name);
        Ok(())
    }

    fn write_array_of_decimal(
        &mut self,
        name: &str,
        value: Option<&[Option<Decimal>]>,
    ) -> Result<()> {
        self.write_nullable_array(name, FieldKind::ArrayOfDecimal, value, Self::put_decimal)
    }

    fn write_array_of_time(
        &mut self,
        name: &str,
        value: Option<&[Option<NaiveTime>]>,
    ) -> Result<()> {
        self.write_nullable_array(name, FieldKind::ArrayOfTime, value, Self::put_time)
    }

    fn write_array_of_date(
        &mut self,
        name: &str,
        value: Option<&[Option<NaiveDate>]>,
    ) -> Result<()> {
        self.write_nullable_array(name, FieldKind::ArrayOfDate, value, Self::put_date)
    }

    fn write_array_of_timestamp(
        &mut self,
        name: &str,
        value: Option<&[Option<NaiveDateTime>]>,
    ) -> Result<()> {
        self.write_nullable_array(name, FieldKind::ArrayOfTimestamp, value, Self::put_timestamp)
    }

    fn write_array_of_timestamp_with_timezone(
        &mut self,
        name: &str,
        value: Option<&[Option<DateTime<FixedOffset>>]>,
    ) -> Result<()> {
        self.write_nullable_array(
            name,
            FieldKind::ArrayOfTimestampWithTimezone,
            value,
            Self::put_timestamp_with_timezone,
        )
    }

    fn write_array_of_compact<T: Compact>(
        &mut self,
        name: &str,
        value: Option<&[T]>,
    ) -> Result<()> {
        let field = self.descriptor(name, FieldKind::ArrayOfCompact)?;
        if let Some(items) = value {
            self.begin_var(&field);
            self.out.write_int(items.len() as i32)?;
            for item in items {
                self.out.write_bool(true)?;
                write_nested_object(self.out, self.session, item)?;
            }
        }
        self.mark(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::compact::InMemorySchemaCatalog;

    struct Sample {
        flag: bool,
        count: i32,
        label: Option<String>,
    }

    impl Compact for Sample {
        fn type_name() -> &'static str {
            "test.Sample"
        }

        fn write<W: CompactWriter>(&self, writer: &mut W) -> Result<()> {
            writer.write_boolean("flag", self.flag)?;
            writer.write_int32("count", self.count)?;
            writer.write_string("label", self.label.as_deref())?;
            Ok(())
        }

        fn read<R: super::super::CompactReader>(reader: &mut R) -> Result<Self> {
            Ok(Self {
                flag: reader.read_boolean("flag")?,
                count: reader.read_int32("count")?,
                label: reader.read_string("label")?,
            })
        }
    }

    fn session() -> WriteSession {
        WriteSession::reference(
            Arc::new(TypeRegistry::new()),
            Arc::new(InMemorySchemaCatalog::new()),
        )
    }

    #[test]
    fn collector_records_fields_in_write_order() {
        let mut collector = SchemaCollector::new();
        let sample = Sample {
            flag: true,
            count: 3,
            label: None,
        };
        sample.write(&mut collector).unwrap();
        let fields = collector.into_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name(), "flag");
        assert_eq!(fields[0].kind(), FieldKind::Boolean);
        assert_eq!(fields[2].kind(), FieldKind::String);
    }

    #[test]
    fn collector_rejects_duplicate_names() {
        let mut collector = SchemaCollector::new();
        collector.write_int32("x", 1).unwrap();
        let err = collector.write_int64("x", 2).unwrap_err();
        assert!(matches!(err, CompactError::DuplicateFieldName { .. }));
    }

    #[test]
    fn record_layout_has_id_fixed_region_and_offset_table() {
        let mut session = session();
        let mut out = ObjectDataOutput::new();
        let sample = Sample {
            flag: true,
            count: 7,
            label: Some("ok".to_string()),
        };
        write_object(&mut out, &mut session, &sample).unwrap();
        let bytes = out.into_bytes();
        // id(8) + count(4) + flag bits(1) + "ok" payload(4 + 2) + table(4)
        assert_eq!(bytes.len(), 23);
        assert_eq!(&bytes[8..12], &7i32.to_be_bytes());
        assert_eq!(bytes[12], 0b0000_0001);
        // label offset points just past the fixed region
        assert_eq!(&bytes[19..23], &13i32.to_be_bytes());
    }

    #[test]
    fn null_var_field_gets_negative_offset() {
        let mut session = session();
        let mut out = ObjectDataOutput::new();
        let sample = Sample {
            flag: false,
            count: 0,
            label: None,
        };
        write_object(&mut out, &mut session, &sample).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 17);
        assert_eq!(&bytes[13..17], &(-1i32).to_be_bytes());
    }

    #[test]
    fn missing_field_reported_in_name_order() {
        struct Partial;
        impl Compact for Partial {
            fn type_name() -> &'static str {
                "test.Sample"
            }
            fn write<W: CompactWriter>(&self, writer: &mut W) -> Result<()> {
                writer.write_int32("count", 1)
            }
            fn read<R: super::super::CompactReader>(_reader: &mut R) -> Result<Self> {
                Ok(Self)
            }
        }

        let mut session = session();
        let schema = Arc::new(
            Schema::new(
                "test.Sample",
                vec![
                    FieldDescriptor::new("flag", FieldKind::Boolean),
                    FieldDescriptor::new("count", FieldKind::Int32),
                    FieldDescriptor::new("label", FieldKind::String),
                ],
            )
            .unwrap(),
        );
        let mut out = ObjectDataOutput::new();
        let mut writer = DefaultCompactWriter::begin(&mut out, &mut session, schema).unwrap();
        Partial.write(&mut writer).unwrap();
        let err = writer.end().unwrap_err();
        assert!(matches!(err, CompactError::MissingField { name } if name == "flag"));
    }

    #[test]
    fn duplicate_write_rejected() {
        let mut session = session();
        let schema = Arc::new(
            Schema::new(
                "test.One",
                vec![FieldDescriptor::new("x", FieldKind::Int32)],
            )
            .unwrap(),
        );
        let mut out = ObjectDataOutput::new();
        let mut writer = DefaultCompactWriter::begin(&mut out, &mut session, schema).unwrap();
        writer.write_int32("x", 1).unwrap();
        let err = writer.write_int32("x", 2).unwrap_err();
        assert!(matches!(err, CompactError::DuplicateField { .. }));
    }

    #[test]
    fn wrong_kind_rejected() {
        let mut session = session();
        let schema = Arc::new(
            Schema::new(
                "test.One",
                vec![FieldDescriptor::new("x", FieldKind::Int32)],
            )
            .unwrap(),
        );
        let mut out = ObjectDataOutput::new();
        let mut writer = DefaultCompactWriter::begin(&mut out, &mut session, schema).unwrap();
        let err = writer.write_int64("x", 1).unwrap_err();
        assert!(matches!(err, CompactError::TypeMismatch { .. }));
        let err = writer.write_int32("y", 1).unwrap_err();
        assert!(matches!(err, CompactError::Serialization(_)));
    }

    #[test]
    fn reference_mode_publishes_schema_to_catalog() {
        let catalog = Arc::new(InMemorySchemaCatalog::new());
        let registry = Arc::new(TypeRegistry::new());
        let mut session = WriteSession::reference(registry, Arc::clone(&catalog) as _);
        let mut out = ObjectDataOutput::new();
        let sample = Sample {
            flag: false,
            count: 1,
            label: None,
        };
        write_object(&mut out, &mut session, &sample).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(session.touched_schemas().is_empty());
    }

    #[test]
    fn embedded_mode_collects_touched_schemas() {
        let catalog = Arc::new(InMemorySchemaCatalog::new());
        let registry = Arc::new(TypeRegistry::new());
        let mut session = WriteSession::embedded(registry, Arc::clone(&catalog) as _);
        let mut out = ObjectDataOutput::new();
        let sample = Sample {
            flag: false,
            count: 1,
            label: None,
        };
        write_object(&mut out, &mut session, &sample).unwrap();
        write_object(&mut out, &mut session, &sample).unwrap();
        assert_eq!(session.touched_schemas().len(), 1);
    }
}
