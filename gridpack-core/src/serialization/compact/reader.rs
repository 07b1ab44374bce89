//! Compact record decoders.
//!
//! Reads are lazy and positional: a record is kept as its raw byte slice
//! and each field access locates its bytes through the schema layout.
//! Fields defined by the reader's expectations but absent from the writer
//! schema decode to kind defaults, which is what makes old records
//! readable by new code.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::{CompactError, Result};
use crate::serialization::{DataInput, ObjectDataInput};

use super::serializer::LazySchemaReader;
use super::{Compact, FieldDescriptor, FieldKind, Schema, SchemaCatalog};

/// Field-by-field reader interface implemented by compact decoders.
///
/// Accessing a field the writer schema does not define yields the kind's
/// default (`false`, zero, or `None`); accessing one with the wrong kind
/// is a [`CompactError::TypeMismatch`].
#[allow(missing_docs)]
pub trait CompactReader {
    /// Returns the writer schema of the record being read.
    fn schema(&self) -> &Schema;
    fn read_boolean(&mut self, name: &str) -> Result<bool>;
    fn read_int8(&mut self, name: &str) -> Result<i8>;
    fn read_int16(&mut self, name: &str) -> Result<i16>;
    fn read_int32(&mut self, name: &str) -> Result<i32>;
    fn read_int64(&mut self, name: &str) -> Result<i64>;
    fn read_float32(&mut self, name: &str) -> Result<f32>;
    fn read_float64(&mut self, name: &str) -> Result<f64>;
    fn read_string(&mut self, name: &str) -> Result<Option<String>>;
    fn read_decimal(&mut self, name: &str) -> Result<Option<Decimal>>;
    fn read_time(&mut self, name: &str) -> Result<Option<NaiveTime>>;
    fn read_date(&mut self, name: &str) -> Result<Option<NaiveDate>>;
    fn read_timestamp(&mut self, name: &str) -> Result<Option<NaiveDateTime>>;
    fn read_timestamp_with_timezone(
        &mut self,
        name: &str,
    ) -> Result<Option<DateTime<FixedOffset>>>;
    /// Reads a nested compact record.
    fn read_compact<T: Compact>(&mut self, name: &str) -> Result<Option<T>>
    where
        Self: Sized;
    fn read_array_of_boolean(&mut self, name: &str) -> Result<Option<Vec<bool>>>;
    fn read_array_of_int8(&mut self, name: &str) -> Result<Option<Vec<i8>>>;
    fn read_array_of_int16(&mut self, name: &str) -> Result<Option<Vec<i16>>>;
    fn read_array_of_int32(&mut self, name: &str) -> Result<Option<Vec<i32>>>;
    fn read_array_of_int64(&mut self, name: &str) -> Result<Option<Vec<i64>>>;
    fn read_array_of_float32(&mut self, name: &str) -> Result<Option<Vec<f32>>>;
    fn read_array_of_float64(&mut self, name: &str) -> Result<Option<Vec<f64>>>;
    fn read_array_of_string(&mut self, name: &str) -> Result<Option<Vec<Option<String>>>>;
    fn read_array_of_decimal(&mut self, name: &str) -> Result<Option<Vec<Option<Decimal>>>>;
    fn read_array_of_time(&mut self, name: &str) -> Result<Option<Vec<Option<NaiveTime>>>>;
    fn read_array_of_date(&mut self, name: &str) -> Result<Option<Vec<Option<NaiveDate>>>>;
    fn read_array_of_timestamp(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Option<NaiveDateTime>>>>;
    fn read_array_of_timestamp_with_timezone(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Option<DateTime<FixedOffset>>>>>;
    /// Reads an array of nested compact records. Null elements are an
    /// error on this typed path.
    fn read_array_of_compact<T: Compact>(&mut self, name: &str) -> Result<Option<Vec<T>>>
    where
        Self: Sized;
}

/// Positional access to one record slice through its schema layout.
///
/// The slice starts at the schema id and ends after the offset table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordView<'a> {
    data: &'a [u8],
    schema: &'a Schema,
}

impl<'a> RecordView<'a> {
    pub(crate) fn new(data: &'a [u8], schema: &'a Schema) -> Result<Self> {
        let minimum = 8 + schema.fixed_size_len() + 4 * schema.var_field_count();
        if data.len() < minimum {
            return Err(CompactError::Serialization(format!(
                "truncated record for '{}': {} bytes, need at least {}",
                schema.type_name(),
                data.len(),
                minimum
            )));
        }
        Ok(Self { data, schema })
    }

    fn table_start(&self) -> usize {
        self.data.len() - 4 * self.schema.var_field_count()
    }

    fn fixed_input(&self, field: &FieldDescriptor) -> Result<ObjectDataInput<'a>> {
        let mut input = ObjectDataInput::new(self.data);
        input.set_position(8 + field.offset() as usize)?;
        Ok(input)
    }

    /// Resolves a variable-size field's payload position, or `None` for
    /// null.
    fn var_position(&self, field: &FieldDescriptor) -> Result<Option<usize>> {
        let table_start = self.table_start();
        let slot = table_start + 4 * field.index() as usize;
        let mut input = ObjectDataInput::new(self.data);
        input.set_position(slot)?;
        let offset = input.read_int()?;
        if offset < 0 {
            return Ok(None);
        }
        let position = offset as usize;
        if position < 8 + self.schema.fixed_size_len() || position > table_start {
            return Err(CompactError::Serialization(format!(
                "offset {} for field '{}' is outside the record body",
                position,
                field.name()
            )));
        }
        Ok(Some(position))
    }

    fn var_input(&self, field: &FieldDescriptor) -> Result<Option<ObjectDataInput<'a>>> {
        match self.var_position(field)? {
            Some(position) => {
                let mut input = ObjectDataInput::new(self.data);
                input.set_position(position)?;
                Ok(Some(input))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn boolean(&self, field: &FieldDescriptor) -> Result<bool> {
        let mut input = self.fixed_input(field)?;
        let byte = input.read_byte()? as u8;
        Ok((byte >> field.bit_offset() as u8) & 1 == 1)
    }

    pub(crate) fn int8(&self, field: &FieldDescriptor) -> Result<i8> {
        self.fixed_input(field)?.read_byte()
    }

    pub(crate) fn int16(&self, field: &FieldDescriptor) -> Result<i16> {
        self.fixed_input(field)?.read_short()
    }

    pub(crate) fn int32(&self, field: &FieldDescriptor) -> Result<i32> {
        self.fixed_input(field)?.read_int()
    }

    pub(crate) fn int64(&self, field: &FieldDescriptor) -> Result<i64> {
        self.fixed_input(field)?.read_long()
    }

    pub(crate) fn float32(&self, field: &FieldDescriptor) -> Result<f32> {
        self.fixed_input(field)?.read_float()
    }

    pub(crate) fn float64(&self, field: &FieldDescriptor) -> Result<f64> {
        self.fixed_input(field)?.read_double()
    }

    pub(crate) fn string(&self, field: &FieldDescriptor) -> Result<Option<String>> {
        match self.var_input(field)? {
            Some(mut input) => Ok(Some(input.read_string()?)),
            None => Ok(None),
        }
    }

    fn take_decimal(input: &mut ObjectDataInput<'_>) -> Result<Decimal> {
        let scale = input.read_int()?;
        if scale < 0 {
            return Err(CompactError::Serialization(format!(
                "negative decimal scale: {scale}"
            )));
        }
        let bytes = input.read_bytes(16)?;
        let mantissa = i128::from_be_bytes(bytes.as_slice().try_into().map_err(|_| {
            CompactError::Serialization("short decimal mantissa".to_string())
        })?);
        Decimal::try_from_i128_with_scale(mantissa, scale as u32)
            .map_err(|e| CompactError::Serialization(format!("invalid decimal: {e}")))
    }

    fn take_time(input: &mut ObjectDataInput<'_>) -> Result<NaiveTime> {
        let hour = input.read_byte()? as u32;
        let minute = input.read_byte()? as u32;
        let second = input.read_byte()? as u32;
        let nanos = input.read_int()? as u32;
        NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
            .ok_or_else(|| CompactError::Serialization("invalid time components".to_string()))
    }

    fn take_date(input: &mut ObjectDataInput<'_>) -> Result<NaiveDate> {
        let year = input.read_int()?;
        let month = input.read_byte()? as u32;
        let day = input.read_byte()? as u32;
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| CompactError::Serialization("invalid date components".to_string()))
    }

    fn take_timestamp(input: &mut ObjectDataInput<'_>) -> Result<NaiveDateTime> {
        let date = Self::take_date(input)?;
        let time = Self::take_time(input)?;
        Ok(NaiveDateTime::new(date, time))
    }

    fn take_timestamp_with_timezone(
        input: &mut ObjectDataInput<'_>,
    ) -> Result<DateTime<FixedOffset>> {
        let timestamp = Self::take_timestamp(input)?;
        let offset_seconds = input.read_int()?;
        let offset = FixedOffset::east_opt(offset_seconds).ok_or_else(|| {
            CompactError::Serialization(format!("invalid UTC offset: {offset_seconds}s"))
        })?;
        timestamp
            .and_local_timezone(offset)
            .single()
            .ok_or_else(|| CompactError::Serialization("ambiguous local timestamp".to_string()))
    }

    pub(crate) fn decimal(&self, field: &FieldDescriptor) -> Result<Option<Decimal>> {
        self.var_value(field, Self::take_decimal)
    }

    pub(crate) fn time(&self, field: &FieldDescriptor) -> Result<Option<NaiveTime>> {
        self.var_value(field, Self::take_time)
    }

    pub(crate) fn date(&self, field: &FieldDescriptor) -> Result<Option<NaiveDate>> {
        self.var_value(field, Self::take_date)
    }

    pub(crate) fn timestamp(&self, field: &FieldDescriptor) -> Result<Option<NaiveDateTime>> {
        self.var_value(field, Self::take_timestamp)
    }

    pub(crate) fn timestamp_with_timezone(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        self.var_value(field, Self::take_timestamp_with_timezone)
    }

    fn var_value<T, F>(&self, field: &FieldDescriptor, take: F) -> Result<Option<T>>
    where
        F: Fn(&mut ObjectDataInput<'_>) -> Result<T>,
    {
        match self.var_input(field)? {
            Some(mut input) => Ok(Some(take(&mut input)?)),
            None => Ok(None),
        }
    }

    /// Resolves the byte range of a nested record, or `None` for null.
    pub(crate) fn record_range(&self, field: &FieldDescriptor) -> Result<Option<(usize, usize)>> {
        match self.var_input(field)? {
            Some(mut input) => {
                let range = Self::take_record_range(&mut input)?;
                Ok(Some(range))
            }
            None => Ok(None),
        }
    }

    fn take_record_range(input: &mut ObjectDataInput<'_>) -> Result<(usize, usize)> {
        let length = input.read_int()?;
        if length < 0 {
            return Err(CompactError::Serialization(format!(
                "negative nested record length: {length}"
            )));
        }
        let start = input.position();
        input.skip(length as usize)?;
        Ok((start, start + length as usize))
    }

    fn array_count(input: &mut ObjectDataInput<'_>) -> Result<usize> {
        let count = input.read_int()?;
        if count < 0 {
            return Err(CompactError::Serialization(format!(
                "negative array length: {count}"
            )));
        }
        Ok(count as usize)
    }

    fn primitive_array<T, F>(&self, field: &FieldDescriptor, take: F) -> Result<Option<Vec<T>>>
    where
        F: Fn(&mut ObjectDataInput<'_>) -> Result<T>,
    {
        match self.var_input(field)? {
            Some(mut input) => {
                let count = Self::array_count(&mut input)?;
                let mut items = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    items.push(take(&mut input)?);
                }
                Ok(Some(items))
            }
            None => Ok(None),
        }
    }

    fn nullable_array<T, F>(
        &self,
        field: &FieldDescriptor,
        take: F,
    ) -> Result<Option<Vec<Option<T>>>>
    where
        F: Fn(&mut ObjectDataInput<'_>) -> Result<T>,
    {
        match self.var_input(field)? {
            Some(mut input) => {
                let count = Self::array_count(&mut input)?;
                let mut items = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    if input.read_bool()? {
                        items.push(Some(take(&mut input)?));
                    } else {
                        items.push(None);
                    }
                }
                Ok(Some(items))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn boolean_array(&self, field: &FieldDescriptor) -> Result<Option<Vec<bool>>> {
        self.primitive_array(field, |input| input.read_bool())
    }

    pub(crate) fn int8_array(&self, field: &FieldDescriptor) -> Result<Option<Vec<i8>>> {
        self.primitive_array(field, |input| input.read_byte())
    }

    pub(crate) fn int16_array(&self, field: &FieldDescriptor) -> Result<Option<Vec<i16>>> {
        self.primitive_array(field, |input| input.read_short())
    }

    pub(crate) fn int32_array(&self, field: &FieldDescriptor) -> Result<Option<Vec<i32>>> {
        self.primitive_array(field, |input| input.read_int())
    }

    pub(crate) fn int64_array(&self, field: &FieldDescriptor) -> Result<Option<Vec<i64>>> {
        self.primitive_array(field, |input| input.read_long())
    }

    pub(crate) fn float32_array(&self, field: &FieldDescriptor) -> Result<Option<Vec<f32>>> {
        self.primitive_array(field, |input| input.read_float())
    }

    pub(crate) fn float64_array(&self, field: &FieldDescriptor) -> Result<Option<Vec<f64>>> {
        self.primitive_array(field, |input| input.read_double())
    }

    pub(crate) fn string_array(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Vec<Option<String>>>> {
        self.nullable_array(field, |input| input.read_string())
    }

    pub(crate) fn decimal_array(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Vec<Option<Decimal>>>> {
        self.nullable_array(field, Self::take_decimal)
    }

    pub(crate) fn time_array(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Vec<Option<NaiveTime>>>> {
        self.nullable_array(field, Self::take_time)
    }

    pub(crate) fn date_array(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Vec<Option<NaiveDate>>>> {
        self.nullable_array(field, Self::take_date)
    }

    pub(crate) fn timestamp_array(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Vec<Option<NaiveDateTime>>>> {
        self.nullable_array(field, Self::take_timestamp)
    }

    pub(crate) fn timestamp_with_timezone_array(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Vec<Option<DateTime<FixedOffset>>>>> {
        self.nullable_array(field, Self::take_timestamp_with_timezone)
    }

    /// Resolves the byte ranges of a nested record array, or `None` for a
    /// null array. Null elements appear as `None` entries.
    pub(crate) fn record_array_ranges(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Vec<Option<(usize, usize)>>>> {
        match self.var_input(field)? {
            Some(mut input) => {
                let count = Self::array_count(&mut input)?;
                let mut ranges = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    if input.read_bool()? {
                        ranges.push(Some(Self::take_record_range(&mut input)?));
                    } else {
                        ranges.push(None);
                    }
                }
                Ok(Some(ranges))
            }
            None => Ok(None),
        }
    }
}

/// Per-decode state shared by a reader and its nested readers.
///
/// Resolution order is catalog first, then the embedded schema table when
/// one is present. Schemas materialized from the table are published back
/// to the catalog so later reads resolve without reparsing.
pub(crate) struct ReadSession<'a> {
    catalog: Arc<dyn SchemaCatalog>,
    lazy: Option<LazySchemaReader<'a>>,
}

impl<'a> ReadSession<'a> {
    pub(crate) fn new(catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self {
            catalog,
            lazy: None,
        }
    }

    pub(crate) fn with_lazy(catalog: Arc<dyn SchemaCatalog>, lazy: LazySchemaReader<'a>) -> Self {
        Self {
            catalog,
            lazy: Some(lazy),
        }
    }

    pub(crate) fn catalog(&self) -> &Arc<dyn SchemaCatalog> {
        &self.catalog
    }

    pub(crate) fn resolve(&mut self, schema_id: u64) -> Result<Arc<Schema>> {
        if let Some(schema) = self.catalog.get(schema_id) {
            return Ok(schema);
        }
        if let Some(lazy) = self.lazy.as_mut() {
            if let Some(schema) = lazy.get_schema(schema_id)? {
                self.catalog.put(Arc::clone(&schema))?;
                return Ok(schema);
            }
        }
        Err(CompactError::SchemaNotFound { schema_id })
    }

    /// Publishes every schema still unparsed in the embedded table.
    ///
    /// Used before handing out a generic record that may resolve nested
    /// schemas after this session's buffer is gone.
    pub(crate) fn drain_into_catalog(&mut self) -> Result<()> {
        if let Some(lazy) = self.lazy.as_mut() {
            for schema in lazy.materialize_all()? {
                self.catalog.put(schema)?;
            }
        }
        Ok(())
    }
}

/// Decodes one typed record from a slice that starts at its schema id.
pub(crate) fn read_object<'a, T: Compact>(
    data: &'a [u8],
    session: &mut ReadSession<'a>,
) -> Result<T> {
    let mut input = ObjectDataInput::new(data);
    let schema_id = input.read_u64()?;
    let schema = session.resolve(schema_id)?;
    let mut reader = DefaultCompactReader::new(data, schema, session)?;
    T::read(&mut reader)
}

/// The standard record decoder.
pub struct DefaultCompactReader<'a, 's> {
    data: &'a [u8],
    schema: Arc<Schema>,
    session: &'s mut ReadSession<'a>,
}

impl<'a, 's> DefaultCompactReader<'a, 's> {
    pub(crate) fn new(
        data: &'a [u8],
        schema: Arc<Schema>,
        session: &'s mut ReadSession<'a>,
    ) -> Result<Self> {
        RecordView::new(data, &schema)?;
        Ok(Self {
            data,
            schema,
            session,
        })
    }

    /// Looks up a field, treating absence as an evolution default.
    fn descriptor(&self, name: &str, kind: FieldKind) -> Result<Option<FieldDescriptor>> {
        match self.schema.field(name) {
            None => Ok(None),
            Some(field) if field.kind() != kind => Err(CompactError::TypeMismatch {
                name: name.to_string(),
                expected: field.kind(),
                actual: kind,
            }),
            Some(field) => Ok(Some(field.clone())),
        }
    }

    fn fixed_or<T, F>(&self, name: &str, kind: FieldKind, default: T, extract: F) -> Result<T>
    where
        F: Fn(&RecordView<'_>, &FieldDescriptor) -> Result<T>,
    {
        match self.descriptor(name, kind)? {
            Some(field) => {
                let view = RecordView::new(self.data, &self.schema)?;
                extract(&view, &field)
            }
            None => Ok(default),
        }
    }

    fn var_or_none<T, F>(&self, name: &str, kind: FieldKind, extract: F) -> Result<Option<T>>
    where
        F: Fn(&RecordView<'_>, &FieldDescriptor) -> Result<Option<T>>,
    {
        match self.descriptor(name, kind)? {
            Some(field) => {
                let view = RecordView::new(self.data, &self.schema)?;
                extract(&view, &field)
            }
            None => Ok(None),
        }
    }
}

impl CompactReader for DefaultCompactReader<'_, '_> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn read_boolean(&mut self, name: &str) -> Result<bool> {
        self.fixed_or(name, FieldKind::Boolean, false, |v, f| v.boolean(f))
    }

    fn read_int8(&mut self, name: &str) -> Result<i8> {
        self.fixed_or(name, FieldKind::Int8, 0, |v, f| v.int8(f))
    }

    fn read_int16(&mut self, name: &str) -> Result<i16> {
        self.fixed_or(name, FieldKind::Int16, 0, |v, f| v.int16(f))
    }

    fn read_int32(&mut self, name: &str) -> Result<i32> {
        self.fixed_or(name, FieldKind::Int32, 0, |v, f| v.int32(f))
    }

    fn read_int64(&mut self, name: &str) -> Result<i64> {
        self.fixed_or(name, FieldKind::Int64, 0, |v, f| v.int64(f))
    }

    fn read_float32(&mut self, name: &str) -> Result<f32> {
        self.fixed_or(name, FieldKind::Float32, 0.0, |v, f| v.float32(f))
    }

    fn read_float64(&mut self, name: &str) -> Result<f64> {
        self.fixed_or(name, FieldKind::Float64, 0.0, |v, f| v.float64(f))
    }

    fn read_string(&mut self, name: &str) -> Result<Option<String>> {
        self.var_or_none(name, FieldKind::String, |v, f| v.string(f))
    }

    fn read_decimal(&mut self, name: &str) -> Result<Option<Decimal>> {
        self.var_or_none(name, FieldKind::Decimal, |v, f| v.decimal(f))
    }

    fn read_time(&mut self, name: &str) -> Result<Option<NaiveTime>> {
        self.var_or_none(name, FieldKind::Time, |v, f| v.time(f))
    }

    fn read_date(&mut self, name: &str) -> Result<Option<NaiveDate>> {
        self.var_or_none(name, FieldKind::Date, |v, f| v.date(f))
    }

    fn read_timestamp(&mut self, name: &str) -> Result<Option<NaiveDateTime>> {
        self.var_or_none(name, FieldKind::Timestamp, |v, f| v.timestamp(f))
    }

    fn read_timestamp_with_timezone(
        &mut self,
        name: &str,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        self.var_or_none(name, FieldKind::TimestampWithTimezone, |v, f| {
            v.timestamp_with_timezone(f)
        })
    }

    fn read_compact<T: Compact>(&mut self, name: &str) -> Result<Option<T>> {
        let Some(field) = self.descriptor(name, FieldKind::Compact)? else {
            return Ok(None);
        };
        let view = RecordView::new(self.data, &self.schema)?;
        let Some((start, end)) = view.record_range(&field)? else {
            return Ok(None);
        };
        let data = self.data;
        read_object::<T>(&data[start..end], self.session).map(Some)
    }

    fn read_array_of_boolean(&mut self, name: &str) -> Result<Option<Vec<bool>>> {
        self.var_or_none(name, FieldKind::ArrayOfBoolean, |v, f| v.boolean_array(f))
    }

    fn read_array_of_int8(&mut self, name: &str) -> Result<Option<Vec<i8>>> {
        self.var_or_none(name, FieldKind::ArrayOfInt8, |v, f| v.int8_array(f))
    }

    fn read_array_of_int16(&mut self, name: &str) -> Result<Option<Vec<i16>>> {
        self.var_or_none(name, FieldKind::ArrayOfInt16, |v, f| v.int16_array(f))
    }

    fn read_array_of_int32(&mut self, name: &str) -> Result<Option<Vec<i32>>> {
        self.var_or_none(name, FieldKind::ArrayOfInt32, |v, f| v.int32_array(f))
    }

    fn read_array_of_int64(&mut self, name: &str) -> Result<Option<Vec<i64>>> {
        self.var_or_none(name, FieldKind::ArrayOfInt64, |v, f| v.int64_array(f))
    }

    fn read_array_of_float32(&mut self, name: &str) -> Result<Option<Vec<f32>>> {
        self.var_or_none(name, FieldKind::ArrayOfFloat32, |v, f| v.float32_array(f))
    }

    fn read_array_of_float64(&mut self, name: &str) -> Result<Option<Vec<f64>>> {
        self.var_or_none(name, FieldKind::ArrayOfFloat64, |v, f| v.float64_array(f))
    }

    fn read_array_of_string(&mut self, name: &str) -> Result<Option<Vec<Option<String>>>> {
        self.var_or_none(name, FieldKind::ArrayOfString, |v, f| v.string_array(f))
    }

    fn read_array_of_decimal(&mut self, name: &str) -> Result<Option<Vec<Option<Decimal>>>> {
        self.var_or_none(name, FieldKind::ArrayOfDecimal, |v, f| v.decimal_array(f))
    }

    fn read_array_of_time(&mut self, name: &str) -> Result<Option<Vec<Option<NaiveTime>>>> {
        self.var_or_none(name, FieldKind::ArrayOfTime, |v, f| v.time_array(f))
    }

    fn read_array_of_date(&mut self, name: &str) -> Result<Option<Vec<Option<NaiveDate>>>> {
        self.var_or_none(name, FieldKind::ArrayOfDate, |v, f| v.date_array(f))
    }

    fn read_array_of_timestamp(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Option<NaiveDateTime>>>> {
        self.var_or_none(name, FieldKind::ArrayOfTimestamp, |v, f| v.timestamp_array(f))
    }

    fn read_array_of_timestamp_with_timezone(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Option<DateTime<FixedOffset>>>>> {
        self.var_or_none(name, FieldKind::ArrayOfTimestampWithTimezone, |v, f| {
            v.timestamp_with_timezone_array(f)
        })
    }

    fn read_array_of_compact<T: Compact>(&mut self, name: &str) -> Result<Option<Vec<T>>> {
        let Some(field) = self.descriptor(name, FieldKind::ArrayOfCompact)? else {
            return Ok(None);
        };
        let view = RecordView::new(self.data, &self.schema)?;
        let Some(ranges) = view.record_array_ranges(&field)? else {
            return Ok(None);
        };
        let data = self.data;
        let mut items = Vec::with_capacity(ranges.len());
        for range in ranges {
            let Some((start, end)) = range else {
                return Err(CompactError::Serialization(format!(
                    "null element in compact array field '{name}'"
                )));
            };
            items.push(read_object::<T>(&data[start..end], self.session)?);
        }
        Ok(Some(items))
    }
}
