//! Schema-driven access to records without a registered Rust type.
//!
//! A [`GenericRecord`] has two representations. Records decoded from the
//! wire keep their raw bytes and resolve each field on access; records
//! assembled by a [`GenericRecordBuilder`] or [`GenericRecordCloner`]
//! hold their values in a map. Both expose the same typed accessors and
//! can be written back out.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::{CompactError, Result};
use crate::serialization::{DataInput, ObjectDataInput};

use super::reader::RecordView;
use super::{FieldDescriptor, FieldKind, Schema, SchemaCatalog};

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum FieldValue {
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(Option<String>),
    Decimal(Option<Decimal>),
    Time(Option<NaiveTime>),
    Date(Option<NaiveDate>),
    Timestamp(Option<NaiveDateTime>),
    TimestampWithTimezone(Option<DateTime<FixedOffset>>),
    Record(Option<GenericRecord>),
    ArrayOfBoolean(Option<Vec<bool>>),
    ArrayOfInt8(Option<Vec<i8>>),
    ArrayOfInt16(Option<Vec<i16>>),
    ArrayOfInt32(Option<Vec<i32>>),
    ArrayOfInt64(Option<Vec<i64>>),
    ArrayOfFloat32(Option<Vec<f32>>),
    ArrayOfFloat64(Option<Vec<f64>>),
    ArrayOfString(Option<Vec<Option<String>>>),
    ArrayOfDecimal(Option<Vec<Option<Decimal>>>),
    ArrayOfTime(Option<Vec<Option<NaiveTime>>>),
    ArrayOfDate(Option<Vec<Option<NaiveDate>>>),
    ArrayOfTimestamp(Option<Vec<Option<NaiveDateTime>>>),
    ArrayOfTimestampWithTimezone(Option<Vec<Option<DateTime<FixedOffset>>>>),
    ArrayOfRecord(Option<Vec<Option<GenericRecord>>>),
}

impl FieldValue {
    /// Returns the field kind this value carries.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Boolean(_) => FieldKind::Boolean,
            FieldValue::Int8(_) => FieldKind::Int8,
            FieldValue::Int16(_) => FieldKind::Int16,
            FieldValue::Int32(_) => FieldKind::Int32,
            FieldValue::Int64(_) => FieldKind::Int64,
            FieldValue::Float32(_) => FieldKind::Float32,
            FieldValue::Float64(_) => FieldKind::Float64,
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Decimal(_) => FieldKind::Decimal,
            FieldValue::Time(_) => FieldKind::Time,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::Timestamp(_) => FieldKind::Timestamp,
            FieldValue::TimestampWithTimezone(_) => FieldKind::TimestampWithTimezone,
            FieldValue::Record(_) => FieldKind::Compact,
            FieldValue::ArrayOfBoolean(_) => FieldKind::ArrayOfBoolean,
            FieldValue::ArrayOfInt8(_) => FieldKind::ArrayOfInt8,
            FieldValue::ArrayOfInt16(_) => FieldKind::ArrayOfInt16,
            FieldValue::ArrayOfInt32(_) => FieldKind::ArrayOfInt32,
            FieldValue::ArrayOfInt64(_) => FieldKind::ArrayOfInt64,
            FieldValue::ArrayOfFloat32(_) => FieldKind::ArrayOfFloat32,
            FieldValue::ArrayOfFloat64(_) => FieldKind::ArrayOfFloat64,
            FieldValue::ArrayOfString(_) => FieldKind::ArrayOfString,
            FieldValue::ArrayOfDecimal(_) => FieldKind::ArrayOfDecimal,
            FieldValue::ArrayOfTime(_) => FieldKind::ArrayOfTime,
            FieldValue::ArrayOfDate(_) => FieldKind::ArrayOfDate,
            FieldValue::ArrayOfTimestamp(_) => FieldKind::ArrayOfTimestamp,
            FieldValue::ArrayOfTimestampWithTimezone(_) => {
                FieldKind::ArrayOfTimestampWithTimezone
            }
            FieldValue::ArrayOfRecord(_) => FieldKind::ArrayOfCompact,
        }
    }
}

#[derive(Clone)]
enum Repr {
    Decoded {
        data: Bytes,
        catalog: Arc<dyn SchemaCatalog>,
    },
    Built {
        values: HashMap<String, FieldValue>,
    },
}

/// A record accessed through its schema rather than a Rust type.
#[derive(Clone)]
pub struct GenericRecord {
    schema: Arc<Schema>,
    repr: Repr,
}

macro_rules! record_getters {
    ($(($fn_name:ident, $variant:ident, $ty:ty, $kind:expr)),* $(,)?) => {
        $(
            #[doc = concat!("Reads a `", stringify!($variant), "` field by name.")]
            pub fn $fn_name(&self, name: &str) -> Result<$ty> {
                match self.get_value(name)? {
                    FieldValue::$variant(value) => Ok(value),
                    other => Err(CompactError::TypeMismatch {
                        name: name.to_string(),
                        expected: other.kind(),
                        actual: $kind,
                    }),
                }
            }
        )*
    };
}

impl GenericRecord {
    pub(crate) fn decoded(
        schema: Arc<Schema>,
        data: Bytes,
        catalog: Arc<dyn SchemaCatalog>,
    ) -> Self {
        Self {
            schema,
            repr: Repr::Decoded { data, catalog },
        }
    }

    pub(crate) fn built(schema: Arc<Schema>, values: HashMap<String, FieldValue>) -> Self {
        Self {
            schema,
            repr: Repr::Built { values },
        }
    }

    /// Starts building a record for the given schema.
    pub fn builder(schema: Arc<Schema>) -> GenericRecordBuilder {
        GenericRecordBuilder::new(schema)
    }

    /// Starts a copy of this record with selected fields overridden.
    pub fn clone_builder(&self) -> GenericRecordCloner {
        GenericRecordCloner::new(self.clone())
    }

    /// Returns the record's schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the wire-level type name.
    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    /// Returns the schema fingerprint.
    pub fn schema_id(&self) -> u64 {
        self.schema.schema_id()
    }

    /// Returns true if the schema defines the given field.
    pub fn has_field(&self, name: &str) -> bool {
        self.schema.has_field(name)
    }

    /// Returns the kind of a field, if defined.
    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.schema.field(name).map(|f| f.kind())
    }

    /// Reads a field as a dynamically typed value.
    ///
    /// Unlike typed readers, a generic record never substitutes defaults:
    /// asking for a field its schema does not define is an error.
    pub fn get_value(&self, name: &str) -> Result<FieldValue> {
        let field = self.schema.field(name).ok_or_else(|| {
            CompactError::Serialization(format!(
                "record type '{}' has no field '{}'",
                self.schema.type_name(),
                name
            ))
        })?;
        match &self.repr {
            Repr::Built { values } => values.get(name).cloned().ok_or_else(|| {
                CompactError::MissingField {
                    name: name.to_string(),
                }
            }),
            Repr::Decoded { data, catalog } => {
                let view = RecordView::new(data.as_ref(), &self.schema)?;
                Self::decode_field(&view, data, catalog, field)
            }
        }
    }

    fn decode_field(
        view: &RecordView<'_>,
        data: &Bytes,
        catalog: &Arc<dyn SchemaCatalog>,
        field: &FieldDescriptor,
    ) -> Result<FieldValue> {
        Ok(match field.kind() {
            FieldKind::Boolean => FieldValue::Boolean(view.boolean(field)?),
            FieldKind::Int8 => FieldValue::Int8(view.int8(field)?),
            FieldKind::Int16 => FieldValue::Int16(view.int16(field)?),
            FieldKind::Int32 => FieldValue::Int32(view.int32(field)?),
            FieldKind::Int64 => FieldValue::Int64(view.int64(field)?),
            FieldKind::Float32 => FieldValue::Float32(view.float32(field)?),
            FieldKind::Float64 => FieldValue::Float64(view.float64(field)?),
            FieldKind::String => FieldValue::String(view.string(field)?),
            FieldKind::Decimal => FieldValue::Decimal(view.decimal(field)?),
            FieldKind::Time => FieldValue::Time(view.time(field)?),
            FieldKind::Date => FieldValue::Date(view.date(field)?),
            FieldKind::Timestamp => FieldValue::Timestamp(view.timestamp(field)?),
            FieldKind::TimestampWithTimezone => {
                FieldValue::TimestampWithTimezone(view.timestamp_with_timezone(field)?)
            }
            FieldKind::Compact => FieldValue::Record(match view.record_range(field)? {
                Some(range) => Some(Self::nested(data, catalog, range)?),
                None => None,
            }),
            FieldKind::ArrayOfBoolean => FieldValue::ArrayOfBoolean(view.boolean_array(field)?),
            FieldKind::ArrayOfInt8 => FieldValue::ArrayOfInt8(view.int8_array(field)?),
            FieldKind::ArrayOfInt16 => FieldValue::ArrayOfInt16(view.int16_array(field)?),
            FieldKind::ArrayOfInt32 => FieldValue::ArrayOfInt32(view.int32_array(field)?),
            FieldKind::ArrayOfInt64 => FieldValue::ArrayOfInt64(view.int64_array(field)?),
            FieldKind::ArrayOfFloat32 => FieldValue::ArrayOfFloat32(view.float32_array(field)?),
            FieldKind::ArrayOfFloat64 => FieldValue::ArrayOfFloat64(view.float64_array(field)?),
            FieldKind::ArrayOfString => FieldValue::ArrayOfString(view.string_array(field)?),
            FieldKind::ArrayOfDecimal => FieldValue::ArrayOfDecimal(view.decimal_array(field)?),
            FieldKind::ArrayOfTime => FieldValue::ArrayOfTime(view.time_array(field)?),
            FieldKind::ArrayOfDate => FieldValue::ArrayOfDate(view.date_array(field)?),
            FieldKind::ArrayOfTimestamp => {
                FieldValue::ArrayOfTimestamp(view.timestamp_array(field)?)
            }
            FieldKind::ArrayOfTimestampWithTimezone => FieldValue::ArrayOfTimestampWithTimezone(
                view.timestamp_with_timezone_array(field)?,
            ),
            FieldKind::ArrayOfCompact => {
                FieldValue::ArrayOfRecord(match view.record_array_ranges(field)? {
                    Some(ranges) => {
                        let mut records = Vec::with_capacity(ranges.len());
                        for range in ranges {
                            records.push(match range {
                                Some(range) => Some(Self::nested(data, catalog, range)?),
                                None => None,
                            });
                        }
                        Some(records)
                    }
                    None => None,
                })
            }
        })
    }

    fn nested(
        data: &Bytes,
        catalog: &Arc<dyn SchemaCatalog>,
        (start, end): (usize, usize),
    ) -> Result<GenericRecord> {
        let slice = data.slice(start..end);
        let schema_id = ObjectDataInput::new(&slice).read_u64()?;
        let schema = catalog
            .get(schema_id)
            .ok_or(CompactError::SchemaNotFound { schema_id })?;
        Ok(GenericRecord::decoded(schema, slice, Arc::clone(catalog)))
    }

    record_getters!(
        (get_boolean, Boolean, bool, FieldKind::Boolean),
        (get_int8, Int8, i8, FieldKind::Int8),
        (get_int16, Int16, i16, FieldKind::Int16),
        (get_int32, Int32, i32, FieldKind::Int32),
        (get_int64, Int64, i64, FieldKind::Int64),
        (get_float32, Float32, f32, FieldKind::Float32),
        (get_float64, Float64, f64, FieldKind::Float64),
        (get_string, String, Option<String>, FieldKind::String),
        (get_decimal, Decimal, Option<Decimal>, FieldKind::Decimal),
        (get_time, Time, Option<NaiveTime>, FieldKind::Time),
        (get_date, Date, Option<NaiveDate>, FieldKind::Date),
        (get_timestamp, Timestamp, Option<NaiveDateTime>, FieldKind::Timestamp),
        (
            get_timestamp_with_timezone,
            TimestampWithTimezone,
            Option<DateTime<FixedOffset>>,
            FieldKind::TimestampWithTimezone
        ),
        (get_record, Record, Option<GenericRecord>, FieldKind::Compact),
        (get_array_of_boolean, ArrayOfBoolean, Option<Vec<bool>>, FieldKind::ArrayOfBoolean),
        (get_array_of_int8, ArrayOfInt8, Option<Vec<i8>>, FieldKind::ArrayOfInt8),
        (get_array_of_int16, ArrayOfInt16, Option<Vec<i16>>, FieldKind::ArrayOfInt16),
        (get_array_of_int32, ArrayOfInt32, Option<Vec<i32>>, FieldKind::ArrayOfInt32),
        (get_array_of_int64, ArrayOfInt64, Option<Vec<i64>>, FieldKind::ArrayOfInt64),
        (get_array_of_float32, ArrayOfFloat32, Option<Vec<f32>>, FieldKind::ArrayOfFloat32),
        (get_array_of_float64, ArrayOfFloat64, Option<Vec<f64>>, FieldKind::ArrayOfFloat64),
        (
            get_array_of_string,
            ArrayOfString,
            Option<Vec<Option<String>>>,
            FieldKind::ArrayOfString
        ),
        (
            get_array_of_decimal,
            ArrayOfDecimal,
            Option<Vec<Option<Decimal>>>,
            FieldKind::ArrayOfDecimal
        ),
        (
            get_array_of_time,
            ArrayOfTime,
            Option<Vec<Option<NaiveTime>>>,
            FieldKind::ArrayOfTime
        ),
        (
            get_array_of_date,
            ArrayOfDate,
            Option<Vec<Option<NaiveDate>>>,
            FieldKind::ArrayOfDate
        ),
        (
            get_array_of_timestamp,
            ArrayOfTimestamp,
            Option<Vec<Option<NaiveDateTime>>>,
            FieldKind::ArrayOfTimestamp
        ),
        (
            get_array_of_timestamp_with_timezone,
            ArrayOfTimestampWithTimezone,
            Option<Vec<Option<DateTime<FixedOffset>>>>,
            FieldKind::ArrayOfTimestampWithTimezone
        ),
        (
            get_array_of_record,
            ArrayOfRecord,
            Option<Vec<Option<GenericRecord>>>,
            FieldKind::ArrayOfCompact
        ),
    );
}

impl fmt::Debug for GenericRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRecord")
            .field("type_name", &self.schema.type_name())
            .field("schema_id", &self.schema.schema_id())
            .finish_non_exhaustive()
    }
}

impl PartialEq for GenericRecord {
    fn eq(&self, other: &Self) -> bool {
        if self.schema.schema_id() != other.schema.schema_id() {
            return false;
        }
        self.schema.fields().all(|field| {
            matches!(
                (self.get_value(field.name()), other.get_value(field.name())),
                (Ok(a), Ok(b)) if a == b
            )
        })
    }
}

fn checked_insert(
    schema: &Schema,
    values: &mut HashMap<String, FieldValue>,
    name: &str,
    value: FieldValue,
) -> Result<()> {
    let field = schema.field(name).ok_or_else(|| {
        CompactError::Serialization(format!(
            "record type '{}' has no field '{}'",
            schema.type_name(),
            name
        ))
    })?;
    if field.kind() != value.kind() {
        return Err(CompactError::TypeMismatch {
            name: name.to_string(),
            expected: field.kind(),
            actual: value.kind(),
        });
    }
    if values.contains_key(name) {
        return Err(CompactError::DuplicateField {
            name: name.to_string(),
        });
    }
    values.insert(name.to_string(), value);
    Ok(())
}

macro_rules! record_setters {
    ($(($fn_name:ident, $variant:ident, $ty:ty)),* $(,)?) => {
        $(
            #[doc = concat!("Sets a `", stringify!($variant), "` field by name.")]
            pub fn $fn_name(mut self, name: &str, value: $ty) -> Result<Self> {
                self.set_value(name, FieldValue::$variant(value))?;
                Ok(self)
            }
        )*
    };
}

macro_rules! all_record_setters {
    () => {
        record_setters!(
            (set_boolean, Boolean, bool),
            (set_int8, Int8, i8),
            (set_int16, Int16, i16),
            (set_int32, Int32, i32),
            (set_int64, Int64, i64),
            (set_float32, Float32, f32),
            (set_float64, Float64, f64),
            (set_string, String, Option<String>),
            (set_decimal, Decimal, Option<Decimal>),
            (set_time, Time, Option<NaiveTime>),
            (set_date, Date, Option<NaiveDate>),
            (set_timestamp, Timestamp, Option<NaiveDateTime>),
            (
                set_timestamp_with_timezone,
                TimestampWithTimezone,
                Option<DateTime<FixedOffset>>
            ),
            (set_record, Record, Option<GenericRecord>),
            (set_array_of_boolean, ArrayOfBoolean, Option<Vec<bool>>),
            (set_array_of_int8, ArrayOfInt8, Option<Vec<i8>>),
            (set_array_of_int16, ArrayOfInt16, Option<Vec<i16>>),
            (set_array_of_int32, ArrayOfInt32, Option<Vec<i32>>),
            (set_array_of_int64, ArrayOfInt64, Option<Vec<i64>>),
            (set_array_of_float32, ArrayOfFloat32, Option<Vec<f32>>),
            (set_array_of_float64, ArrayOfFloat64, Option<Vec<f64>>),
            (set_array_of_string, ArrayOfString, Option<Vec<Option<String>>>),
            (set_array_of_decimal, ArrayOfDecimal, Option<Vec<Option<Decimal>>>),
            (set_array_of_time, ArrayOfTime, Option<Vec<Option<NaiveTime>>>),
            (set_array_of_date, ArrayOfDate, Option<Vec<Option<NaiveDate>>>),
            (
                set_array_of_timestamp,
                ArrayOfTimestamp,
                Option<Vec<Option<NaiveDateTime>>>
            ),
            (
                set_array_of_timestamp_with_timezone,
                ArrayOfTimestampWithTimezone,
                Option<Vec<Option<DateTime<FixedOffset>>>>
            ),
            (
                set_array_of_record,
                ArrayOfRecord,
                Option<Vec<Option<GenericRecord>>>
            ),
        );
    };
}

/// Assembles a [`GenericRecord`] field by field.
///
/// Every schema field must be set exactly once before [`build`] succeeds.
///
/// [`build`]: GenericRecordBuilder::build
#[derive(Debug)]
pub struct GenericRecordBuilder {
    schema: Arc<Schema>,
    values: HashMap<String, FieldValue>,
}

impl GenericRecordBuilder {
    /// Creates a builder for the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            values: HashMap::new(),
        }
    }

    /// Sets a field from a dynamically typed value.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> Result<()> {
        checked_insert(&self.schema, &mut self.values, name, value)
    }

    all_record_setters!();

    /// Finishes the record, failing if any schema field is unset.
    pub fn build(self) -> Result<GenericRecord> {
        for field in self.schema.fields() {
            if !self.values.contains_key(field.name()) {
                return Err(CompactError::MissingField {
                    name: field.name().to_string(),
                });
            }
        }
        Ok(GenericRecord::built(self.schema, self.values))
    }
}

/// Copies a [`GenericRecord`], overriding selected fields.
///
/// Fields not overridden are carried over from the source record, so
/// [`build`] cannot fail on missing fields.
///
/// [`build`]: GenericRecordCloner::build
#[derive(Debug)]
pub struct GenericRecordCloner {
    source: GenericRecord,
    overrides: HashMap<String, FieldValue>,
}

impl GenericRecordCloner {
    /// Creates a cloner over the given source record.
    pub fn new(source: GenericRecord) -> Self {
        Self {
            source,
            overrides: HashMap::new(),
        }
    }

    /// Overrides a field with a dynamically typed value.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> Result<()> {
        checked_insert(self.source.schema(), &mut self.overrides, name, value)
    }

    all_record_setters!();

    /// Finishes the copy, pulling unoverridden fields from the source.
    pub fn build(mut self) -> Result<GenericRecord> {
        let schema = Arc::clone(self.source.schema());
        let mut values = HashMap::with_capacity(schema.field_count());
        for field in schema.fields() {
            let value = match self.overrides.remove(field.name()) {
                Some(value) => value,
                None => self.source.get_value(field.name())?,
            };
            values.insert(field.name().to_string(), value);
        }
        Ok(GenericRecord::built(schema, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(
                "test.Person",
                vec![
                    FieldDescriptor::new("name", FieldKind::String),
                    FieldDescriptor::new("age", FieldKind::Int32),
                    FieldDescriptor::new("active", FieldKind::Boolean),
                ],
            )
            .unwrap(),
        )
    }

    fn person() -> GenericRecord {
        GenericRecord::builder(person_schema())
            .set_string("name", Some("ada".to_string()))
            .unwrap()
            .set_int32("age", 36)
            .unwrap()
            .set_boolean("active", true)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn builder_round_trips_values() {
        let record = person();
        assert_eq!(record.get_string("name").unwrap(), Some("ada".to_string()));
        assert_eq!(record.get_int32("age").unwrap(), 36);
        assert!(record.get_boolean("active").unwrap());
        assert_eq!(record.type_name(), "test.Person");
    }

    #[test]
    fn builder_rejects_unknown_field() {
        let err = GenericRecord::builder(person_schema())
            .set_int32("height", 1)
            .unwrap_err();
        assert!(matches!(err, CompactError::Serialization(_)));
    }

    #[test]
    fn builder_rejects_kind_mismatch_at_set_time() {
        let err = GenericRecord::builder(person_schema())
            .set_int64("age", 1)
            .unwrap_err();
        assert!(matches!(
            err,
            CompactError::TypeMismatch { expected: FieldKind::Int32, actual: FieldKind::Int64, .. }
        ));
    }

    #[test]
    fn builder_rejects_double_set() {
        let err = GenericRecord::builder(person_schema())
            .set_int32("age", 1)
            .unwrap()
            .set_int32("age", 2)
            .unwrap_err();
        assert!(matches!(err, CompactError::DuplicateField { name } if name == "age"));
    }

    #[test]
    fn build_fails_on_unset_field() {
        let err = GenericRecord::builder(person_schema())
            .set_int32("age", 1)
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, CompactError::MissingField { .. }));
    }

    #[test]
    fn getter_with_wrong_kind_fails() {
        let record = person();
        let err = record.get_int64("age").unwrap_err();
        assert!(matches!(
            err,
            CompactError::TypeMismatch { expected: FieldKind::Int32, actual: FieldKind::Int64, .. }
        ));
    }

    #[test]
    fn get_value_of_unknown_field_fails() {
        let record = person();
        assert!(record.get_value("height").is_err());
    }

    #[test]
    fn cloner_overrides_and_copies_forward() {
        let record = person();
        let copy = record
            .clone_builder()
            .set_int32("age", 37)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(copy.get_int32("age").unwrap(), 37);
        assert_eq!(copy.get_string("name").unwrap(), Some("ada".to_string()));
        assert!(copy.get_boolean("active").unwrap());
        // source is untouched
        assert_eq!(record.get_int32("age").unwrap(), 36);
    }

    #[test]
    fn cloner_rejects_bad_overrides() {
        let record = person();
        assert!(record
            .clone_builder()
            .set_int32("height", 1)
            .is_err());
        assert!(record
            .clone_builder()
            .set_string("age", None)
            .is_err());
        let err = record
            .clone_builder()
            .set_int32("age", 1)
            .unwrap()
            .set_int32("age", 2)
            .unwrap_err();
        assert!(matches!(err, CompactError::DuplicateField { .. }));
    }

    #[test]
    fn records_with_equal_fields_are_equal() {
        assert_eq!(person(), person());
        let other = person()
            .clone_builder()
            .set_int32("age", 1)
            .unwrap()
            .build()
            .unwrap();
        assert_ne!(person(), other);
    }

    #[test]
    fn field_kind_lookup() {
        let record = person();
        assert_eq!(record.field_kind("age"), Some(FieldKind::Int32));
        assert_eq!(record.field_kind("height"), None);
        assert!(record.has_field("name"));
    }
}
