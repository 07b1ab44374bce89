//! Registry binding wire type names to Rust types.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;

use super::reader::DefaultCompactReader;
use super::writer::SchemaCollector;
use super::{Compact, Schema};

type ReadFn =
    Box<dyn Fn(&mut DefaultCompactReader<'_, '_>) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// A monomorphized deserialization hook for one [`Compact`] type.
///
/// Registrations erase the concrete type so that a decoder can dispatch
/// on the wire-level type name alone.
pub struct TypeRegistration {
    type_name: &'static str,
    type_id: TypeId,
    read: ReadFn,
}

impl TypeRegistration {
    /// Creates a registration for `T`.
    pub fn of<T: Compact>() -> Self {
        Self {
            type_name: T::type_name(),
            type_id: TypeId::of::<T>(),
            read: Box::new(|reader| {
                let value = T::read(reader)?;
                Ok(Box::new(value) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// Returns the wire-level type name this registration decodes.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the [`TypeId`] of the registered Rust type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn read_boxed(
        &self,
        reader: &mut DefaultCompactReader<'_, '_>,
    ) -> Result<Box<dyn Any + Send + Sync>> {
        (self.read)(reader)
    }
}

impl std::fmt::Debug for TypeRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistration")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Resolves type names that have no explicit registration.
///
/// A resolver lets an application map wire names to registrations lazily,
/// for example from a plugin system. Returning `None` is not an error:
/// the decoder falls back to a generic record.
pub trait TypeResolver: Send + Sync {
    /// Produces a registration for `type_name`, or `None` if unknown.
    fn resolve(&self, type_name: &str) -> Option<Arc<TypeRegistration>>;
}

/// Thread-safe registry of [`Compact`] types and their cached schemas.
#[derive(Default)]
pub struct TypeRegistry {
    by_type: RwLock<HashMap<TypeId, Arc<TypeRegistration>>>,
    by_name: RwLock<HashMap<String, Arc<TypeRegistration>>>,
    schemas: RwLock<HashMap<TypeId, Arc<Schema>>>,
    resolver: Option<Arc<dyn TypeResolver>>,
}

impl TypeRegistry {
    /// Creates an empty registry without a resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that consults `resolver` for unknown names.
    pub fn with_resolver(resolver: Arc<dyn TypeResolver>) -> Self {
        Self {
            resolver: Some(resolver),
            ..Self::default()
        }
    }

    /// Registers `T` for decoding by its wire type name.
    ///
    /// Registering the same type twice returns the original registration.
    pub fn register<T: Compact>(&self) -> Arc<TypeRegistration> {
        if let Some(existing) = self
            .by_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
        {
            return Arc::clone(existing);
        }
        let registration = Arc::new(TypeRegistration::of::<T>());
        let registration = Arc::clone(
            self.by_type
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(TypeId::of::<T>())
                .or_insert_with(|| Arc::clone(&registration)),
        );
        self.by_name
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(registration.type_name().to_string())
            .or_insert_with(|| Arc::clone(&registration));
        tracing::debug!(type_name = T::type_name(), "type registered");
        registration
    }

    /// Looks up the registration for `T`, if any.
    pub fn registration_for<T: Compact>(&self) -> Option<Arc<TypeRegistration>> {
        self.by_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()
    }

    /// Looks up a registration by wire type name, consulting the resolver
    /// on a miss and caching its answer.
    pub fn registration_for_name(&self, type_name: &str) -> Option<Arc<TypeRegistration>> {
        if let Some(registration) = self
            .by_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
        {
            return Some(Arc::clone(registration));
        }
        let resolver = self.resolver.as_ref()?;
        let registration = resolver.resolve(type_name)?;
        let registration = Arc::clone(
            self.by_name
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(type_name.to_string())
                .or_insert_with(|| Arc::clone(&registration)),
        );
        self.by_type
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(registration.type_id())
            .or_insert_with(|| Arc::clone(&registration));
        Some(registration)
    }

    /// Returns the schema for `T`, deriving it from `value` on first use.
    ///
    /// Derivation runs the value's write function against a collector that
    /// records field names and kinds instead of bytes. The result is
    /// cached per type, so the cost is paid once. Registering the type for
    /// read-back happens here as well, so a plain write is enough to make
    /// the type round-trippable in-process.
    pub fn schema_for_value<T: Compact>(&self, value: &T) -> Result<Arc<Schema>> {
        if let Some(schema) = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
        {
            return Ok(Arc::clone(schema));
        }
        self.register::<T>();
        let mut collector = SchemaCollector::new();
        value.write(&mut collector)?;
        let schema = Arc::new(Schema::new(T::type_name(), collector.into_fields())?);
        tracing::debug!(
            type_name = T::type_name(),
            schema_id = schema.schema_id(),
            "schema derived for type"
        );
        let mut schemas = self
            .schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            schemas
                .entry(TypeId::of::<T>())
                .or_insert_with(|| schema),
        ))
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry").finish_non_exhaustive()
    }
}
