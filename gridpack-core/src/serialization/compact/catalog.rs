//! Schema storage shared between encoders and decoders.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;

use super::Schema;

/// A store of schemas keyed by their fingerprint.
///
/// Implementations must be safe to share across threads. `put` is the
/// publication point for schemas that remote readers may need to resolve;
/// `put_local` only makes a schema available to readers in this process.
/// Both are idempotent: putting a schema whose id is already present is a
/// no-op, which lets concurrent writers race without coordination.
pub trait SchemaCatalog: Send + Sync {
    /// Publishes a schema so any reader can resolve it by id.
    fn put(&self, schema: Arc<Schema>) -> Result<()>;

    /// Stores a schema for in-process readers only.
    fn put_local(&self, schema: Arc<Schema>) -> Result<()>;

    /// Resolves a schema by its fingerprint.
    fn get(&self, schema_id: u64) -> Option<Arc<Schema>>;
}

/// An in-process [`SchemaCatalog`] backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemorySchemaCatalog {
    schemas: RwLock<HashMap<u64, Arc<Schema>>>,
}

impl InMemorySchemaCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored schemas.
    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no schema has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, schema: Arc<Schema>) {
        let mut schemas = self
            .schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let schema_id = schema.schema_id();
        if schemas.insert(schema_id, schema).is_none() {
            tracing::debug!(schema_id, "schema registered in catalog");
        }
    }
}

impl SchemaCatalog for InMemorySchemaCatalog {
    fn put(&self, schema: Arc<Schema>) -> Result<()> {
        self.insert(schema);
        Ok(())
    }

    fn put_local(&self, schema: Arc<Schema>) -> Result<()> {
        self.insert(schema);
        Ok(())
    }

    fn get(&self, schema_id: u64) -> Option<Arc<Schema>> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&schema_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::compact::{FieldDescriptor, FieldKind};

    fn sample_schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(
                "test.Sample",
                vec![FieldDescriptor::new("x", FieldKind::Int32)],
            )
            .unwrap(),
        )
    }

    #[test]
    fn put_then_get_returns_same_schema() {
        let catalog = InMemorySchemaCatalog::new();
        let schema = sample_schema();
        catalog.put(schema.clone()).unwrap();
        let resolved = catalog.get(schema.schema_id()).unwrap();
        assert!(Arc::ptr_eq(&resolved, &schema));
    }

    #[test]
    fn get_of_unknown_id_is_none() {
        let catalog = InMemorySchemaCatalog::new();
        assert!(catalog.get(42).is_none());
    }

    #[test]
    fn repeated_put_is_idempotent() {
        let catalog = InMemorySchemaCatalog::new();
        let schema = sample_schema();
        catalog.put(schema.clone()).unwrap();
        catalog.put_local(schema.clone()).unwrap();
        catalog.put(schema).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn shared_across_threads() {
        let catalog = Arc::new(InMemorySchemaCatalog::new());
        let schema = sample_schema();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let catalog = Arc::clone(&catalog);
            let schema = Arc::clone(&schema);
            handles.push(std::thread::spawn(move || catalog.put(schema).unwrap()));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(catalog.len(), 1);
    }
}
