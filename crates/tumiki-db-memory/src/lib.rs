//! In-memory document store.
//!
//! Implements [`DocumentStore`] over a [`DashMap`] of collections. Every call
//! is counted so tests can assert how often the store was hit.
//!
//! ```ignore
//! use tumiki_db_memory::InMemoryDocumentStore;
//!
//! let store = InMemoryDocumentStore::new();
//! store.insert("employees", "alice", fields);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tumiki_storage::{Document, DocumentStore, FieldFilter, Record, StorageResult};

/// Counters for each store operation.
#[derive(Debug, Default)]
struct CallCounters {
    gets: AtomicU64,
    queries: AtomicU64,
    upserts: AtomicU64,
    deletes: AtomicU64,
}

/// Snapshot of the call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCallStats {
    pub gets: u64,
    pub queries: u64,
    pub upserts: u64,
    pub deletes: u64,
}

impl StoreCallStats {
    /// Reads only (gets plus queries).
    pub fn reads(&self) -> u64 {
        self.gets + self.queries
    }

    pub fn total(&self) -> u64 {
        self.reads() + self.upserts + self.deletes
    }
}

/// Documents kept in process memory, ordered by id within each collection.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: DashMap<String, BTreeMap<String, Record>>,
    counters: CallCounters,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seeds a document without touching the call counters.
    pub fn insert(&self, collection: &str, id: &str, fields: Record) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    pub fn stats(&self) -> StoreCallStats {
        StoreCallStats {
            gets: self.counters.gets.load(Ordering::Relaxed),
            queries: self.counters.queries.load(Ordering::Relaxed),
            upserts: self.counters.upserts.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.gets.store(0, Ordering::Relaxed);
        self.counters.queries.store(0, Ordering::Relaxed);
        self.counters.upserts.store(0, Ordering::Relaxed);
        self.counters.deletes.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
            .map(|fields| Document::new(id, fields)))
    }

    async fn query_collection(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> StorageResult<Vec<Document>> {
        self.counters.queries.fetch_add(1, Ordering::Relaxed);
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, fields)| filters.iter().all(|f| f.matches(fields)))
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .collect())
    }

    async fn upsert_document(&self, collection: &str, id: &str, fields: Record) -> StorageResult<()> {
        self.counters.upserts.fetch_add(1, Ordering::Relaxed);
        self.insert(collection, id, fields);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StorageResult<()> {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        if let Some(mut docs) = self.collections.get_mut(collection) {
            if docs.remove(id).is_none() {
                tracing::trace!(collection, id, "delete of missing document ignored");
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
