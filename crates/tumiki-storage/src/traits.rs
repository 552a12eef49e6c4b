//! The document store contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{Document, FieldFilter, Record};

/// A collection/document database.
///
/// Implementations must be thread-safe (`Send + Sync`); one instance is
/// shared by every request the service handles.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by id.
    ///
    /// Returns `Ok(None)` when the document does not exist. Any other
    /// failure is an error.
    async fn get_document(&self, collection: &str, id: &str) -> StorageResult<Option<Document>>;

    /// Lists the documents of a collection whose fields equal every filter.
    ///
    /// An empty filter slice lists the whole collection. No matches yields an
    /// empty vector.
    async fn query_collection(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> StorageResult<Vec<Document>>;

    /// Replaces the document's field map, creating it when absent.
    async fn upsert_document(&self, collection: &str, id: &str, fields: Record) -> StorageResult<()>;

    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete_document(&self, collection: &str, id: &str) -> StorageResult<()>;

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// Shared handle to a document store.
pub type DynDocumentStore = Arc<dyn DocumentStore>;
