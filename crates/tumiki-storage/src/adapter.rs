//! Table/key façade over a [`DocumentStore`].

use serde_json::Value;
use tumiki_core::join_key;

use crate::error::{StorageError, StorageResult};
use crate::key::Key;
use crate::table::{TableName, UnknownTablePolicy};
use crate::traits::{DocumentStore, DynDocumentStore};
use crate::types::{FieldFilter, Record, value_to_key_string};

/// Uniform get/scan/query/put/delete over tables.
///
/// Table names are mapped to collections according to the configured
/// [`UnknownTablePolicy`]; document ids are derived from [`Key`]s on reads
/// and from the record itself on writes.
#[derive(Clone)]
pub struct StorageAdapter {
    store: DynDocumentStore,
    policy: UnknownTablePolicy,
}

impl std::fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("backend", &self.store.backend_name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl StorageAdapter {
    pub fn new(store: DynDocumentStore) -> Self {
        Self {
            store,
            policy: UnknownTablePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: UnknownTablePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UnknownTablePolicy {
        self.policy
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    fn collection(&self, table: &impl TableName) -> StorageResult<String> {
        Ok(self.policy.resolve(table.table_name())?.into_owned())
    }

    /// Reads one record; `Ok(None)` when it does not exist.
    pub async fn get(&self, table: impl TableName, key: &Key) -> StorageResult<Option<Record>> {
        let collection = self.collection(&table)?;
        let id = key.document_id()?;
        let doc = self.store.get_document(&collection, &id).await?;
        tracing::debug!(collection = %collection, id = %id, found = doc.is_some(), "storage get");
        Ok(doc.map(|d| d.into_record()))
    }

    /// Lists records matching every equality filter (all records when empty).
    pub async fn scan(
        &self,
        table: impl TableName,
        filters: &[FieldFilter],
    ) -> StorageResult<Vec<Record>> {
        let collection = self.collection(&table)?;
        let docs = self.store.query_collection(&collection, filters).await?;
        tracing::debug!(
            collection = %collection,
            filters = filters.len(),
            count = docs.len(),
            "storage scan"
        );
        Ok(docs.into_iter().map(|d| d.into_record()).collect())
    }

    /// Lists records whose `field` equals `value`.
    pub async fn query(
        &self,
        table: impl TableName,
        field: &str,
        value: impl Into<Value>,
    ) -> StorageResult<Vec<Record>> {
        let filter = FieldFilter::eq(field, value);
        self.scan(table, std::slice::from_ref(&filter)).await
    }

    /// Writes a record, fully replacing any existing document, and returns its id.
    ///
    /// The `id` field is dropped from the stored payload; the id only lives in
    /// the document address.
    pub async fn put(&self, table: impl TableName, mut record: Record) -> StorageResult<String> {
        let collection = self.collection(&table)?;
        let id = derive_document_id(table.table_name(), &record)?;
        record.remove("id");
        self.store.upsert_document(&collection, &id, record).await?;
        tracing::debug!(collection = %collection, id = %id, "storage put");
        Ok(id)
    }

    /// Deletes a record. Missing records are not an error.
    pub async fn delete(&self, table: impl TableName, key: &Key) -> StorageResult<()> {
        let collection = self.collection(&table)?;
        let id = key.document_id()?;
        self.store.delete_document(&collection, &id).await?;
        tracing::debug!(collection = %collection, id = %id, "storage delete");
        Ok(())
    }
}

/// Document id for a record about to be written.
///
/// Priority: a non-empty `id`, then `userId` + `dateGroup`, then `userId` +
/// `date`. Missing, `null` and empty values count as absent.
pub fn derive_document_id(table: &str, record: &Record) -> StorageResult<String> {
    let field = |name: &str| record.get(name).and_then(value_to_key_string);

    if let Some(id) = field("id") {
        return Ok(join_key(&[id])?);
    }
    if let Some(user_id) = field("userId") {
        if let Some(group) = field("dateGroup") {
            return Ok(join_key(&[user_id, group])?);
        }
        if let Some(date) = field("date") {
            return Ok(join_key(&[user_id, date])?);
        }
    }
    Err(StorageError::missing_document_id(table))
}
