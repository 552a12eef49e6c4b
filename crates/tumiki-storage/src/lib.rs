//! # tumiki-storage
//!
//! Storage abstraction for the Tumiki service.
//!
//! Two layers live here:
//!
//! - [`DocumentStore`], the contract a document database backend implements
//!   (get by id, equality query, full overwrite, idempotent delete).
//! - [`StorageAdapter`], a table/key façade over any [`DocumentStore`] that
//!   maps table names to collections and derives document ids from records.
//!
//! ```ignore
//! use tumiki_storage::{Key, StorageAdapter, Table};
//!
//! let adapter = StorageAdapter::new(store);
//! let employee = adapter.get(Table::Employees, &Key::id("alice")).await?;
//! ```

mod adapter;
mod error;
mod key;
mod table;
mod traits;
mod types;

pub use adapter::{StorageAdapter, derive_document_id};
pub use error::{ErrorCategory, StorageError, StorageResult};
pub use key::Key;
pub use table::{Table, TableName, UnknownTablePolicy};
pub use traits::{DocumentStore, DynDocumentStore};
pub use types::{Document, FieldFilter, Record, value_to_key_string};
