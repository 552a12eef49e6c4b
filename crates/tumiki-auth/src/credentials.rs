//! Credential records.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tumiki_storage::{Key, Record, StorageAdapter, Table};

use crate::error::AuthResult;

/// An account that can log in.
///
/// Stored in the `employees` table under its identifier, with the password
/// hash in the `password` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credential {
    pub id: String,
    #[serde(skip)]
    pub password_hash: String,
    pub name: Option<String>,
    pub role: String,
    pub permission: Value,
    pub affiliation: Option<String>,
    pub workplace: Option<String>,
    pub furigana: Option<String>,
}

fn text(record: &Record, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Credential {
    /// Reads a credential from a stored record.
    ///
    /// Returns `None` when the record has no id or no password hash.
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            id: text(record, "id")?,
            password_hash: text(record, "password")?,
            name: text(record, "name"),
            role: text(record, "role").unwrap_or_default(),
            permission: record.get("permission").cloned().unwrap_or(Value::Null),
            affiliation: text(record, "affiliation"),
            workplace: text(record, "workplace"),
            furigana: text(record, "furigana"),
        })
    }

    /// The record written to storage, including the password hash.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".into(), Value::String(self.id.clone()));
        record.insert("password".into(), Value::String(self.password_hash.clone()));
        record.insert("role".into(), Value::String(self.role.clone()));
        record.insert("permission".into(), self.permission.clone());
        let optional = [
            ("name", &self.name),
            ("affiliation", &self.affiliation),
            ("workplace", &self.workplace),
            ("furigana", &self.furigana),
        ];
        for (field, value) in optional {
            if let Some(v) = value {
                record.insert(field.into(), Value::String(v.clone()));
            }
        }
        record
    }
}

/// Where credentials are looked up.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when no usable credential exists for the identifier.
    async fn find_credential(&self, identifier: &str) -> AuthResult<Option<Credential>>;
}

/// Credentials kept in the `employees` table.
#[derive(Debug, Clone)]
pub struct AdapterCredentialStore {
    adapter: StorageAdapter,
}

impl AdapterCredentialStore {
    pub fn new(adapter: StorageAdapter) -> Self {
        Self { adapter }
    }

    /// Writes a credential over any existing record with the same id.
    ///
    /// Fields the credential leaves unset (`workplace`, `furigana`, a null
    /// `permission`, anything else the record carries) keep their stored values.
    pub async fn save(&self, credential: &Credential) -> AuthResult<String> {
        let mut record = self
            .adapter
            .get(Table::Employees, &Key::id(credential.id.clone()))
            .await?
            .unwrap_or_default();
        for (field, value) in credential.to_record() {
            if value.is_null() && record.contains_key(&field) {
                continue;
            }
            record.insert(field, value);
        }
        Ok(self.adapter.put(Table::Employees, record).await?)
    }
}

#[async_trait]
impl CredentialStore for AdapterCredentialStore {
    async fn find_credential(&self, identifier: &str) -> AuthResult<Option<Credential>> {
        if identifier.contains('/') {
            return Ok(None);
        }
        let record = self.adapter.get(Table::Employees, &Key::id(identifier)).await?;
        let credential = record.as_ref().and_then(Credential::from_record);
        if record.is_some() && credential.is_none() {
            tracing::warn!(identifier, "employee record has no password hash");
        }
        Ok(credential)
    }
}
