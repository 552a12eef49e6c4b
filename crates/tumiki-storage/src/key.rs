use serde_json::Value;
use tumiki_core::join_key;

use crate::error::{StorageError, StorageResult};
use crate::types::value_to_key_string;

/// Key fields addressing a single document.
///
/// One part is used as the document id directly; several parts are joined
/// in order, so `Key::composite(["5", "2025-10-01"])` and a record with
/// `userId = "5"` and `date = "2025-10-01"` address the same document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    parts: Vec<String>,
}

impl Key {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            parts: vec![id.into()],
        }
    }

    pub fn composite<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a key from JSON key-field values, in the given order.
    pub fn from_values<'a, I>(values: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let parts = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                value_to_key_string(value)
                    .ok_or_else(|| StorageError::invalid_key(format!("key part {index} is not a scalar")))
            })
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn document_id(&self) -> StorageResult<String> {
        Ok(join_key(self.parts.as_slice())?)
    }
}

impl From<&str> for Key {
    fn from(id: &str) -> Self {
        Self::id(id)
    }
}

impl From<String> for Key {
    fn from(id: String) -> Self {
        Self::id(id)
    }
}
