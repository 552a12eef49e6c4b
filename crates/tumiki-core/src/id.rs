use thiserror::Error;

/// Separator placed between the parts of a composite document id.
pub const KEY_SEPARATOR: &str = "_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("key has no parts")]
    Empty,
    #[error("key part {index} is empty")]
    EmptyPart { index: usize },
    #[error("key part {index} contains '/'")]
    Slash { index: usize },
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A key part becomes a single path segment, so it may not be empty or contain `/`.
pub fn validate_key_part(index: usize, part: &str) -> Result<(), IdError> {
    if part.is_empty() {
        return Err(IdError::EmptyPart { index });
    }
    if part.contains('/') {
        return Err(IdError::Slash { index });
    }
    Ok(())
}

/// Joins ordered key parts into one document id.
///
/// A single part is returned unchanged; several parts are joined with
/// [`KEY_SEPARATOR`].
pub fn join_key<S: AsRef<str>>(parts: &[S]) -> Result<String, IdError> {
    if parts.is_empty() {
        return Err(IdError::Empty);
    }
    for (index, part) in parts.iter().enumerate() {
        validate_key_part(index, part.as_ref())?;
    }
    Ok(parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR))
}
