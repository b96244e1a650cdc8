use core_types::Note;
use serde_json::Value;
use thiserror::Error;

use crate::store::repair_collection;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("import document must be a JSON array of notes")]
    NotAnArray,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Parses an exported document into repaired notes.
pub fn parse_import(text: &str) -> Result<Vec<Note>, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_array() {
        return Err(ImportError::NotAnArray);
    }
    let notes: Vec<Note> = serde_json::from_value(value)?;
    Ok(repair_collection(notes))
}
