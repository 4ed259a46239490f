//! PAMM records on disk as pretty-printed JSON

use std::fs;
use std::path::Path;

use pamm_model::{Pamm, PammRecord};

use crate::error::{AdapterError, Result};

/// Load a record, re-validating its parameters and state.
pub fn load_record(path: impl AsRef<Path>) -> Result<PammRecord> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| AdapterError::io(path, e))?;
    let record: PammRecord = serde_json::from_str(&text).map_err(|source| AdapterError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Pamm::from_record(&record)?;
    Ok(record)
}

pub fn save_record(path: impl AsRef<Path>, record: &PammRecord) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(record).map_err(|source| AdapterError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text + "\n").map_err(|e| AdapterError::io(path, e))
}
