//! Persisted encode results.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Everything needed to decode a result later: the coder that produced it,
/// the raw input, the payload and the metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub algorithm: String,
    pub original_input: Value,
    pub encoded_data: Value,
    pub metadata: Value,
}

impl ResultBundle {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!("Exporting results to JSON: {}", path.display());
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Importing results from JSON: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
