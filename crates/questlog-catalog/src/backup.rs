//! JSON export and import of the whole collection
//!
//! The backup format is a bare JSON array of records: no envelope, version
//! or checksum.

use crate::{CatalogError, GameRecord, Result};
use chrono::NaiveDate;

/// Serialize records as a JSON array
pub fn export_json(records: &[GameRecord]) -> Result<String> {
    serde_json::to_string(records).map_err(|e| CatalogError::Read(format!("export failed: {e}")))
}

/// Parse a backup produced by [`export_json`]
pub fn parse_import(json: &str) -> Result<Vec<GameRecord>> {
    serde_json::from_str(json).map_err(|e| CatalogError::Import(e.to_string()))
}

/// Suggested file name for a backup taken on `date`
pub fn default_export_file_name(date: NaiveDate) -> String {
    format!("game-records-backup_{}.json", date.format("%Y-%m-%d"))
}
