//! Game catalog core for Questlog
//!
//! Persists completed and owned games in an embedded SQLite store and
//! normalizes user-supplied cover art before it is written.
//!
//! Every mutation is a full read-modify-write of the collection:
//! [`CatalogService`] reads the snapshot from the [`RecordStore`], changes it in
//! memory and writes the whole snapshot back inside a single transaction.

mod backup;
mod context;
mod cover;
mod listing;
mod record;
mod service;
mod store;

pub use backup::{default_export_file_name, export_json, parse_import};
pub use context::CatalogContext;
pub use cover::{
    ImagePipeline, NormalizedImage, cover_dimensions, decode_data_uri, target_dimensions,
};
pub use listing::{
    FilterOptions, ListFilter, apply_filter, distinct_platforms, distinct_years,
    sort_unfinished_last,
};
pub use record::{GameFields, GameRecord, MAX_RATING};
pub use service::CatalogService;
pub use store::{RecordStore, SCHEMA_VERSION};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Storage unavailable: {0}")]
    Connection(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Unreadable image: {0}")]
    Decode(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Invalid record: {0}")]
    Validation(String),

    #[error("Game not found: {0}")]
    NotFound(i64),

    #[error("Import failed: {0}")]
    Import(String),
}

/// Catalog result type
pub type Result<T> = std::result::Result<T, CatalogError>;
