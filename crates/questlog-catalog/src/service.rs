//! Catalog operations
//!
//! [`CatalogService`] is the only writer of the record collection. Every
//! mutation reads the full snapshot, changes it in memory and writes it back;
//! covers pass through the [`ImagePipeline`] before anything is written.

use crate::backup::{export_json, parse_import};
use crate::listing::{FilterOptions, ListFilter, apply_filter};
use crate::{CatalogError, GameFields, GameRecord, ImagePipeline, RecordStore, Result};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

/// Create, update, delete and list game records
///
/// Clones share the store handle and the write lock, so read-modify-write
/// cycles issued through any clone run one at a time.
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: RecordStore,
    images: ImagePipeline,
    write_lock: Arc<Mutex<()>>,
    ids: Arc<IdGenerator>,
}

impl CatalogService {
    pub fn new(store: RecordStore, images: ImagePipeline) -> Self {
        Self {
            store,
            images,
            write_lock: Arc::new(Mutex::new(())),
            ids: Arc::new(IdGenerator::default()),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn images(&self) -> &ImagePipeline {
        &self.images
    }

    /// Add a game
    ///
    /// Fields are validated before the cover is decoded, and the cover is
    /// normalized before the collection is read.
    pub async fn add_record(
        &self,
        fields: GameFields,
        cover: Option<Vec<u8>>,
    ) -> Result<GameRecord> {
        let valid = fields.validate()?;
        let cover = cover
            .ok_or_else(|| CatalogError::Validation("cover image is required".to_string()))?;
        let normalized = self.images.normalize(cover).await?;

        let _guard = self.write_lock.lock().await;
        let mut records = self.store.read_all().await?;

        let highest = records.iter().map(|record| record.id).max().unwrap_or(0);
        let record = valid.into_record(self.ids.next(highest), normalized.data_uri);
        records.push(record.clone());

        self.store.replace_all(records).await?;
        tracing::info!("Added game {} ({})", record.id, record.title);

        Ok(record)
    }

    /// Replace the editable fields of an existing game
    ///
    /// The cover is re-normalized only when a new one is supplied.
    pub async fn update_record(
        &self,
        id: i64,
        fields: GameFields,
        cover: Option<Vec<u8>>,
    ) -> Result<GameRecord> {
        let valid = fields.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut records = self.store.read_all().await?;
        let index = records
            .iter()
            .position(|record| record.id == id)
            .ok_or(CatalogError::NotFound(id))?;

        if let Some(bytes) = cover {
            let normalized = self.images.normalize(bytes).await?;
            records[index].cover = normalized.data_uri;
        }
        valid.apply_to(&mut records[index]);
        let updated = records[index].clone();

        self.store.replace_all(records).await?;
        tracing::info!("Updated game {} ({})", updated.id, updated.title);

        Ok(updated)
    }

    /// Remove a game; returns whether it existed
    ///
    /// Deleting an unknown id is not an error.
    pub async fn delete_record(&self, id: i64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let records = self.store.read_all().await?;
        let before = records.len();

        let remaining: Vec<GameRecord> = records
            .into_iter()
            .filter(|record| record.id != id)
            .collect();
        let removed = remaining.len() < before;

        self.store.replace_all(remaining).await?;
        if removed {
            tracing::info!("Deleted game {}", id);
        } else {
            tracing::debug!("Delete of unknown game {} was a no-op", id);
        }

        Ok(removed)
    }

    /// Unfiltered collection, in storage order
    pub async fn read_all(&self) -> Result<Vec<GameRecord>> {
        self.store.read_all().await
    }

    /// Records matching `filter`, unfinished games last
    pub async fn list_records(&self, filter: &ListFilter) -> Result<Vec<GameRecord>> {
        let records = self.store.read_all().await?;
        Ok(apply_filter(records, filter))
    }

    /// A single game by id
    pub async fn get_record(&self, id: i64) -> Result<GameRecord> {
        self.store
            .read_all()
            .await?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or(CatalogError::NotFound(id))
    }

    /// Years and platforms present in the collection
    pub async fn filter_options(&self) -> Result<FilterOptions> {
        let records = self.store.read_all().await?;
        Ok(FilterOptions::from_records(&records))
    }

    /// The whole collection as a JSON backup
    pub async fn export(&self) -> Result<String> {
        let records = self.store.read_all().await?;
        export_json(&records)
    }

    /// Write a JSON backup to `path`; returns the number of records
    pub async fn export_to_file(&self, path: &Path) -> Result<usize> {
        let records = self.store.read_all().await?;
        let json = export_json(&records)?;

        tokio::fs::write(path, json)
            .await
            .map_err(|e| CatalogError::Write(format!("cannot write {}: {e}", path.display())))?;
        tracing::info!("Exported {} games to {}", records.len(), path.display());

        Ok(records.len())
    }

    /// Replace the collection with a JSON backup; returns the number of records
    ///
    /// The backup is parsed in full before storage is touched.
    pub async fn import(&self, json: &str) -> Result<usize> {
        let records = parse_import(json)?;
        let count = records.len();

        let _guard = self.write_lock.lock().await;
        self.store.replace_all(records).await?;
        tracing::info!("Imported {} games", count);

        Ok(count)
    }

    /// [`CatalogService::import`] reading the backup from `path`
    pub async fn import_from_file(&self, path: &Path) -> Result<usize> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::Import(format!("cannot read {}: {e}", path.display())))?;
        self.import(&json).await
    }
}

/// Millisecond timestamp ids that never repeat or go backwards
#[derive(Debug, Default)]
struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    /// Next id, strictly above both the last one issued and `highest`
    fn next(&self, highest: i64) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(candidate(now, last, highest))
            })
            .unwrap_or_else(|last| last);
        candidate(now, previous, highest)
    }
}

fn candidate(now: i64, last: i64, highest: i64) -> i64 {
    now.max(last.saturating_add(1)).max(highest.saturating_add(1))
}
