//! Session context owning the configuration and the open-once store

use crate::{CatalogError, CatalogService, ImagePipeline, RecordStore, Result};
use questlog_config::QuestlogConfig;
use tokio::sync::OnceCell;

/// Explicit replacement for process-global state
///
/// The store is opened on first use and the same handle is reused for the
/// rest of the session. There is no explicit close.
#[derive(Debug)]
pub struct CatalogContext {
    config: QuestlogConfig,
    catalog: OnceCell<CatalogService>,
}

impl CatalogContext {
    pub fn new(config: QuestlogConfig) -> Self {
        Self {
            config,
            catalog: OnceCell::new(),
        }
    }

    /// Context around an already opened store
    pub fn with_store(config: QuestlogConfig, store: RecordStore) -> Self {
        let images = ImagePipeline::from(config.images);
        Self {
            config,
            catalog: OnceCell::from(CatalogService::new(store, images)),
        }
    }

    pub fn config(&self) -> &QuestlogConfig {
        &self.config
    }

    /// The session's catalog, opening the store on first call
    ///
    /// A failed open is reported to the caller and retried on the next call.
    pub async fn catalog(&self) -> Result<CatalogService> {
        let catalog = self
            .catalog
            .get_or_try_init(|| async {
                let path = &self.config.storage.path;
                let store = RecordStore::open(path).await?;
                tracing::info!("Opened catalog at {}", path.display());

                Ok::<_, CatalogError>(CatalogService::new(
                    store,
                    ImagePipeline::from(self.config.images),
                ))
            })
            .await?;

        Ok(catalog.clone())
    }

    /// The session's store handle
    pub async fn store(&self) -> Result<RecordStore> {
        Ok(self.catalog().await?.store().clone())
    }
}
