pub mod connection;
pub mod equipment_datasets;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::equipment::{DatasetId, NewDataset, Scope, StoredDataset};
use crate::domain::error::Result;
use crate::infrastructure::config::DatabaseConfig;

pub use equipment_datasets::SqliteDatasetStore;
pub use memory::InMemoryDatasetStore;

/// Durable storage for ingested datasets.
///
/// Implementations only store and fetch; retention is enforced one layer up.
#[async_trait]
pub trait DatasetStore {
    /// Persist a dataset and return it with its assigned id.
    async fn create(&self, dataset: NewDataset) -> Result<StoredDataset>;

    /// Fetch by id regardless of scope. Missing ids are `AppError::NotFound`.
    async fn get(&self, id: DatasetId) -> Result<StoredDataset>;

    /// Every dataset in `scope`, newest first (`created_at` desc, then id desc).
    async fn list_by_scope_recent_first(&self, scope: &Scope) -> Result<Vec<StoredDataset>>;

    /// Delete the given ids, returning how many rows were removed.
    async fn delete_by_ids(&self, ids: &[DatasetId]) -> Result<u64>;
}

pub type SharedDatasetStore = Arc<dyn DatasetStore + Send + Sync>;

/// Open the store named by `config.url`: `memory` for a process-local store,
/// anything else is treated as a SQLite URL.
pub async fn open_dataset_store(config: &DatabaseConfig) -> Result<SharedDatasetStore> {
    if config.url == "memory" {
        tracing::warn!("Using in-memory dataset store; history is lost on restart");
        return Ok(Arc::new(InMemoryDatasetStore::new()));
    }

    let store = SqliteDatasetStore::connect(&config.url).await?;
    tracing::info!(url = %config.url, "Opened SQLite dataset store");
    Ok(Arc::new(store))
}
