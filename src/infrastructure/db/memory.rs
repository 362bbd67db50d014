use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DatasetStore;
use crate::domain::equipment::{DatasetId, NewDataset, Scope, StoredDataset};
use crate::domain::error::{AppError, Result};

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    datasets: Vec<StoredDataset>,
}

/// Process-local dataset store. Ids increase monotonically and are never reused.
#[derive(Default)]
pub struct InMemoryDatasetStore {
    state: RwLock<MemoryState>,
}

impl InMemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.state.read().await.datasets.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DatasetStore for InMemoryDatasetStore {
    async fn create(&self, dataset: NewDataset) -> Result<StoredDataset> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let stored = StoredDataset::from_new(DatasetId(state.last_id), dataset);
        state.datasets.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: DatasetId) -> Result<StoredDataset> {
        self.state
            .read()
            .await
            .datasets
            .iter()
            .find(|dataset| dataset.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Dataset not found: {}", id)))
    }

    async fn list_by_scope_recent_first(&self, scope: &Scope) -> Result<Vec<StoredDataset>> {
        let state = self.state.read().await;
        let mut datasets: Vec<StoredDataset> = state
            .datasets
            .iter()
            .filter(|dataset| &dataset.scope == scope)
            .cloned()
            .collect();
        datasets.sort_by(StoredDataset::recency_cmp);
        Ok(datasets)
    }

    async fn delete_by_ids(&self, ids: &[DatasetId]) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.datasets.len();
        state.datasets.retain(|dataset| !ids.contains(&dataset.id));
        Ok((before - state.datasets.len()) as u64)
    }
}
