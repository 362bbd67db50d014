//! Bounded dataset history.
//!
//! Wraps a [`DatasetStore`] and keeps at most `max_per_scope` datasets in each
//! scope. Eviction runs once after every insert: list the scope newest first,
//! delete everything past the limit. Concurrent inserts into one scope may
//! briefly leave the scope over the limit; the next insert corrects it.

use tracing::{debug, info};

use crate::domain::equipment::{DatasetId, NewDataset, Scope, StoredDataset};
use crate::domain::error::Result;
use crate::infrastructure::config::MAX_STORED_DATASETS;
use crate::infrastructure::db::SharedDatasetStore;

/// Datasets to delete from one scope.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    pub evictions: Vec<DatasetId>,
}

impl RetentionPlan {
    pub fn is_empty(&self) -> bool {
        self.evictions.is_empty()
    }
}

/// Keep-the-newest-N policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_per_scope: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_per_scope: MAX_STORED_DATASETS,
        }
    }
}

impl RetentionPolicy {
    /// A limit of zero is treated as one; a scope always keeps its newest entry.
    pub fn new(max_per_scope: usize) -> Self {
        Self {
            max_per_scope: max_per_scope.max(1),
        }
    }

    pub fn max_per_scope(&self) -> usize {
        self.max_per_scope
    }

    /// Plan evictions for datasets listed newest first.
    pub fn plan(&self, newest_first: &[StoredDataset]) -> RetentionPlan {
        RetentionPlan {
            evictions: newest_first
                .iter()
                .skip(self.max_per_scope)
                .map(|dataset| dataset.id)
                .collect(),
        }
    }
}

pub struct DatasetHistory {
    store: SharedDatasetStore,
    policy: RetentionPolicy,
}

impl DatasetHistory {
    pub fn new(store: SharedDatasetStore, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Persist `dataset`, then trim its scope back to the retention limit.
    pub async fn insert(&self, dataset: NewDataset) -> Result<StoredDataset> {
        let scope = dataset.scope.clone();
        let stored = self.store.create(dataset).await?;
        info!(dataset_id = %stored.id, scope = %scope, "Stored dataset");

        self.enforce_retention(&scope).await?;
        Ok(stored)
    }

    /// Delete every dataset in `scope` beyond the newest `max_per_scope`.
    ///
    /// Returns the evicted ids. Running it again without an intervening
    /// insert evicts nothing.
    pub async fn enforce_retention(&self, scope: &Scope) -> Result<Vec<DatasetId>> {
        let newest_first = self.store.list_by_scope_recent_first(scope).await?;
        let plan = self.policy.plan(&newest_first);

        if plan.is_empty() {
            debug!(scope = %scope, kept = newest_first.len(), "Retention: nothing to evict");
            return Ok(Vec::new());
        }

        let deleted = self.store.delete_by_ids(&plan.evictions).await?;
        info!(
            scope = %scope,
            evicted = ?plan.evictions,
            deleted,
            limit = self.policy.max_per_scope,
            "Retention: evicted oldest datasets"
        );
        Ok(plan.evictions)
    }

    /// At most `max_per_scope` datasets for `scope`, newest first.
    pub async fn list(&self, scope: &Scope) -> Result<Vec<StoredDataset>> {
        let mut datasets = self.store.list_by_scope_recent_first(scope).await?;
        datasets.truncate(self.policy.max_per_scope);
        Ok(datasets)
    }

    /// Direct lookup; not filtered by scope.
    pub async fn get(&self, id: DatasetId) -> Result<StoredDataset> {
        self.store.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equipment::DatasetSummary;
    use crate::domain::error::AppError;
    use crate::infrastructure::db::{InMemoryDatasetStore, SqliteDatasetStore};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn new_dataset(name: &str, scope: &Scope, offset_minutes: i64) -> NewDataset {
        NewDataset {
            name: name.to_string(),
            scope: scope.clone(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
                + Duration::minutes(offset_minutes),
            summary: DatasetSummary::default(),
            rows: Vec::new(),
        }
    }

    fn history_with(store: SharedDatasetStore) -> DatasetHistory {
        DatasetHistory::new(store, RetentionPolicy::default())
    }

    #[test]
    fn test_plan_keeps_newest() {
        let policy = RetentionPolicy::new(2);
        let newest_first: Vec<StoredDataset> = [5, 4, 3, 1]
            .iter()
            .map(|id| {
                StoredDataset::from_new(DatasetId(*id), new_dataset("x", &Scope::Global, *id))
            })
            .collect();

        let plan = policy.plan(&newest_first);
        assert_eq!(plan.evictions, vec![DatasetId(3), DatasetId(1)]);
        assert!(policy.plan(&newest_first[..2]).is_empty());
    }

    #[test]
    fn test_zero_limit_keeps_one() {
        assert_eq!(RetentionPolicy::new(0).max_per_scope(), 1);
    }

    #[tokio::test]
    async fn test_sixth_insert_evicts_oldest() {
        let store: SharedDatasetStore = Arc::new(InMemoryDatasetStore::new());
        let history = history_with(store.clone());
        let scope = Scope::Global;

        let mut ids = Vec::new();
        for minute in 0..6 {
            let stored = history
                .insert(new_dataset(&format!("d{minute}"), &scope, minute))
                .await
                .unwrap();
            ids.push(stored.id);
        }

        let listed = history.list(&scope).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["d5", "d4", "d3", "d2", "d1"]);

        assert!(matches!(history.get(ids[0]).await, Err(AppError::NotFound(_))));
        assert_eq!(store.list_by_scope_recent_first(&scope).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_enforce_retention_is_idempotent() {
        let store: SharedDatasetStore = Arc::new(InMemoryDatasetStore::new());
        let scope = Scope::user("dana");
        for minute in 0..8 {
            store.create(new_dataset("raw", &scope, minute)).await.unwrap();
        }

        let history = history_with(store.clone());
        let first = history.enforce_retention(&scope).await.unwrap();
        let second = history.enforce_retention(&scope).await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(second.is_empty());
        assert_eq!(history.list(&scope).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_scopes_are_retained_independently() {
        let store: SharedDatasetStore = Arc::new(InMemoryDatasetStore::new());
        let history = history_with(store);
        let alice = Scope::user("alice");

        for minute in 0..5 {
            history
                .insert(new_dataset("global", &Scope::Global, minute))
                .await
                .unwrap();
        }
        let mine = history.insert(new_dataset("alice", &alice, 99)).await.unwrap();

        assert_eq!(history.list(&Scope::Global).await.unwrap().len(), 5);
        assert_eq!(history.list(&alice).await.unwrap().len(), 1);
        assert!(history.get(mine.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_scope_lists_nothing() {
        let history = history_with(Arc::new(InMemoryDatasetStore::new()));
        assert!(history.list(&Scope::Global).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retention_over_sqlite_store() {
        let store: SharedDatasetStore =
            Arc::new(SqliteDatasetStore::connect("sqlite::memory:").await.unwrap());
        let history = history_with(store);

        let mut ids = Vec::new();
        for minute in 0..7 {
            ids.push(
                history
                    .insert(new_dataset(&format!("s{minute}"), &Scope::Global, minute))
                    .await
                    .unwrap()
                    .id,
            );
        }

        let listed: Vec<DatasetId> = history
            .list(&Scope::Global)
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(listed, ids[2..].iter().rev().copied().collect::<Vec<_>>());
        assert!(history.get(ids[1]).await.is_err());
    }
}
