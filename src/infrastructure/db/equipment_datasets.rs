use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::{QueryBuilder, Sqlite};

use async_trait::async_trait;

use super::connection::connect_equipment_pool;
use super::DatasetStore;
use crate::domain::equipment::{
    DatasetId, DatasetSummary, EquipmentRow, NewDataset, Scope, StoredDataset, TypeDistribution,
};
use crate::domain::error::{AppError, Result};

/// Fixed-width UTC timestamp so stored values sort lexically by time.
const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

const SELECT_COLUMNS: &str = "SELECT id, name, scope, created_at, total_count, avg_flowrate, \
     avg_pressure, avg_temperature, type_distribution, raw_rows FROM equipment_datasets";

pub struct SqliteDatasetStore {
    pool: SqlitePool,
}

impl SqliteDatasetStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = connect_equipment_pool(database_url).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatasetStore for SqliteDatasetStore {
    async fn create(&self, dataset: NewDataset) -> Result<StoredDataset> {
        let total_count = i64::try_from(dataset.summary.total_count).map_err(|_| {
            AppError::ValidationError(format!(
                "Row count {} exceeds storage range",
                dataset.summary.total_count
            ))
        })?;
        let type_distribution = serde_json::to_string(&dataset.summary.type_distribution)
            .map_err(|e| AppError::Internal(format!("Failed to encode type distribution: {e}")))?;
        let raw_rows = serde_json::to_string(&dataset.rows)
            .map_err(|e| AppError::Internal(format!("Failed to encode dataset rows: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO equipment_datasets \
             (name, scope, created_at, total_count, avg_flowrate, avg_pressure, avg_temperature, \
              type_distribution, raw_rows) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&dataset.name)
        .bind(dataset.scope.as_key())
        .bind(format_created_at(&dataset.created_at))
        .bind(total_count)
        .bind(dataset.summary.avg_flowrate)
        .bind(dataset.summary.avg_pressure)
        .bind(dataset.summary.avg_temperature)
        .bind(type_distribution)
        .bind(raw_rows)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert dataset: {e}")))?;

        let id = DatasetId(result.last_insert_rowid());
        Ok(StoredDataset::from_new(id, dataset))
    }

    async fn get(&self, id: DatasetId) -> Result<StoredDataset> {
        let row = sqlx::query_as::<_, EquipmentDatasetEntity>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch dataset: {e}")))?;

        match row {
            Some(entity) => entity.try_into(),
            None => Err(AppError::NotFound(format!("Dataset not found: {}", id))),
        }
    }

    async fn list_by_scope_recent_first(&self, scope: &Scope) -> Result<Vec<StoredDataset>> {
        let rows = sqlx::query_as::<_, EquipmentDatasetEntity>(&format!(
            "{SELECT_COLUMNS} WHERE scope = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(scope.as_key())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list datasets: {e}")))?;

        rows.into_iter().map(StoredDataset::try_from).collect()
    }

    async fn delete_by_ids(&self, ids: &[DatasetId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("DELETE FROM equipment_datasets WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.0);
        }
        separated.push_unseparated(")");

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete datasets: {e}")))?;

        Ok(result.rows_affected())
    }
}

fn format_created_at(created_at: &DateTime<Utc>) -> String {
    created_at.format(CREATED_AT_FORMAT).to_string()
}

fn parse_created_at(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| AppError::DatabaseError(format!("Invalid created_at '{value}': {e}")))
}

#[derive(sqlx::FromRow)]
struct EquipmentDatasetEntity {
    id: i64,
    name: String,
    scope: String,
    created_at: String,
    total_count: i64,
    avg_flowrate: Option<f64>,
    avg_pressure: Option<f64>,
    avg_temperature: Option<f64>,
    type_distribution: String,
    raw_rows: String,
}

impl TryFrom<EquipmentDatasetEntity> for StoredDataset {
    type Error = AppError;

    fn try_from(entity: EquipmentDatasetEntity) -> Result<Self> {
        let type_distribution: TypeDistribution = serde_json::from_str(&entity.type_distribution)
            .map_err(|e| {
                AppError::DatabaseError(format!(
                    "Corrupt type_distribution for dataset {}: {e}",
                    entity.id
                ))
            })?;
        let rows: Vec<EquipmentRow> = serde_json::from_str(&entity.raw_rows).map_err(|e| {
            AppError::DatabaseError(format!("Corrupt raw_rows for dataset {}: {e}", entity.id))
        })?;
        let scope = Scope::from_key(&entity.scope).ok_or_else(|| {
            AppError::DatabaseError(format!(
                "Unknown scope '{}' for dataset {}",
                entity.scope, entity.id
            ))
        })?;

        Ok(Self {
            id: DatasetId(entity.id),
            name: entity.name,
            scope,
            created_at: parse_created_at(&entity.created_at)?,
            summary: DatasetSummary {
                total_count: entity.total_count.max(0) as u64,
                avg_flowrate: entity.avg_flowrate,
                avg_pressure: entity.avg_pressure,
                avg_temperature: entity.avg_temperature,
                type_distribution,
            },
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equipment::CellValue;
    use chrono::{Duration, TimeZone};

    fn new_dataset(name: &str, scope: Scope, minute: u32) -> NewDataset {
        let mut row = EquipmentRow::new();
        row.insert("Equipment Name", CellValue::Text(format!("{name}-pump")));
        row.insert("Type", CellValue::Text("Pump".to_string()));
        row.insert("Flowrate", CellValue::Number(12.5));
        row.insert("Pressure", CellValue::Null);
        row.insert("Temperature", CellValue::Number(80.0));

        let mut type_distribution = TypeDistribution::new();
        type_distribution.increment("Pump");

        NewDataset {
            name: name.to_string(),
            scope,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, minute, 0).unwrap(),
            summary: DatasetSummary {
                total_count: 1,
                avg_flowrate: Some(12.5),
                avg_pressure: None,
                avg_temperature: Some(80.0),
                type_distribution,
            },
            rows: vec![row],
        }
    }

    async fn store() -> SqliteDatasetStore {
        SqliteDatasetStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let store = store().await;
        let created = store
            .create(new_dataset("plant.csv", Scope::user("alice"), 0))
            .await
            .unwrap();

        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.scope, Scope::user("alice"));
        assert_eq!(fetched.rows[0].get("Pressure"), Some(&CellValue::Null));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = store().await;
        let result = store.get(DatasetId(404)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_within_scope() {
        let store = store().await;
        store.create(new_dataset("a", Scope::Global, 1)).await.unwrap();
        store.create(new_dataset("b", Scope::Global, 3)).await.unwrap();
        store.create(new_dataset("c", Scope::Global, 2)).await.unwrap();
        store.create(new_dataset("other", Scope::user("bob"), 9)).await.unwrap();

        let names: Vec<String> = store
            .list_by_scope_recent_first(&Scope::Global)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_list_breaks_timestamp_ties_by_id() {
        let store = store().await;
        let first = store.create(new_dataset("first", Scope::Global, 5)).await.unwrap();
        let second = store.create(new_dataset("second", Scope::Global, 5)).await.unwrap();

        let listed = store.list_by_scope_recent_first(&Scope::Global).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_delete_by_ids() {
        let store = store().await;
        let a = store.create(new_dataset("a", Scope::Global, 1)).await.unwrap();
        let b = store.create(new_dataset("b", Scope::Global, 2)).await.unwrap();

        assert_eq!(store.delete_by_ids(&[]).await.unwrap(), 0);
        assert_eq!(store.delete_by_ids(&[a.id, DatasetId(999)]).await.unwrap(), 1);
        assert!(matches!(store.get(a.id).await, Err(AppError::NotFound(_))));
        assert!(store.get(b.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_scope_key_is_a_database_error() {
        let store = store().await;
        let created = store.create(new_dataset("a", Scope::Global, 1)).await.unwrap();

        sqlx::query("UPDATE equipment_datasets SET scope = 'team:ops' WHERE id = ?")
            .bind(created.id.0)
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(matches!(
            store.get(created.id).await,
            Err(AppError::DatabaseError(_))
        ));
        assert!(store
            .list_by_scope_recent_first(&Scope::Global)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_created_at_format_sorts_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = early + Duration::microseconds(1500);

        let early_text = format_created_at(&early);
        let later_text = format_created_at(&later);
        assert_eq!(early_text, "2024-01-01T00:00:00.000000Z");
        assert!(later_text > early_text);
        assert_eq!(parse_created_at(&later_text).unwrap(), later);
    }
}
