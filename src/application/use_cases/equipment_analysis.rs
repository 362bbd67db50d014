use chrono::{SubsecRound, Utc};
use tracing::{info, warn};

use crate::application::use_cases::dataset_history::DatasetHistory;
use crate::application::use_cases::equipment_statistics::aggregate;
use crate::domain::equipment::{DatasetId, NewDataset, Scope, StoredDataset, UploadedFile};
use crate::domain::error::Result;
use crate::infrastructure::csv::EquipmentCsvParser;
use crate::infrastructure::report::ReportRenderer;

pub const UNTITLED_DATASET: &str = "Untitled";

/// Parse, aggregate, persist and report on equipment uploads.
pub struct EquipmentAnalysisUseCase {
    parser: EquipmentCsvParser,
    history: DatasetHistory,
    renderer: ReportRenderer,
}

impl EquipmentAnalysisUseCase {
    pub fn new(
        parser: EquipmentCsvParser,
        history: DatasetHistory,
        renderer: ReportRenderer,
    ) -> Self {
        Self {
            parser,
            history,
            renderer,
        }
    }

    pub fn history(&self) -> &DatasetHistory {
        &self.history
    }

    /// Ingest one uploaded file into `scope`.
    ///
    /// Nothing is persisted when parsing or column validation fails.
    pub async fn ingest(
        &self,
        file: UploadedFile,
        name: Option<String>,
        scope: Scope,
    ) -> Result<StoredDataset> {
        let display_name = resolve_display_name(name, file.file_name.as_deref());

        let table = self.parser.parse(&file.content).map_err(|e| {
            warn!(name = %display_name, error = %e, "Rejected upload");
            e
        })?;
        let aggregated = aggregate(table.rows);

        let stored = self
            .history
            .insert(NewDataset {
                name: display_name,
                scope,
                // Microseconds, matching what the SQLite store keeps.
                created_at: Utc::now().trunc_subsecs(6),
                summary: aggregated.summary,
                rows: aggregated.rows,
            })
            .await?;

        info!(
            dataset_id = %stored.id,
            name = %stored.name,
            rows = stored.summary.total_count,
            "Ingested equipment dataset"
        );
        Ok(stored)
    }

    pub async fn get_dataset(&self, id: DatasetId) -> Result<StoredDataset> {
        self.history.get(id).await
    }

    pub async fn list_history(&self, scope: &Scope) -> Result<Vec<StoredDataset>> {
        self.history.list(scope).await
    }

    pub fn render_report(&self, dataset: &StoredDataset) -> Result<Vec<u8>> {
        self.renderer.render(dataset)
    }

    pub async fn render_report_by_id(&self, id: DatasetId) -> Result<Vec<u8>> {
        let dataset = self.get_dataset(id).await?;
        self.render_report(&dataset)
    }
}

/// Supplied name, else the uploaded file name, else `Untitled`. Blank counts as absent.
pub fn resolve_display_name(name: Option<String>, file_name: Option<&str>) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .or_else(|| {
            file_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| UNTITLED_DATASET.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::dataset_history::RetentionPolicy;
    use crate::application::use_cases::equipment_statistics::summarize;
    use crate::domain::equipment::CellValue;
    use crate::domain::error::AppError;
    use crate::infrastructure::db::{InMemoryDatasetStore, SharedDatasetStore, SqliteDatasetStore};
    use std::sync::Arc;

    const SAMPLE: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                          Pump-1,Pump,120,5.2,110\n\
                          Valve-1,Valve,n/a,4.1,105\n\
                          Pump-2,Pump,130.5,6,\n";

    fn use_case(store: SharedDatasetStore) -> EquipmentAnalysisUseCase {
        EquipmentAnalysisUseCase::new(
            EquipmentCsvParser::new(),
            DatasetHistory::new(store, RetentionPolicy::default()),
            ReportRenderer::default(),
        )
    }

    fn upload(content: &str) -> UploadedFile {
        UploadedFile::new(Some("sample.csv".to_string()), content.as_bytes().to_vec())
    }

    #[test]
    fn test_resolve_display_name() {
        assert_eq!(resolve_display_name(Some("Run 4".into()), Some("a.csv")), "Run 4");
        assert_eq!(resolve_display_name(Some("  ".into()), Some("a.csv")), "a.csv");
        assert_eq!(resolve_display_name(None, Some("a.csv")), "a.csv");
        assert_eq!(resolve_display_name(None, None), "Untitled");
    }

    #[tokio::test]
    async fn test_ingest_round_trip_matches_recomputed_summary() {
        let use_case = use_case(Arc::new(InMemoryDatasetStore::new()));

        let stored = use_case
            .ingest(upload(SAMPLE), None, Scope::Global)
            .await
            .unwrap();
        let fetched = use_case.get_dataset(stored.id).await.unwrap();

        let reparsed = EquipmentCsvParser::new().parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(fetched.summary, summarize(&reparsed.rows));
        assert_eq!(fetched.name, "sample.csv");
        assert_eq!(fetched.summary.total_count, 3);
        assert_eq!(fetched.summary.avg_flowrate, Some(125.25));
        assert_eq!(fetched.summary.avg_temperature, Some(107.5));
    }

    #[tokio::test]
    async fn test_unparseable_flowrate_becomes_null() {
        let use_case = use_case(Arc::new(InMemoryDatasetStore::new()));
        let stored = use_case
            .ingest(upload(SAMPLE), Some("plant".into()), Scope::Global)
            .await
            .unwrap();

        assert_eq!(stored.rows[1].get("Flowrate"), Some(&CellValue::Null));
        assert_eq!(stored.name, "plant");
    }

    #[tokio::test]
    async fn test_missing_column_creates_nothing() {
        let store: SharedDatasetStore = Arc::new(InMemoryDatasetStore::new());
        let use_case = use_case(store.clone());

        let err = use_case
            .ingest(
                upload("Equipment Name,Flowrate,Pressure,Temperature\nP,1,2,3\n"),
                None,
                Scope::Global,
            )
            .await
            .unwrap_err();

        match err {
            AppError::MissingColumns { missing, expected } => {
                assert_eq!(missing, vec!["Type"]);
                assert_eq!(expected.len(), 5);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store
            .list_by_scope_recent_first(&Scope::Global)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_history_is_capped_per_scope() {
        let use_case = use_case(Arc::new(InMemoryDatasetStore::new()));
        let scope = Scope::user("alice");

        let mut ids = Vec::new();
        for i in 0..6 {
            let stored = use_case
                .ingest(upload(SAMPLE), Some(format!("run-{i}")), scope.clone())
                .await
                .unwrap();
            ids.push(stored.id);
        }

        let history = use_case.list_history(&scope).await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].name, "run-5");
        assert!(matches!(
            use_case.get_dataset(ids[0]).await,
            Err(AppError::NotFound(_))
        ));
        assert!(use_case.list_history(&Scope::Global).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_for_stored_dataset() {
        let store: SharedDatasetStore =
            Arc::new(SqliteDatasetStore::connect("sqlite::memory:").await.unwrap());
        let use_case = use_case(store);

        let stored = use_case
            .ingest(upload(SAMPLE), None, Scope::Global)
            .await
            .unwrap();
        let pdf = use_case.render_report_by_id(stored.id).await.unwrap();

        assert!(pdf.starts_with(b"%PDF"));
        assert!(matches!(
            use_case.render_report_by_id(DatasetId(9999)).await,
            Err(AppError::NotFound(_))
        ));
    }
}
