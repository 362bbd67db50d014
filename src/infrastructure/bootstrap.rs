use std::sync::Arc;

use actix_web::web;
use tracing::{error, info};

use crate::application::{DatasetHistory, EquipmentAnalysisUseCase, RetentionPolicy};
use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::csv::EquipmentCsvParser;
use crate::infrastructure::db::open_dataset_store;
use crate::infrastructure::report::ReportRenderer;
use crate::interfaces::http::{add_log, HttpState, ScopeResolver};

/// Wire storage, use case and HTTP state from configuration.
pub async fn build_state(config: &AppConfig) -> Result<web::Data<HttpState>> {
    let store = open_dataset_store(&config.database).await.map_err(|err| {
        error!(error = %err, url = %config.database.url, "Failed to open dataset store");
        err
    })?;

    let parser = EquipmentCsvParser::new().with_delimiter(config.upload.delimiter_byte()?);
    let history = DatasetHistory::new(store, RetentionPolicy::new(config.retention.max_datasets));
    let use_case = EquipmentAnalysisUseCase::new(
        parser,
        history,
        ReportRenderer::new(config.report.sample_rows),
    );

    let state = HttpState::new(Arc::new(use_case), ScopeResolver::new(&config.auth))
        .with_max_upload_bytes(config.upload.max_bytes);
    add_log(
        &state.logs,
        "INFO",
        "Bootstrap",
        &format!(
            "Dataset store ready (retention={} per scope, {} configured users)",
            config.retention.max_datasets,
            config.auth.users.len()
        ),
    );
    info!(
        database = %config.database.url,
        retention = config.retention.max_datasets,
        sample_rows = config.report.sample_rows,
        max_upload_bytes = config.upload.max_bytes,
        "Application state initialised"
    );

    Ok(web::Data::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equipment::{Scope, UploadedFile};
    use figment::providers::{Format, Toml};

    #[tokio::test]
    async fn test_build_state_with_memory_store() {
        let config = AppConfig::from_figment(AppConfig::base_figment().merge(Toml::string(
            r#"
            [database]
            url = "memory"

            [retention]
            max_datasets = 2

            [upload]
            max_bytes = 4096
            delimiter = ";"
            "#,
        )))
        .unwrap();

        let state = build_state(&config).await.unwrap();

        assert_eq!(state.use_case.history().policy().max_per_scope(), 2);
        assert_eq!(state.logs.lock().unwrap().len(), 1);
        assert_eq!(state.max_upload_bytes, 4096);

        let dataset = state
            .use_case
            .ingest(
                UploadedFile::new(
                    Some("plant.csv".to_string()),
                    b"Equipment Name;Type;Flowrate;Pressure;Temperature\nP1;Pump;1.5;2;3\n".to_vec(),
                ),
                None,
                Scope::Global,
            )
            .await
            .unwrap();
        assert_eq!(dataset.summary.avg_flowrate, Some(1.5));
    }
}
