//! HTTP client for the equipment API.
//!
//! Every call goes through an explicit [`ApiClientConfig`]; there is no shared
//! default endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::domain::equipment::{DatasetId, StoredDataset};
use crate::domain::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiClientConfig {
    /// Root of the service, e.g. `http://127.0.0.1:8000/api`
    pub base_url: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    missing: Option<Vec<String>>,
    #[serde(default)]
    expected: Vec<String>,
}

/// Map a non-success response onto the error the server raised.
fn status_error(status: StatusCode, text: String) -> AppError {
    let body = serde_json::from_str::<ErrorBody>(&text).ok();

    if status == StatusCode::BAD_REQUEST {
        if let Some(ErrorBody {
            missing: Some(missing),
            expected,
            ..
        }) = body
        {
            return AppError::MissingColumns { missing, expected };
        }
    }

    let message = body.map(|b| b.error).unwrap_or(text);
    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::BAD_REQUEST => AppError::ValidationError(message),
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(message),
        _ => AppError::HttpError(format!("API error ({}): {}", status, message)),
    }
}

pub struct EquipmentApiClient {
    client: reqwest::Client,
    config: ApiClientConfig,
}

impl EquipmentApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::HttpError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Absolute URL for an API path such as `summary/3/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AppError::HttpError(format!("Request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::HttpError(format!("API error ({}): failed to read body: {}", status, e))
        })?;

        Err(status_error(status, text))
    }

    async fn read_dataset(response: Response) -> Result<StoredDataset> {
        response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse JSON: {}", e)))
    }

    /// Upload a CSV file; `name` defaults server-side to the file name.
    pub async fn upload_csv(&self, path: &Path, name: Option<&str>) -> Result<StoredDataset> {
        let content = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());

        let part = Part::bytes(content)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(|e| AppError::HttpError(format!("Invalid content type: {}", e)))?;
        let mut form = Form::new().part("file", part);
        if let Some(name) = name {
            form = form.text("name", name.to_string());
        }

        let request = self.client.post(self.endpoint("upload/")).multipart(form);
        Self::read_dataset(self.send(request).await?).await
    }

    pub async fn get_summary(&self, id: DatasetId) -> Result<StoredDataset> {
        let request = self.client.get(self.endpoint(&format!("summary/{}/", id)));
        Self::read_dataset(self.send(request).await?).await
    }

    pub async fn get_history(&self) -> Result<Vec<StoredDataset>> {
        let request = self.client.get(self.endpoint("history/"));
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse JSON: {}", e)))
    }

    /// Download the PDF report to `save_path`, returning the written path.
    pub async fn download_pdf(&self, id: DatasetId, save_path: &Path) -> Result<PathBuf> {
        let request = self.client.get(self.endpoint(&format!("report/{}/pdf/", id)));
        let bytes = self
            .send(request)
            .await?
            .bytes()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read report: {}", e)))?;

        tokio::fs::write(save_path, &bytes).await?;
        Ok(save_path.to_path_buf())
    }
}
