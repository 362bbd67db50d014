pub mod auth;

use std::sync::{Arc, Mutex, MutexGuard};

use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{dev::Server, get, post, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use chrono::Local;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::EquipmentAnalysisUseCase;
use crate::domain::equipment::{DatasetId, Scope, UploadedFile};
use crate::domain::error::AppError;
use crate::infrastructure::config::{ServerConfig, MAX_UPLOAD_BYTES};

pub use auth::{AuthRejection, ScopeResolver};

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub use_case: Arc<EquipmentAnalysisUseCase>,
    pub scopes: ScopeResolver,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
    pub max_upload_bytes: usize,
}

impl HttpState {
    pub fn new(use_case: Arc<EquipmentAnalysisUseCase>, scopes: ScopeResolver) -> Self {
        Self {
            use_case,
            scopes,
            logs: Arc::new(Mutex::new(Vec::new())),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

fn error_body(message: impl Into<String>) -> serde_json::Value {
    json!({ "error": message.into() })
}

fn error_response(err: &AppError) -> HttpResponse {
    match err {
        AppError::NotFound(_) => HttpResponse::NotFound().json(error_body("Dataset not found")),
        AppError::PayloadTooLarge(_) => {
            HttpResponse::PayloadTooLarge().json(error_body(err.to_string()))
        }
        AppError::MissingColumns { missing, expected } => {
            HttpResponse::BadRequest().json(json!({
                "error": err.to_string(),
                "missing": missing,
                "expected": expected,
            }))
        }
        e if e.is_client_error() => HttpResponse::BadRequest().json(error_body(e.to_string())),
        e => HttpResponse::InternalServerError().json(error_body(e.to_string())),
    }
}

fn request_scope(req: &HttpRequest, data: &HttpState) -> Result<Scope, HttpResponse> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    data.scopes.resolve(authorization).map_err(|rejection| {
        add_log(
            &data.logs,
            "WARN",
            "Auth",
            &format!("Rejected request to {}: {}", req.path(), rejection),
        );
        HttpResponse::Unauthorized()
            .insert_header((header::WWW_AUTHENTICATE, "Basic realm=\"equipment\""))
            .json(error_body(rejection.to_string()))
    })
}

/// Collect the `file` and optional `name` parts of an upload form.
///
/// Reading stops as soon as the parts together exceed `max_bytes`.
async fn read_upload_form(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<(Option<UploadedFile>, Option<String>), AppError> {
    let mut file = None;
    let mut name = None;
    let mut total = 0usize;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {}", e)))?
    {
        let disposition = field.content_disposition().cloned();
        let field_name = disposition
            .as_ref()
            .and_then(|d| d.get_name())
            .unwrap_or_default()
            .to_string();
        let file_name = disposition
            .as_ref()
            .and_then(|d| d.get_filename())
            .map(str::to_string);

        let mut content = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::ValidationError(format!("Failed to read upload: {}", e)))?
        {
            total = total.saturating_add(chunk.len());
            if total > max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "upload exceeds {} bytes",
                    max_bytes
                )));
            }
            content.extend_from_slice(&chunk);
        }

        match field_name.as_str() {
            "file" => file = Some(UploadedFile::new(file_name, content)),
            "name" => name = Some(String::from_utf8_lossy(&content).into_owned()),
            _ => {}
        }
    }

    Ok((file, name))
}

#[post("/upload/")]
async fn upload(
    req: HttpRequest,
    data: web::Data<HttpState>,
    payload: Multipart,
) -> impl Responder {
    let scope = match request_scope(&req, &data) {
        Ok(scope) => scope,
        Err(response) => return response,
    };

    let (file, name) = match read_upload_form(payload, data.max_upload_bytes).await {
        Ok(form) => form,
        Err(e) => {
            add_log(&data.logs, "WARN", "Upload", &format!("Rejected upload: {}", e));
            return error_response(&e);
        }
    };
    let Some(file) = file else {
        return HttpResponse::BadRequest().json(error_body("No file provided"));
    };

    add_log(
        &data.logs,
        "INFO",
        "Upload",
        &format!(
            "Ingesting {} ({} bytes, scope={})",
            file.file_name.as_deref().unwrap_or("<unnamed>"),
            file.content.len(),
            scope
        ),
    );

    match data.use_case.ingest(file, name, scope).await {
        Ok(dataset) => {
            add_log(
                &data.logs,
                "INFO",
                "Upload",
                &format!(
                    "Stored dataset {} '{}' with {} rows",
                    dataset.id, dataset.name, dataset.summary.total_count
                ),
            );
            HttpResponse::Created().json(dataset)
        }
        Err(e) => {
            add_log(&data.logs, "ERROR", "Upload", &format!("Upload failed: {}", e));
            error_response(&e)
        }
    }
}

#[get("/summary/{id}/")]
async fn summary(
    req: HttpRequest,
    data: web::Data<HttpState>,
    path: web::Path<i64>,
) -> impl Responder {
    if let Err(response) = request_scope(&req, &data) {
        return response;
    }

    match data.use_case.get_dataset(DatasetId(path.into_inner())).await {
        Ok(dataset) => HttpResponse::Ok().json(dataset),
        Err(e) => error_response(&e),
    }
}

#[get("/history/")]
async fn history(req: HttpRequest, data: web::Data<HttpState>) -> impl Responder {
    let scope = match request_scope(&req, &data) {
        Ok(scope) => scope,
        Err(response) => return response,
    };

    match data.use_case.list_history(&scope).await {
        Ok(datasets) => HttpResponse::Ok().json(datasets),
        Err(e) => {
            add_log(&data.logs, "ERROR", "History", &format!("Listing failed: {}", e));
            error_response(&e)
        }
    }
}

#[get("/report/{id}/pdf/")]
async fn report_pdf(
    req: HttpRequest,
    data: web::Data<HttpState>,
    path: web::Path<i64>,
) -> impl Responder {
    if let Err(response) = request_scope(&req, &data) {
        return response;
    }

    let id = DatasetId(path.into_inner());
    match data.use_case.render_report_by_id(id).await {
        Ok(bytes) => {
            add_log(
                &data.logs,
                "INFO",
                "Report",
                &format!("Rendered report for dataset {} ({} bytes)", id, bytes.len()),
            );
            HttpResponse::Ok()
                .content_type("application/pdf")
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"equipment_report_{}.pdf\"", id),
                ))
                .body(bytes)
        }
        Err(e) => error_response(&e),
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = lock_logs(&data.logs);
    HttpResponse::Ok().json(&*logs)
}

fn lock_logs(logs: &Mutex<Vec<LogEntry>>) -> MutexGuard<'_, Vec<LogEntry>> {
    logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = lock_logs(logs);
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// Register the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(upload)
            .service(summary)
            .service(history)
            .service(report_pdf)
            .service(get_logs),
    );
}

pub fn start_server(config: &ServerConfig, state: web::Data<HttpState>) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        // The web front end is served from a different origin.
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    Ok(server)
}
