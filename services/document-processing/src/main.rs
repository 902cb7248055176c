//! Vehicle Tracker Document Processing Service
//!
//! Accepts scans of compliance documents and suggests their expiry date
//! from the recognized text.

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use vtrack_utils::{init_logging, log_error, AppConfig, ErrorResponse, VtrackError};

mod extraction;
mod ocr;
mod pdf_processor;

use extraction::{DocumentIntake, ScanOutcome};
use ocr::{OcrEngine, TesseractOcr};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting Vehicle Tracker Document Processing Service");

    let ocr = TesseractOcr::detect(&config.ocr)
        .await
        .map(|engine| Arc::new(engine) as Arc<dyn OcrEngine>);
    let intake = DocumentIntake::new(ocr, config.uploads.clone());

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/expiry/infer", post(infer_expiry))
        .route("/api/v1/documents/scan", post(scan_document))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(config.server.max_request_size)),
        )
        .with_state(intake);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Document Processing Service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log_error!(e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    Ok(())
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(error: VtrackError) -> ApiError {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error.into()))
}

async fn health_check(State(intake): State<DocumentIntake>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "document-processing",
        "ocr_available": intake.ocr_available(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
pub struct InferRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct InferResponse {
    pub expiry_date: Option<NaiveDate>,
    /// `dd/mm/YYYY`
    pub formatted: Option<String>,
}

async fn infer_expiry(
    State(intake): State<DocumentIntake>,
    Json(request): Json<InferRequest>,
) -> Json<InferResponse> {
    let inferred = intake.suggest_expiry(&request.text);
    Json(InferResponse {
        expiry_date: inferred.as_ref().map(|i| i.date),
        formatted: inferred.as_ref().map(|i| i.formatted()),
    })
}

async fn scan_document(
    State(intake): State<DocumentIntake>,
    mut multipart: Multipart,
) -> Result<Json<ScanOutcome>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut manual_expiry = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(VtrackError::validation("file", format!("Upload error: {}", e))))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(|e| {
                    api_error(VtrackError::validation("file", format!("Read error: {}", e)))
                })?;
                file = Some((file_name, data.to_vec()));
            }
            Some("expiry_date") => {
                let raw = field.text().await.map_err(|e| {
                    api_error(VtrackError::validation("expiry_date", e.to_string()))
                })?;
                manual_expiry = parse_manual_expiry(&raw).map_err(api_error)?;
            }
            _ => {}
        }
    }

    let (file_name, data) = file
        .ok_or_else(|| api_error(VtrackError::validation("file", "No file provided")))?;

    let outcome = intake
        .scan(&file_name, data, manual_expiry)
        .await
        .map_err(api_error)?;
    Ok(Json(outcome))
}

/// Blank means "not given"; anything else must be `YYYY-MM-DD`.
fn parse_manual_expiry(raw: &str) -> Result<Option<NaiveDate>, VtrackError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| VtrackError::validation("expiry_date", "Expected YYYY-MM-DD"))
}
