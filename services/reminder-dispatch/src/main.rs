//! Vehicle Tracker Reminder Dispatch Service
//!
//! Sends one daily e-mail per owner listing the documents that are expired
//! or about to expire, and exposes a manual trigger plus an expiry summary.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Local;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use vtrack_database::{
    postgres_health_check, DocumentRepository, PostgresPool, ReminderLogRepository,
    UserRepository, VehicleRepository,
};
use vtrack_models::{ExpirySummary, ReminderLogEntry};
use vtrack_utils::{init_logging, log_error, AppConfig, ErrorResponse, VtrackError};

mod batch;
mod eligibility;
mod scheduler;
mod service;
mod smtp_client;
mod store;
mod template_engine;
#[cfg(test)]
mod testing;

use scheduler::ReminderScheduler;
use service::{ReminderService, SweepReport};
use smtp_client::SmtpClient;
use store::PgReminderStore;
use template_engine::ReminderTemplates;

#[derive(Clone)]
pub struct AppState {
    pool: PostgresPool,
    scheduler: ReminderScheduler,
    users: UserRepository,
    vehicles: VehicleRepository,
    documents: DocumentRepository,
    reminder_logs: ReminderLogRepository,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting Vehicle Tracker Reminder Dispatch Service");

    let db_config = vtrack_database::DatabaseConfig {
        postgres_url: config.database.normalized_url(),
        max_connections: config.database.max_connections,
        connection_timeout: std::time::Duration::from_secs(
            config.database.connection_timeout_seconds,
        ),
    };
    let pool = vtrack_database::initialize_database(&db_config).await?;
    info!("Database connection established");

    let mailer = Arc::new(SmtpClient::new(&config.email)?);
    let service = ReminderService::new(
        Arc::new(PgReminderStore::new(pool.clone())),
        mailer,
        ReminderTemplates::new(config.reminders.subject.clone()),
        config.reminders.max_concurrent_batches,
    );
    let scheduler = ReminderScheduler::new(service, &config.reminders.schedule)?;

    if config.reminders.enabled {
        scheduler.start();
        if let Some(next) = scheduler.next_fire_time() {
            info!(next = %next, schedule = %config.reminders.schedule, "Daily reminders enabled");
        }
    } else {
        info!("Scheduled reminders disabled by configuration");
    }

    let app = create_app(pool, scheduler.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Reminder Dispatch Service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    Ok(())
}

fn create_app(pool: PostgresPool, scheduler: ReminderScheduler) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/reminders/run", post(run_reminders))
        .route("/api/v1/reminders/status", get(reminder_status))
        .route("/api/v1/users/:user_id/expiry-summary", get(expiry_summary))
        .route("/api/v1/documents/:document_id/reminders", get(reminder_history))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(AppState {
            scheduler,
            users: UserRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool.clone()),
            documents: DocumentRepository::new(pool.clone()),
            reminder_logs: ReminderLogRepository::new(pool.clone()),
            pool,
        })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log_error!(e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(error: VtrackError) -> ApiError {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error.into()))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match postgres_health_check(&state.pool).await {
        Ok(()) => "up",
        Err(e) => {
            log_error!(e, "Database health check failed");
            "down"
        }
    };
    Json(serde_json::json!({
        "status": if database == "up" { "healthy" } else { "degraded" },
        "service": "reminder-dispatch",
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn run_reminders(State(state): State<AppState>) -> Result<Json<SweepReport>, ApiError> {
    match state.scheduler.run_now().await {
        None => Err(api_error(VtrackError::conflict(
            "A reminder sweep is already running",
        ))),
        Some(Err(e)) => {
            log_error!(e, "Manual reminder sweep failed");
            Err(api_error(VtrackError::scheduler(format!("{:#}", e))))
        }
        Some(Ok(report)) => Ok(Json(report)),
    }
}

async fn reminder_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "state": state.scheduler.state(),
        "next_run": state.scheduler.next_fire_time().map(|t| t.to_rfc3339()),
    }))
}

async fn expiry_summary(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ExpirySummary>, ApiError> {
    let internal = |e: anyhow::Error| api_error(VtrackError::database(format!("{:#}", e)));

    state
        .users
        .find_by_id(user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| api_error(VtrackError::not_found(format!("user {}", user_id))))?;

    let vehicles = state
        .vehicles
        .find_active_by_user(user_id)
        .await
        .map_err(internal)?;
    let documents = state
        .documents
        .find_active_with_expiry_by_user(user_id)
        .await
        .map_err(internal)?;

    let today = Local::now().date_naive();
    Ok(Json(ExpirySummary::from_documents(&vehicles, &documents, today)))
}

async fn reminder_history(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Vec<ReminderLogEntry>>, ApiError> {
    let internal = |e: anyhow::Error| api_error(VtrackError::database(format!("{:#}", e)));

    state
        .documents
        .find_by_id(document_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| api_error(VtrackError::not_found(format!("document {}", document_id))))?;

    let entries = state
        .reminder_logs
        .find_by_document(document_id)
        .await
        .map_err(internal)?;
    Ok(Json(entries))
}
