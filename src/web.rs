use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use log::{error, info, warn};
use serde::Serialize;

use crate::imap_probe::{probe, ConnectionOutcome};
use crate::onboarding::submission::ConnectionRequestDraft;
use crate::onboarding::{persist, validate_connection_request, validate_submission};
use crate::onboarding::{PersistError, SubmissionDraft};
use crate::settings::{Config, ProbeConfig};

pub const SUBMISSION_SAVED: &str = "Onboarding configuration saved successfully.";

/// Shared, read-only state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub output_dir: PathBuf,
    pub probe: ProbeConfig,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.onboarding.output_dir.clone(),
            probe: config.probe.clone(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Client-side problem reported as a single message.
    BadRequest(String),
    /// Every violated submission rule, one entry each.
    InvalidSubmission(Vec<String>),
    Persistence(PersistError),
    Internal(String),
}

impl From<PersistError> for ApiError {
    fn from(err: PersistError) -> Self {
        ApiError::Persistence(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

#[derive(Serialize)]
struct ErrorsBody {
    success: bool,
    errors: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::InvalidSubmission(errors) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorsBody {
                        success: false,
                        errors,
                    }),
                )
                    .into_response()
            }
            ApiError::Persistence(err) => {
                error!("Failed to persist onboarding submission: {}", err);
                let message = match err {
                    PersistError::CreateDir { .. } => {
                        "Server error: could not create output directory."
                    }
                    _ => "Server error: could not write onboarding output files.",
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error: could not write onboarding output files.".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error,
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SubmittedFiles {
    pub text: String,
    pub json: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub file_id: String,
    pub files: SubmittedFiles,
}

pub async fn test_imap(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConnectionRequestDraft>, JsonRejection>,
) -> Result<Json<ProbeResponse>, ApiError> {
    let Json(draft) = payload.map_err(|rejection| {
        ApiError::BadRequest(format!("Malformed request body: {}", rejection.body_text()))
    })?;

    let request = validate_connection_request(&draft).map_err(|errors| {
        warn!("Rejected connection test: {}", errors.join(" "));
        ApiError::BadRequest(errors.join(" "))
    })?;

    match probe(&request, &state.probe).await {
        ConnectionOutcome::Success { message, .. } => Ok(Json(ProbeResponse {
            success: true,
            message,
        })),
        ConnectionOutcome::Failure { reason } => Err(ApiError::BadRequest(reason)),
    }
}

pub async fn submit_onboarding(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmissionDraft>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(draft) = payload.map_err(|rejection| {
        ApiError::InvalidSubmission(vec![format!(
            "Malformed request body: {}",
            rejection.body_text()
        )])
    })?;

    let submission = validate_submission(&draft).map_err(|errors| {
        warn!("Rejected onboarding submission with {} error(s)", errors.len());
        ApiError::InvalidSubmission(errors)
    })?;
    info!(
        "Accepted onboarding submission for {}",
        submission.tenant.organization_name
    );

    let output_dir = state.output_dir.clone();
    let record = tokio::task::spawn_blocking(move || persist(&submission, &output_dir))
        .await
        .map_err(|e| ApiError::Internal(format!("persistence task failed: {}", e)))??;

    Ok(Json(SubmitResponse {
        success: true,
        message: SUBMISSION_SAVED.to_string(),
        file_id: record.file_id,
        files: SubmittedFiles {
            text: record.text_file,
            json: record.json_file,
        },
    }))
}

pub fn create_router(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/api/test-imap", post(test_imap))
        .route("/api/submit-onboarding", post(submit_onboarding))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// Submissions retry directory creation, so a failure here is not fatal
fn prepare_output_dir(state: &AppState) {
    if state.output_dir.is_dir() {
        return;
    }
    match fs::create_dir_all(&state.output_dir) {
        Ok(()) => info!("Created output directory: {}", state.output_dir.display()),
        Err(e) => error!(
            "Cannot create output directory {}: {}",
            state.output_dir.display(),
            e
        ),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn start_server(router: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("DOM onboarding server running on http://{}:{}", host, port);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub async fn start_web_server(config: &Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(config));
    prepare_output_dir(&state);

    let router = create_router(state, config.server.body_limit_bytes);
    start_server(router, &config.server.host, config.server.port).await
}
