use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::ACCEPTED_EXTENSIONS;
use crate::models::document::{Document, UploadedFile};
use crate::models::screening::{ProgressState, SkillSet};
use crate::screening::orchestrator::{ScreeningOutcome, ScreeningRequest};
use crate::state::AppState;

const FALLBACK_MIME: &str = "application/octet-stream";

/// POST /api/v1/documents
/// Every file part is registered and extraction starts in the background.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Document>>), AppError> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field.content_type().unwrap_or(FALLBACK_MIME).to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read {file_name}: {e}")))?;

        if bytes.len() > state.config.max_upload_bytes {
            return Err(AppError::Validation(format!(
                "{file_name} is {} bytes, the limit is {}",
                bytes.len(),
                state.config.max_upload_bytes
            )));
        }

        let upload = UploadedFile::new(file_name, mime_type, bytes);
        match upload.extension() {
            Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => uploads.push(upload),
            _ => {
                warn!(file_name = %upload.file_name, "Rejected upload with unsupported extension");
                return Err(AppError::Validation(format!(
                    "{} is not a supported format (accepted: {})",
                    upload.file_name,
                    ACCEPTED_EXTENSIONS.join(", ")
                )));
            }
        }
    }

    if uploads.is_empty() {
        return Err(AppError::Validation("No files were uploaded".to_string()));
    }

    // Nothing is registered unless every part passed validation.
    let ingestor = state.orchestrator.ingestor();
    let documents: Vec<Document> = uploads.into_iter().map(|u| ingestor.ingest(u)).collect();
    info!(count = documents.len(), "Uploads accepted");

    Ok((StatusCode::ACCEPTED, Json(documents)))
}

/// GET /api/v1/documents
pub async fn handle_list_documents(State(state): State<AppState>) -> Json<Vec<Document>> {
    Json(state.orchestrator.ingestor().list())
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    state
        .orchestrator
        .ingestor()
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))
}

/// DELETE /api/v1/documents/:id
pub async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .orchestrator
        .ingestor()
        .remove(id)
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SkillPreviewRequest {
    #[serde(default)]
    pub description: String,
}

/// POST /api/v1/skills/extract
pub async fn handle_extract_skills(
    State(state): State<AppState>,
    Json(req): Json<SkillPreviewRequest>,
) -> Json<SkillSet> {
    Json(state.orchestrator.preview_skills(&req.description).await)
}

/// POST /api/v1/screenings
pub async fn handle_run_screening(
    State(state): State<AppState>,
    Json(req): Json<ScreeningRequest>,
) -> Result<Json<ScreeningOutcome>, AppError> {
    let outcome = state.orchestrator.run(req).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/screenings/progress
pub async fn handle_progress(State(state): State<AppState>) -> Json<ProgressState> {
    Json(state.orchestrator.progress())
}

/// GET /api/v1/screenings/latest
pub async fn handle_latest(
    State(state): State<AppState>,
) -> Result<Json<ScreeningOutcome>, AppError> {
    state
        .orchestrator
        .latest()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No screening has completed in this session".to_string()))
}

/// POST /api/v1/session/reset
pub async fn handle_reset(State(state): State<AppState>) -> StatusCode {
    state.orchestrator.reset();
    StatusCode::NO_CONTENT
}
