//! Batch import endpoints
//!
//! `POST /api/batch-import/preview` takes a multipart upload (field `file`)
//! and returns the parsed departments plus any name conflicts. A clean
//! preview opens a session; `POST /api/batch-import/execute` consumes it.

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Multipart, State,
    },
    http::StatusCode,
    Extension, Json,
};
use celsched_common::models::{LogMetadata, LogType, MetaKey, Severity};
use tracing::{error, info, warn};

use super::auth::Claims;
use crate::error::{ApiError, ApiResult};
use crate::import::{
    count_distinct_volunteers, detect_conflicts, execute_import, is_spreadsheet_filename,
    parse_columns, read_first_sheet, BatchImportExecuteRequest, BatchImportExecuteResponse,
    BatchImportPreviewResponse, ExecuteError, ImportSession, SpreadsheetError,
};
use crate::AppState;

/// Uploaded spreadsheet
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Pull the `file` field out of the multipart body
async fn read_upload(mut multipart: Multipart) -> ApiResult<Option<Upload>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        return Ok(Some(Upload {
            file_name,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

/// POST /api/batch-import/preview
pub async fn preview_batch_import(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<BatchImportPreviewResponse>> {
    let no_file = || ApiError::BadRequest("No file uploaded".to_string());
    let multipart = multipart.map_err(|_| no_file())?;
    let upload = read_upload(multipart).await?.ok_or_else(no_file)?;

    if !is_spreadsheet_filename(&upload.file_name) {
        return Err(ApiError::BadRequest(
            "Invalid file format. Please upload an Excel file (.xlsx or .xls)".to_string(),
        ));
    }

    let file_size = upload.bytes.len();
    let rows = tokio::task::spawn_blocking(move || read_first_sheet(upload.bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Spreadsheet decoder failed: {}", e)))?
        .map_err(|e| match e {
            SpreadsheetError::ReadSheet(_) => ApiError::Internal(e.to_string()),
            _ => ApiError::BadRequest(e.to_string()),
        })?;

    let parsed = parse_columns(&rows);
    if !parsed.is_valid() {
        info!(
            file_name = %upload.file_name,
            errors = parsed.errors.len(),
            "Batch import preview rejected by validation"
        );
        return Ok(Json(BatchImportPreviewResponse::rejected(parsed.errors)));
    }

    let conflicts = detect_conflicts(&state.store, &parsed.departments)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to detect conflicts: {}", e)))?;

    let total_volunteers = count_distinct_volunteers(&parsed.departments);
    let total_departments = parsed.departments.len();

    let session = ImportSession::new(parsed.departments.clone());
    let session_id = session.id;
    state.sessions.put(session).await;

    info!(
        session_id = %session_id,
        file_name = %upload.file_name,
        departments = total_departments,
        volunteers = total_volunteers,
        conflicts = conflicts.len(),
        "Batch import preview ready"
    );

    state
        .audit
        .record_for(
            &actor,
            LogType::BatchImportStarted,
            Severity::Info,
            LogMetadata::new()
                .with(MetaKey::FileName, upload.file_name.as_str())
                .with(MetaKey::FileSize, file_size)
                .with(MetaKey::RowCount, rows.len())
                .with(MetaKey::SessionId, session_id)
                .with(MetaKey::TotalVolunteers, total_volunteers)
                .with(MetaKey::TotalDepartments, total_departments),
        )
        .await;

    Ok(Json(BatchImportPreviewResponse {
        departments: parsed.departments,
        conflicts,
        validation_errors: Vec::new(),
        total_volunteers,
        total_departments,
        session_id: Some(session_id),
    }))
}

/// POST /api/batch-import/execute
///
/// The session is consumed for the duration of the run and put back if the
/// run fails, so a failed import can be retried while the session is live.
pub async fn execute_batch_import(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    payload: Result<Json<BatchImportExecuteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BatchImportExecuteResponse>)> {
    let Json(request) = payload?;
    let session_id = request.session_id;

    let session = state
        .sessions
        .remove(session_id)
        .await
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired session".to_string()))?;

    match execute_import(&state.store, &session.departments, &request.resolutions).await {
        Ok(outcome) => {
            let volunteers_created = outcome.created_volunteer_ids.len();
            let departments_created = outcome.created_department_ids.len();
            info!(
                session_id = %session_id,
                volunteers_created,
                volunteers_reused = outcome.volunteers_reused,
                departments_created,
                "Batch import completed"
            );

            state
                .audit
                .record_for(
                    &actor,
                    LogType::BatchImportCompleted,
                    Severity::Info,
                    LogMetadata::new()
                        .with(MetaKey::SessionId, session_id)
                        .with(MetaKey::SuccessCount, volunteers_created + departments_created)
                        .with(MetaKey::VolunteersCreated, volunteers_created)
                        .with(MetaKey::VolunteersReused, outcome.volunteers_reused)
                        .with(MetaKey::DepartmentsCreated, departments_created),
                )
                .await;

            Ok((
                StatusCode::OK,
                Json(BatchImportExecuteResponse::succeeded(
                    outcome.created_department_ids,
                    outcome.created_volunteer_ids,
                    outcome.volunteers_reused,
                )),
            ))
        }
        Err(err @ ExecuteError::MissingVolunteerId(_)) => {
            state.sessions.put(session).await;
            warn!(session_id = %session_id, "Batch import rejected: {}", err);
            Err(ApiError::BadRequest(err.to_string()))
        }
        Err(ExecuteError::Stage(failure)) => {
            state.sessions.put(session).await;
            error!(
                session_id = %session_id,
                stage = %failure.stage,
                volunteers_created = failure.volunteers_created,
                departments_created = failure.departments_created,
                "Batch import failed: {}",
                failure.message
            );

            state
                .audit
                .record_for(
                    &actor,
                    LogType::BatchImportFailed,
                    Severity::Error,
                    LogMetadata::new()
                        .with(MetaKey::SessionId, session_id)
                        .with(MetaKey::Stage, failure.stage.as_str())
                        .with(MetaKey::ErrorMessage, failure.message.as_str())
                        .with(MetaKey::VolunteersCreated, failure.volunteers_created)
                        .with(MetaKey::DepartmentsCreated, failure.departments_created),
                )
                .await;

            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(BatchImportExecuteResponse::failed(failure.to_string())),
            ))
        }
    }
}
