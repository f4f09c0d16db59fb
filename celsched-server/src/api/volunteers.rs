//! Volunteer endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use celsched_common::models::{LogMetadata, LogType, MetaKey, Severity, Volunteer};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::auth::Claims;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CreateVolunteerRequest {
    pub name: String,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVolunteerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_disabled: Option<bool>,
}

/// Trimmed name, or 400 when its length is out of range
pub(crate) fn validate_name(field: &str, raw: &str) -> ApiResult<String> {
    let name = raw.trim();
    let chars = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&chars) {
        return Err(ApiError::BadRequest(format!(
            "{} must be between {} and {} characters",
            field, NAME_MIN_CHARS, NAME_MAX_CHARS
        )));
    }
    Ok(name.to_string())
}

async fn load(state: &AppState, id: &str) -> ApiResult<Volunteer> {
    state
        .store
        .volunteers
        .get_volunteer(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Volunteer not found".to_string()))
}

/// GET /api/volunteers
pub async fn list_volunteers(State(state): State<AppState>) -> ApiResult<Json<Vec<Volunteer>>> {
    Ok(Json(state.store.volunteers.list_volunteers().await?))
}

/// GET /api/volunteers/:id
pub async fn get_volunteer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Volunteer>> {
    Ok(Json(load(&state, &id).await?))
}

/// POST /api/volunteers
pub async fn create_volunteer(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    payload: Result<Json<CreateVolunteerRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Volunteer>)> {
    let Json(request) = payload?;
    let name = validate_name("name", &request.name)?;

    let volunteer = Volunteer::new(name);
    state.store.volunteers.create_volunteer(&volunteer).await?;
    info!(volunteer_id = %volunteer.id, "Created volunteer");

    state
        .audit
        .record_for(
            &actor,
            LogType::VolunteerCreated,
            Severity::Info,
            LogMetadata::new()
                .with(MetaKey::VolunteerId, volunteer.id.as_str())
                .with(MetaKey::VolunteerName, volunteer.name.as_str()),
        )
        .await;

    Ok((StatusCode::CREATED, Json(volunteer)))
}

/// PUT /api/volunteers/:id
pub async fn update_volunteer(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateVolunteerRequest>, JsonRejection>,
) -> ApiResult<Json<Volunteer>> {
    let Json(request) = payload?;
    let new_name = request
        .name
        .as_deref()
        .map(|n| validate_name("name", n))
        .transpose()?;

    let mut volunteer = load(&state, &id).await?;
    let old_name = volunteer.name.clone();

    if let Some(name) = new_name {
        volunteer.name = name;
    }
    if let Some(disabled) = request.is_disabled {
        volunteer.is_disabled = disabled;
    }
    volunteer.last_updated = Utc::now();

    state.store.volunteers.update_volunteer(&volunteer).await?;

    let mut metadata = LogMetadata::new().with(MetaKey::VolunteerId, volunteer.id.as_str());
    if old_name != volunteer.name {
        metadata.insert(MetaKey::OldVolunteerName, old_name);
        metadata.insert(MetaKey::NewVolunteerName, volunteer.name.as_str());
    } else {
        metadata.insert(MetaKey::VolunteerName, volunteer.name.as_str());
    }
    state
        .audit
        .record_for(&actor, LogType::VolunteerUpdated, Severity::Info, metadata)
        .await;

    Ok(Json(volunteer))
}

/// DELETE /api/volunteers/:id (soft delete)
pub async fn delete_volunteer(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let mut volunteer = load(&state, &id).await?;
    if volunteer.is_disabled {
        return Err(ApiError::NotFound("Volunteer is already deleted".to_string()));
    }

    volunteer.is_disabled = true;
    volunteer.last_updated = Utc::now();
    state.store.volunteers.update_volunteer(&volunteer).await?;
    info!(volunteer_id = %volunteer.id, "Disabled volunteer");

    state
        .audit
        .record_for(
            &actor,
            LogType::VolunteerDeleted,
            Severity::Warning,
            LogMetadata::new()
                .with(MetaKey::VolunteerId, volunteer.id.as_str())
                .with(MetaKey::VolunteerName, volunteer.name.as_str()),
        )
        .await;

    Ok(Json(json!({ "message": "Volunteer deleted successfully" })))
}
