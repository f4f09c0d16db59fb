//! Department endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use celsched_common::models::{
    Department, LogMetadata, LogType, Membership, MembershipType, MetaKey, Severity,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::auth::Claims;
use super::volunteers::validate_name;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// A department starts with one head and optional members, all by volunteer id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    pub department_name: String,
    pub initial_head_id: String,
    #[serde(default)]
    pub volunteer_members: Vec<String>,
}

/// Partial update; memberships change through the member endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartmentRequest {
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default)]
    pub is_disabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    #[serde(alias = "volunteerID")]
    pub volunteer_id: String,
    #[serde(default)]
    pub membership_type: Option<MembershipType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberTypeRequest {
    pub membership_type: MembershipType,
}

async fn load(state: &AppState, id: &str) -> ApiResult<Department> {
    state
        .store
        .departments
        .get_department(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Department not found".to_string()))
}

/// Like [`load`], but a soft-deleted department counts as missing
async fn load_active(state: &AppState, id: &str) -> ApiResult<Department> {
    let department = load(state, id).await?;
    if department.is_disabled {
        return Err(ApiError::NotFound("Department not found".to_string()));
    }
    Ok(department)
}

fn not_a_member(department: &Department, volunteer_id: &str) -> ApiError {
    ApiError::NotFound(format!(
        "Volunteer {} not found in department {}",
        volunteer_id, department.id
    ))
}

/// 400 if dropping this membership would leave the department without a head
fn ensure_other_head(department: &Department, volunteer_id: &str) -> ApiResult<()> {
    let other_heads = department
        .volunteer_members
        .iter()
        .filter(|m| m.membership_type == MembershipType::Head && m.volunteer_id != volunteer_id)
        .count();
    if other_heads == 0 {
        return Err(ApiError::BadRequest(
            "Department must keep at least one head".to_string(),
        ));
    }
    Ok(())
}

/// 400 unless the id names a stored, enabled volunteer
async fn require_volunteer(state: &AppState, id: &str) -> ApiResult<()> {
    match state.store.volunteers.get_volunteer(id).await? {
        Some(v) if !v.is_disabled => Ok(()),
        _ => Err(ApiError::BadRequest(format!("Volunteer '{}' not found", id))),
    }
}

/// GET /api/departments
pub async fn list_departments(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Department>>> {
    Ok(Json(state.store.departments.list_departments().await?))
}

/// GET /api/departments/:id
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Department>> {
    Ok(Json(load(&state, &id).await?))
}

/// POST /api/departments
pub async fn create_department(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    payload: Result<Json<CreateDepartmentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    let Json(request) = payload?;
    let name = validate_name("departmentName", &request.department_name)?;

    let head_id = request.initial_head_id.trim().to_string();
    require_volunteer(&state, &head_id).await?;

    let mut members = vec![Membership::new(head_id.clone(), MembershipType::Head)];
    for id in &request.volunteer_members {
        let id = id.trim();
        if members.iter().any(|m| m.volunteer_id == id) {
            continue;
        }
        require_volunteer(&state, id).await?;
        members.push(Membership::new(id, MembershipType::Member));
    }

    let department = Department::new(name, members);
    state.store.departments.create_department(&department).await?;
    info!(
        department_id = %department.id,
        members = department.volunteer_members.len(),
        "Created department"
    );

    state
        .audit
        .record_for(
            &actor,
            LogType::DepartmentCreated,
            Severity::Info,
            LogMetadata::new()
                .with(MetaKey::DepartmentId, department.id.as_str())
                .with(MetaKey::DepartmentName, department.department_name.as_str())
                .with(MetaKey::MemberCount, department.volunteer_members.len()),
        )
        .await;

    Ok((StatusCode::CREATED, Json(department)))
}

/// PUT /api/departments/:id
pub async fn update_department(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateDepartmentRequest>, JsonRejection>,
) -> ApiResult<Json<Department>> {
    let Json(request) = payload?;
    let new_name = request
        .department_name
        .as_deref()
        .map(|n| validate_name("departmentName", n))
        .transpose()?;

    let mut department = load(&state, &id).await?;
    let old_name = department.department_name.clone();

    if let Some(name) = new_name {
        department.department_name = name;
    }
    if let Some(disabled) = request.is_disabled {
        department.is_disabled = disabled;
    }
    department.last_updated = Utc::now();

    state.store.departments.update_department(&department).await?;

    let mut metadata = LogMetadata::new().with(MetaKey::DepartmentId, department.id.as_str());
    if old_name != department.department_name {
        metadata.insert(MetaKey::OldDepartmentName, old_name);
        metadata.insert(MetaKey::NewDepartmentName, department.department_name.as_str());
    } else {
        metadata.insert(MetaKey::DepartmentName, department.department_name.as_str());
    }
    state
        .audit
        .record_for(&actor, LogType::DepartmentUpdated, Severity::Info, metadata)
        .await;

    Ok(Json(department))
}

/// POST /api/departments/:id/members
pub async fn add_department_member(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<AddMemberRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let volunteer_id = request.volunteer_id.trim().to_string();
    let membership_type = request.membership_type.unwrap_or(MembershipType::Member);

    let mut department = load_active(&state, &id).await?;
    if department.has_member(&volunteer_id) {
        return Err(ApiError::BadRequest(format!(
            "Volunteer {} is already a member of this department",
            volunteer_id
        )));
    }
    require_volunteer(&state, &volunteer_id).await?;

    department
        .volunteer_members
        .push(Membership::new(volunteer_id.clone(), membership_type));
    department.last_updated = Utc::now();
    state.store.departments.update_department(&department).await?;
    info!(
        department_id = %department.id,
        volunteer_id = %volunteer_id,
        membership_type = membership_type.as_str(),
        "Added department member"
    );

    state
        .audit
        .record_for(
            &actor,
            LogType::DepartmentMemberAdded,
            Severity::Info,
            LogMetadata::new()
                .with(MetaKey::DepartmentId, department.id.as_str())
                .with(MetaKey::DepartmentName, department.department_name.as_str())
                .with(MetaKey::VolunteerId, volunteer_id)
                .with(MetaKey::MembershipType, membership_type.as_str()),
        )
        .await;

    Ok(Json(json!({ "message": "Member added successfully" })))
}

/// PUT /api/departments/:id/members/:volunteer_id
pub async fn update_member_type(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    Path((id, volunteer_id)): Path<(String, String)>,
    payload: Result<Json<UpdateMemberTypeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let mut department = load_active(&state, &id).await?;

    let old_type = department
        .volunteer_members
        .iter()
        .find(|m| m.volunteer_id == volunteer_id)
        .map(|m| m.membership_type)
        .ok_or_else(|| not_a_member(&department, &volunteer_id))?;

    if old_type == MembershipType::Head && request.membership_type != MembershipType::Head {
        ensure_other_head(&department, &volunteer_id)?;
    }

    let now = Utc::now();
    if let Some(membership) = department.member_mut(&volunteer_id) {
        membership.membership_type = request.membership_type;
        membership.last_updated = now;
    }
    department.last_updated = now;
    state.store.departments.update_department(&department).await?;

    state
        .audit
        .record_for(
            &actor,
            LogType::DepartmentMemberUpdated,
            Severity::Info,
            LogMetadata::new()
                .with(MetaKey::DepartmentId, department.id.as_str())
                .with(MetaKey::VolunteerId, volunteer_id.as_str())
                .with(MetaKey::OldMembershipType, old_type.as_str())
                .with(MetaKey::NewMembershipType, request.membership_type.as_str()),
        )
        .await;

    Ok(Json(json!({ "message": "Member type updated successfully" })))
}

/// DELETE /api/departments/:id/members/:volunteer_id
pub async fn remove_department_member(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    Path((id, volunteer_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let mut department = load_active(&state, &id).await?;
    let membership = department
        .remove_member(&volunteer_id)
        .ok_or_else(|| not_a_member(&department, &volunteer_id))?;
    if membership.membership_type == MembershipType::Head {
        ensure_other_head(&department, &volunteer_id)?;
    }

    department.last_updated = Utc::now();
    state.store.departments.update_department(&department).await?;
    info!(
        department_id = %department.id,
        volunteer_id = %volunteer_id,
        "Removed department member"
    );

    state
        .audit
        .record_for(
            &actor,
            LogType::DepartmentMemberRemoved,
            Severity::Warning,
            LogMetadata::new()
                .with(MetaKey::DepartmentId, department.id.as_str())
                .with(MetaKey::DepartmentName, department.department_name.as_str())
                .with(MetaKey::VolunteerId, volunteer_id.as_str())
                .with(MetaKey::MembershipType, membership.membership_type.as_str()),
        )
        .await;

    Ok(Json(json!({ "message": "Member removed successfully" })))
}

/// DELETE /api/departments/:id (soft delete)
pub async fn delete_department(
    State(state): State<AppState>,
    Extension(actor): Extension<Claims>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let mut department = load(&state, &id).await?;
    if department.is_disabled {
        return Err(ApiError::NotFound(
            "Department is already deleted".to_string(),
        ));
    }

    department.is_disabled = true;
    department.last_updated = Utc::now();
    state.store.departments.update_department(&department).await?;
    info!(department_id = %department.id, "Disabled department");

    state
        .audit
        .record_for(
            &actor,
            LogType::DepartmentDeleted,
            Severity::Warning,
            LogMetadata::new()
                .with(MetaKey::DepartmentId, department.id.as_str())
                .with(MetaKey::DepartmentName, department.department_name.as_str()),
        )
        .await;

    Ok(Json(json!({
        "message": format!("Department {} deleted successfully", department.id)
    })))
}
