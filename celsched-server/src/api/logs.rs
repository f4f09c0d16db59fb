//! Audit log listing

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use celsched_common::models::{LogCategory, LogType, Severity, SystemLog};
use celsched_common::repository::LogFilter;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::AppState;

const MAX_LIMIT: u32 = 500;

/// Query string for GET /api/logs
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub log_type: Option<LogType>,
    pub category: Option<LogCategory>,
    pub severity: Option<Severity>,
}

/// Query string for the per-volunteer and per-department log views
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Default filter with the requested page applied
fn paged(limit: Option<u32>, offset: Option<u32>) -> LogFilter {
    let defaults = LogFilter::default();
    let limit = match limit {
        Some(0) | None => defaults.limit,
        Some(n) => n.min(MAX_LIMIT),
    };
    LogFilter {
        limit,
        offset: offset.unwrap_or(defaults.offset),
        ..defaults
    }
}

impl From<LogQuery> for LogFilter {
    fn from(query: LogQuery) -> Self {
        LogFilter {
            log_type: query.log_type,
            category: query.category,
            severity: query.severity,
            ..paged(query.limit, query.offset)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub logs: Vec<SystemLog>,
    pub total: u64,
}

/// GET /api/logs
///
/// Newest first. Unknown enum values in the query string are a 400.
pub async fn list_logs(
    State(state): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> ApiResult<Json<LogListResponse>> {
    let Query(query) = query?;
    let filter = LogFilter::from(query);
    let (logs, total) = state.store.logs.list_logs(&filter).await?;
    Ok(Json(LogListResponse { logs, total }))
}

/// GET /api/volunteers/:id/logs
pub async fn list_volunteer_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<LogListResponse>> {
    let Query(page) = query?;
    let filter = LogFilter {
        volunteer_id: Some(id),
        ..paged(page.limit, page.offset)
    };
    let (logs, total) = state.store.logs.list_logs(&filter).await?;
    Ok(Json(LogListResponse { logs, total }))
}

/// GET /api/departments/:id/logs
pub async fn list_department_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<LogListResponse>> {
    let Query(page) = query?;
    let filter = LogFilter {
        department_id: Some(id),
        ..paged(page.limit, page.offset)
    };
    let (logs, total) = state.store.logs.list_logs(&filter).await?;
    Ok(Json(LogListResponse { logs, total }))
}
