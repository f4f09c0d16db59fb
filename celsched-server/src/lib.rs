//! celsched-server library
//!
//! HTTP service for volunteers, departments, the audit log and the
//! spreadsheet batch import of departments.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use celsched_common::Store;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod audit;
pub mod error;
pub mod import;

use api::JwtKeys;
use audit::AuditLogger;
use import::SessionStore;

/// Largest accepted spreadsheet upload
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Origins of the development frontends, always allowed by CORS
const DEV_ORIGINS: [&str; 5] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
    "http://192.168.56.1:5173",
];

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    /// Import sessions awaiting execute
    pub sessions: Arc<dyn SessionStore>,
    pub audit: AuditLogger,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(store: Store, sessions: Arc<dyn SessionStore>, jwt: JwtKeys) -> Self {
        let audit = AuditLogger::new(store.logs.clone());
        Self {
            store,
            sessions,
            audit,
            jwt,
        }
    }
}

/// Build application router
///
/// Reads are public; every mutation and the log viewer require an admin token.
pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/volunteers", post(api::create_volunteer))
        .route(
            "/api/volunteers/:id",
            put(api::update_volunteer).delete(api::delete_volunteer),
        )
        .route("/api/volunteers/:id/logs", get(api::list_volunteer_logs))
        .route("/api/departments", post(api::create_department))
        .route(
            "/api/departments/:id",
            put(api::update_department).delete(api::delete_department),
        )
        .route("/api/departments/:id/logs", get(api::list_department_logs))
        .route(
            "/api/departments/:id/members",
            post(api::add_department_member),
        )
        .route(
            "/api/departments/:id/members/:volunteer_id",
            put(api::update_member_type).delete(api::remove_department_member),
        )
        .route("/api/logs", get(api::list_logs))
        .route("/api/batch-import/preview", post(api::preview_batch_import))
        .route("/api/batch-import/execute", post(api::execute_batch_import))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        // layers run bottom-up: authenticate first, then check the role
        .layer(middleware::from_fn(api::require_admin))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_auth,
        ));

    let public = Router::new()
        .route("/api/volunteers", get(api::list_volunteers))
        .route("/api/volunteers/:id", get(api::get_volunteer))
        .route("/api/departments", get(api::list_departments))
        .route("/api/departments/:id", get(api::get_department))
        .merge(api::health_routes());

    Router::new()
        .merge(public)
        .merge(admin)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// CORS policy: development origins plus the configured frontend
pub fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = DEV_ORIGINS
        .into_iter()
        .map(HeaderValue::from_static)
        .collect();

    if let Some(url) = frontend_url {
        match HeaderValue::from_str(url.trim_end_matches('/')) {
            Ok(origin) => origins.push(origin),
            Err(e) => warn!("Ignoring invalid FRONTEND_URL '{}': {}", url, e),
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 3600))
}
