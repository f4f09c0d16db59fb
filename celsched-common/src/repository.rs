//! Repository traits for the document store
//!
//! Handlers and the import workflow only see these traits, bundled in
//! [`Store`]. The shipped backend is SQLite (see [`crate::db`]); tests swap
//! individual repositories for fakes.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::db::{SqliteDepartmentRepository, SqliteLogRepository, SqliteVolunteerRepository};
use crate::models::{Department, LogCategory, LogType, Severity, SystemLog, Volunteer};
use crate::Result;

/// Volunteer collection
#[async_trait]
pub trait VolunteerRepository: Send + Sync {
    async fn create_volunteer(&self, volunteer: &Volunteer) -> Result<()>;

    async fn get_volunteer(&self, id: &str) -> Result<Option<Volunteer>>;

    /// Replace a stored volunteer; `Error::NotFound` if the id is unknown
    async fn update_volunteer(&self, volunteer: &Volunteer) -> Result<()>;

    /// Every volunteer, including disabled ones, oldest first
    async fn list_volunteers(&self) -> Result<Vec<Volunteer>>;
}

/// Department collection
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn create_department(&self, department: &Department) -> Result<()>;

    async fn get_department(&self, id: &str) -> Result<Option<Department>>;

    /// Replace a stored department; `Error::NotFound` if the id is unknown
    async fn update_department(&self, department: &Department) -> Result<()>;

    /// Every department, including disabled ones, oldest first
    async fn list_departments(&self) -> Result<Vec<Department>>;
}

/// Filter for listing audit log entries
#[derive(Debug, Clone)]
pub struct LogFilter {
    pub log_type: Option<LogType>,
    pub category: Option<LogCategory>,
    pub severity: Option<Severity>,
    /// Entries whose metadata names this volunteer
    pub volunteer_id: Option<String>,
    /// Entries whose metadata names this department
    pub department_id: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            log_type: None,
            category: None,
            severity: None,
            volunteer_id: None,
            department_id: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Audit log collection
#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn create_log(&self, log: &SystemLog) -> Result<()>;

    /// Matching entries newest first, plus the total number of matches
    async fn list_logs(&self, filter: &LogFilter) -> Result<(Vec<SystemLog>, u64)>;
}

/// All repositories, cheaply cloneable into handler state
#[derive(Clone)]
pub struct Store {
    pub volunteers: Arc<dyn VolunteerRepository>,
    pub departments: Arc<dyn DepartmentRepository>,
    pub logs: Arc<dyn LogRepository>,
}

impl Store {
    /// Store backed by SQLite tables created by [`crate::db::init_database`]
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            volunteers: Arc::new(SqliteVolunteerRepository::new(pool.clone())),
            departments: Arc::new(SqliteDepartmentRepository::new(pool.clone())),
            logs: Arc::new(SqliteLogRepository::new(pool)),
        }
    }
}
