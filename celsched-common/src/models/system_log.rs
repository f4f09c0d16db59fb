//! Audit log entries
//!
//! Every entry carries a [`LogType`], a category and severity derived from
//! it, and a typed metadata map. Metadata keys are a closed enum so callers
//! cannot misspell them; the stored shape is still a flat JSON object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ========================================
// Log types
// ========================================

/// Kind of event recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    // Batch import
    BatchImportStarted,
    BatchImportCompleted,
    BatchImportFailed,

    // Volunteer management
    VolunteerCreated,
    VolunteerUpdated,
    VolunteerDeleted,

    // Department management
    DepartmentCreated,
    DepartmentUpdated,
    DepartmentDeleted,
    DepartmentMemberAdded,
    DepartmentMemberUpdated,
    DepartmentMemberRemoved,

    // System
    SessionSweep,
}

impl LogType {
    /// Category the log type is filed under
    pub fn category(self) -> LogCategory {
        match self {
            LogType::BatchImportStarted
            | LogType::BatchImportCompleted
            | LogType::BatchImportFailed => LogCategory::BatchOperations,
            LogType::VolunteerCreated | LogType::VolunteerUpdated | LogType::VolunteerDeleted => {
                LogCategory::VolunteerManagement
            }
            LogType::DepartmentCreated
            | LogType::DepartmentUpdated
            | LogType::DepartmentDeleted
            | LogType::DepartmentMemberAdded
            | LogType::DepartmentMemberUpdated
            | LogType::DepartmentMemberRemoved => LogCategory::DepartmentManagement,
            LogType::SessionSweep => LogCategory::System,
        }
    }

    /// Wire name, e.g. `BATCH_IMPORT_STARTED`
    pub fn as_str(self) -> &'static str {
        match self {
            LogType::BatchImportStarted => "BATCH_IMPORT_STARTED",
            LogType::BatchImportCompleted => "BATCH_IMPORT_COMPLETED",
            LogType::BatchImportFailed => "BATCH_IMPORT_FAILED",
            LogType::VolunteerCreated => "VOLUNTEER_CREATED",
            LogType::VolunteerUpdated => "VOLUNTEER_UPDATED",
            LogType::VolunteerDeleted => "VOLUNTEER_DELETED",
            LogType::DepartmentCreated => "DEPARTMENT_CREATED",
            LogType::DepartmentUpdated => "DEPARTMENT_UPDATED",
            LogType::DepartmentDeleted => "DEPARTMENT_DELETED",
            LogType::DepartmentMemberAdded => "DEPARTMENT_MEMBER_ADDED",
            LogType::DepartmentMemberUpdated => "DEPARTMENT_MEMBER_UPDATED",
            LogType::DepartmentMemberRemoved => "DEPARTMENT_MEMBER_REMOVED",
            LogType::SessionSweep => "SESSION_SWEEP",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping used by the log viewer filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    BatchOperations,
    VolunteerManagement,
    DepartmentManagement,
    System,
}

impl LogCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            LogCategory::BatchOperations => "batch_operations",
            LogCategory::VolunteerManagement => "volunteer_management",
            LogCategory::DepartmentManagement => "department_management",
            LogCategory::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

// ========================================
// Typed metadata
// ========================================

/// Metadata field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetaKey {
    // Actor
    UserId,
    Username,

    // Batch import
    FileName,
    FileSize,
    RowCount,
    SessionId,
    Stage,
    TotalVolunteers,
    TotalDepartments,
    VolunteersCreated,
    VolunteersReused,
    DepartmentsCreated,
    SuccessCount,
    ErrorMessage,

    // Volunteers
    VolunteerId,
    VolunteerName,
    OldVolunteerName,
    NewVolunteerName,

    // Departments
    DepartmentId,
    DepartmentName,
    OldDepartmentName,
    NewDepartmentName,
    MemberCount,
    MembershipType,
    OldMembershipType,
    NewMembershipType,

    // System
    RecordCount,
}

/// Metadata value
///
/// Serialized untagged so the stored JSON stays schema-less.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Time(DateTime<Utc>),
    Text(String),
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<usize> for MetaValue {
    fn from(v: usize) -> Self {
        MetaValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u64> for MetaValue {
    fn from(v: u64) -> Self {
        MetaValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<DateTime<Utc>> for MetaValue {
    fn from(v: DateTime<Utc>) -> Self {
        MetaValue::Time(v)
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<Uuid> for MetaValue {
    fn from(v: Uuid) -> Self {
        MetaValue::Text(v.to_string())
    }
}

/// Ordered key/value metadata attached to a log entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogMetadata(BTreeMap<MetaKey, MetaValue>);

impl LogMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: MetaKey, value: impl Into<MetaValue>) -> Self {
        self.0.insert(key, value.into());
        self
    }

    pub fn insert(&mut self, key: MetaKey, value: impl Into<MetaValue>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: MetaKey) -> Option<&MetaValue> {
        self.0.get(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ========================================
// Log entry
// ========================================

/// One audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLog {
    pub id: String,
    #[serde(rename = "type")]
    pub log_type: LogType,
    pub category: LogCategory,
    pub severity: Severity,
    pub metadata: LogMetadata,
    pub time_detected: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub is_archived: bool,
}

impl SystemLog {
    pub fn new(log_type: LogType, severity: Severity, metadata: LogMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            log_type,
            category: log_type.category(),
            severity,
            metadata,
            time_detected: now,
            last_updated: now,
            is_archived: false,
        }
    }
}
