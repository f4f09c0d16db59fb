//! Batch import request/response types
//!
//! Field names follow the JSON the admin frontend sends and expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ========================================
// Preview
// ========================================

/// One spreadsheet column that will become a department
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPreview {
    pub department_name: String,
    pub head_name: String,
    pub members: Vec<String>,
    /// 0-based spreadsheet column
    pub column_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_ids: Option<Vec<String>>,
}

impl DepartmentPreview {
    pub fn new(
        department_name: impl Into<String>,
        head_name: impl Into<String>,
        members: Vec<String>,
        column_index: usize,
    ) -> Self {
        Self {
            department_name: department_name.into(),
            head_name: head_name.into(),
            members,
            column_index,
            head_id: None,
            member_ids: None,
        }
    }

    /// Head then members, with their 0-based spreadsheet rows
    pub fn named_rows(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        std::iter::once((1, self.head_name.as_str())).chain(
            self.members
                .iter()
                .enumerate()
                .map(|(i, name)| (i + 2, name.as_str())),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    /// Same name appears more than once across the import
    DuplicateInImport,
    /// Name matches a volunteer already in the store
    ExistingInDb,
}

/// Where a conflicting name appears in the spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictOccurrence {
    pub department_name: String,
    pub column_index: usize,
    pub row_index: usize,
    pub is_head: bool,
}

/// Summary of the stored volunteer an import name matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingVolunteerInfo {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub current_dept_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerConflict {
    /// Spelling of the first occurrence
    pub volunteer_name: String,
    pub conflict_type: ConflictType,
    pub occurrences: Vec<ConflictOccurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_volunteer: Option<ExistingVolunteerInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorType {
    EmptyDepartmentName,
    EmptyHead,
    DuplicateInColumn,
    InvalidFileFormat,
}

/// Problem found while reading the spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub error_type: ValidationErrorType,
    pub message: String,
    pub column_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportPreviewResponse {
    pub departments: Vec<DepartmentPreview>,
    pub conflicts: Vec<VolunteerConflict>,
    pub validation_errors: Vec<ValidationError>,
    pub total_volunteers: usize,
    pub total_departments: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

impl BatchImportPreviewResponse {
    /// Response for a spreadsheet that failed validation; no session is created
    pub fn rejected(validation_errors: Vec<ValidationError>) -> Self {
        Self {
            departments: Vec::new(),
            conflicts: Vec::new(),
            validation_errors,
            total_volunteers: 0,
            total_departments: 0,
            session_id: None,
        }
    }
}

// ========================================
// Execute
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionDecision {
    /// One volunteer shared by every occurrence
    CreateOne,
    /// A separate volunteer per department
    CreateMultiple,
    /// Link every occurrence to a stored volunteer
    ReuseExisting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    pub volunteer_name: String,
    pub decision: ResolutionDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportExecuteRequest {
    pub session_id: Uuid,
    pub resolutions: Vec<ConflictResolution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportExecuteResponse {
    pub success: bool,
    pub departments_created: usize,
    pub volunteers_created: usize,
    pub volunteers_reused: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Present on success, even when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_department_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_volunteer_ids: Option<Vec<String>>,
}

impl BatchImportExecuteResponse {
    pub fn succeeded(
        created_department_ids: Vec<String>,
        created_volunteer_ids: Vec<String>,
        volunteers_reused: usize,
    ) -> Self {
        Self {
            success: true,
            departments_created: created_department_ids.len(),
            volunteers_created: created_volunteer_ids.len(),
            volunteers_reused,
            error_message: None,
            created_department_ids: Some(created_department_ids),
            created_volunteer_ids: Some(created_volunteer_ids),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}
