//! Resolution executor
//!
//! Applies conflict resolutions to a parsed import:
//! 1. one volunteer per distinct name (unless reused or split per department)
//! 2. one volunteer per department for names resolved `CREATE_MULTIPLE`
//! 3. one department per preview, head first
//!
//! Every volunteer is written before any department. Records are written
//! one at a time and nothing is rolled back on failure; the error reports
//! how far the run got.

use celsched_common::models::{name_key, Department, Membership, MembershipType, Volunteer};
use celsched_common::Store;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use super::types::{ConflictResolution, DepartmentPreview, ResolutionDecision};

/// Phase of an import run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    VolunteerCreation,
    DepartmentCreation,
}

impl ImportStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportStage::VolunteerCreation => "volunteer_creation",
            ImportStage::DepartmentCreation => "department_creation",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run that stopped part way through
#[derive(Debug)]
pub struct StageFailure {
    pub stage: ImportStage,
    pub message: String,
    /// Volunteers already written when the run stopped
    pub volunteers_created: usize,
    /// Departments already written when the run stopped
    pub departments_created: usize,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            ImportStage::VolunteerCreation => {
                write!(f, "Failed to create volunteers: {}", self.message)
            }
            ImportStage::DepartmentCreation => {
                write!(f, "Failed to create departments: {}", self.message)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Rejected before anything was written
    #[error("Resolution for '{0}' is REUSE_EXISTING but has no volunteerId")]
    MissingVolunteerId(String),

    #[error("{0}")]
    Stage(StageFailure),
}

/// Records written by a successful run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub created_volunteer_ids: Vec<String>,
    pub created_department_ids: Vec<String>,
    pub volunteers_reused: usize,
}

/// Lookup key from an imported name to the volunteer id it resolved to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VolunteerKey {
    /// One volunteer for every occurrence of the name
    Shared(String),
    /// Separate volunteer for this name in the department parsed from `column`
    PerDepartment { name: String, column: usize },
}

impl VolunteerKey {
    fn per_department(name: &str, preview: &DepartmentPreview) -> Self {
        VolunteerKey::PerDepartment {
            name: name_key(name),
            column: preview.column_index,
        }
    }
}

/// Display name of a volunteer split out for one department
///
/// Falls back to naming the column when two departments share a name.
fn split_display_name(
    name: &str,
    preview: &DepartmentPreview,
    shared_names: &HashSet<String>,
) -> String {
    if shared_names.contains(&name_key(&preview.department_name)) {
        format!(
            "{} ({}, column {})",
            name,
            preview.department_name,
            preview.column_index + 1
        )
    } else {
        format!("{} ({})", name, preview.department_name)
    }
}

/// Department names (normalised) used by more than one preview
fn repeated_department_names(previews: &[DepartmentPreview]) -> HashSet<String> {
    let mut seen = HashSet::new();
    previews
        .iter()
        .map(|p| name_key(&p.department_name))
        .filter(|key| !seen.insert(key.clone()))
        .collect()
}

/// Create the volunteers and departments described by `previews`
pub async fn execute_import(
    store: &Store,
    previews: &[DepartmentPreview],
    resolutions: &[ConflictResolution],
) -> Result<ImportOutcome, ExecuteError> {
    let resolutions: HashMap<String, &ConflictResolution> = resolutions
        .iter()
        .map(|r| (name_key(&r.volunteer_name), r))
        .collect();

    // distinct names in first-seen order, keeping the first spelling
    let mut seen: HashSet<String> = HashSet::new();
    let mut distinct: Vec<(String, &str)> = Vec::new();
    for preview in previews {
        for (_, name) in preview.named_rows() {
            let key = name_key(name);
            if seen.insert(key.clone()) {
                distinct.push((key, name));
            }
        }
    }

    for (key, name) in &distinct {
        if let Some(r) = resolutions.get(key) {
            if r.decision == ResolutionDecision::ReuseExisting && reuse_id(r).is_none() {
                return Err(ExecuteError::MissingVolunteerId((*name).to_string()));
            }
        }
    }

    let mut ids: HashMap<VolunteerKey, String> = HashMap::new();
    let mut outcome = ImportOutcome::default();

    // Stage 1: volunteers
    for (key, name) in &distinct {
        let decision = resolutions.get(key).map(|r| (r.decision, *r));
        match decision {
            Some((ResolutionDecision::ReuseExisting, r)) => {
                if let Some(id) = reuse_id(r) {
                    ids.insert(VolunteerKey::Shared(key.clone()), id.to_string());
                    outcome.volunteers_reused += 1;
                }
            }
            Some((ResolutionDecision::CreateMultiple, _)) => {}
            Some((ResolutionDecision::CreateOne, _)) | None => {
                let id = create_volunteer(store, name, &outcome).await?;
                ids.insert(VolunteerKey::Shared(key.clone()), id.clone());
                outcome.created_volunteer_ids.push(id);
            }
        }
    }

    let shared_department_names = repeated_department_names(previews);
    for preview in previews {
        for (_, name) in preview.named_rows() {
            let split = resolutions
                .get(&name_key(name))
                .is_some_and(|r| r.decision == ResolutionDecision::CreateMultiple);
            if !split {
                continue;
            }
            let display = split_display_name(name, preview, &shared_department_names);
            let id = create_volunteer(store, &display, &outcome).await?;
            ids.insert(VolunteerKey::per_department(name, preview), id.clone());
            outcome.created_volunteer_ids.push(id);
        }
    }

    info!(
        created = outcome.created_volunteer_ids.len(),
        reused = outcome.volunteers_reused,
        "Import volunteers ready"
    );

    // Stage 2: departments
    for preview in previews {
        let fail = |message: String, outcome: &ImportOutcome| {
            ExecuteError::Stage(StageFailure {
                stage: ImportStage::DepartmentCreation,
                message,
                volunteers_created: outcome.created_volunteer_ids.len(),
                departments_created: outcome.created_department_ids.len(),
            })
        };

        let head_id = lookup(&ids, &preview.head_name, preview).ok_or_else(
            || fail(format!("head ID not found for '{}'", preview.head_name), &outcome),
        )?;
        let mut members = vec![Membership::new(head_id, MembershipType::Head)];

        for member in &preview.members {
            let member_id = lookup(&ids, member, preview)
                .ok_or_else(|| fail(format!("member ID not found for '{}'", member), &outcome))?;
            members.push(Membership::new(member_id, MembershipType::Member));
        }

        let department = Department::new(preview.department_name.clone(), members);
        store
            .departments
            .create_department(&department)
            .await
            .map_err(|e| {
                fail(
                    format!(
                        "failed to create department '{}': {}",
                        preview.department_name, e
                    ),
                    &outcome,
                )
            })?;

        debug!(
            department_id = %department.id,
            department = %department.department_name,
            members = department.volunteer_members.len(),
            "Imported department"
        );
        outcome.created_department_ids.push(department.id);
    }

    Ok(outcome)
}

fn reuse_id(resolution: &ConflictResolution) -> Option<&str> {
    resolution
        .volunteer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Department-specific id first, then the shared one
fn lookup(
    ids: &HashMap<VolunteerKey, String>,
    name: &str,
    preview: &DepartmentPreview,
) -> Option<String> {
    ids.get(&VolunteerKey::per_department(name, preview))
        .or_else(|| ids.get(&VolunteerKey::Shared(name_key(name))))
        .cloned()
}

async fn create_volunteer(
    store: &Store,
    name: &str,
    outcome: &ImportOutcome,
) -> Result<String, ExecuteError> {
    let volunteer = Volunteer::new(name);
    store
        .volunteers
        .create_volunteer(&volunteer)
        .await
        .map_err(|e| {
            ExecuteError::Stage(StageFailure {
                stage: ImportStage::VolunteerCreation,
                message: format!("failed to create volunteer '{}': {}", name, e),
                volunteers_created: outcome.created_volunteer_ids.len(),
                departments_created: 0,
            })
        })?;
    Ok(volunteer.id)
}
