//! Volunteer name conflict detection
//!
//! Names are compared case-insensitively after trimming. For every distinct
//! name, in order of first appearance:
//! - a stored volunteer with that name -> `EXISTING_IN_DB`
//! - otherwise more than one occurrence -> `DUPLICATE_IN_IMPORT`
//! - otherwise no conflict

use celsched_common::models::{name_key, Department, Volunteer};
use celsched_common::{Result, Store};
use std::collections::{HashMap, HashSet};

use super::types::{
    ConflictOccurrence, ConflictType, DepartmentPreview, ExistingVolunteerInfo, VolunteerConflict,
};

/// Load existing volunteers and departments, then classify import names
pub async fn detect_conflicts(
    store: &Store,
    previews: &[DepartmentPreview],
) -> Result<Vec<VolunteerConflict>> {
    let volunteers = store.volunteers.list_volunteers().await?;
    let departments = store.departments.list_departments().await?;
    Ok(classify(previews, &volunteers, &departments))
}

/// Number of distinct names (case-insensitive) across all previews
pub fn count_distinct_volunteers(previews: &[DepartmentPreview]) -> usize {
    previews
        .iter()
        .flat_map(|p| p.named_rows().map(|(_, name)| name_key(name)))
        .collect::<HashSet<_>>()
        .len()
}

struct NameOccurrences<'a> {
    first_spelling: &'a str,
    occurrences: Vec<ConflictOccurrence>,
}

/// Classify every import name against the stored volunteers
pub fn classify(
    previews: &[DepartmentPreview],
    volunteers: &[Volunteer],
    departments: &[Department],
) -> Vec<VolunteerConflict> {
    // first-seen order of keys
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, NameOccurrences<'_>> = HashMap::new();

    for preview in previews {
        for (row_index, name) in preview.named_rows() {
            let key = name_key(name);
            let entry = by_name.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                NameOccurrences {
                    first_spelling: name,
                    occurrences: Vec::new(),
                }
            });
            entry.occurrences.push(ConflictOccurrence {
                department_name: preview.department_name.clone(),
                column_index: preview.column_index,
                row_index,
                is_head: row_index == 1,
            });
        }
    }

    // oldest record wins when several stored volunteers share a name
    let mut existing: HashMap<String, &Volunteer> = HashMap::new();
    for volunteer in volunteers {
        existing.entry(volunteer.name_key()).or_insert(volunteer);
    }

    let mut conflicts = Vec::new();
    for key in order {
        let Some(NameOccurrences {
            first_spelling,
            occurrences,
        }) = by_name.remove(&key)
        else {
            continue;
        };

        if let Some(volunteer) = existing.get(&key) {
            conflicts.push(VolunteerConflict {
                volunteer_name: first_spelling.to_string(),
                conflict_type: ConflictType::ExistingInDb,
                occurrences,
                existing_volunteer: Some(ExistingVolunteerInfo {
                    id: volunteer.id.clone(),
                    name: volunteer.name.clone(),
                    created_at: volunteer.created_at,
                    current_dept_count: active_department_count(departments, &volunteer.id),
                }),
            });
        } else if occurrences.len() > 1 {
            conflicts.push(VolunteerConflict {
                volunteer_name: first_spelling.to_string(),
                conflict_type: ConflictType::DuplicateInImport,
                occurrences,
                existing_volunteer: None,
            });
        }
    }

    conflicts
}

fn active_department_count(departments: &[Department], volunteer_id: &str) -> usize {
    departments
        .iter()
        .filter(|d| !d.is_disabled && d.has_member(volunteer_id))
        .count()
}
