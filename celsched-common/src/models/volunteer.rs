//! Volunteer record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person who can be placed in departments and scheduled for events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volunteer {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Soft-delete flag; disabled volunteers stay in the store
    pub is_disabled: bool,
}

impl Volunteer {
    /// Create a new, enabled volunteer with a fresh identifier
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            last_updated: now,
            is_disabled: false,
        }
    }

    /// Lookup key used for case-insensitive name matching
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }
}

/// Normalize a volunteer name for case-insensitive comparison
///
/// Trims surrounding whitespace and lowercases.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
