//! Department record and membership entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a volunteer inside a department
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipType {
    Head,
    Member,
}

impl MembershipType {
    pub fn as_str(self) -> &'static str {
        match self {
            MembershipType::Head => "HEAD",
            MembershipType::Member => "MEMBER",
        }
    }
}

/// Reference from a department to one of its volunteers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    #[serde(rename = "volunteerID")]
    pub volunteer_id: String,
    pub joined_date: DateTime<Utc>,
    pub membership_type: MembershipType,
    pub last_updated: DateTime<Utc>,
}

impl Membership {
    pub fn new(volunteer_id: impl Into<String>, membership_type: MembershipType) -> Self {
        let now = Utc::now();
        Self {
            volunteer_id: volunteer_id.into(),
            joined_date: now,
            membership_type,
            last_updated: now,
        }
    }
}

/// A group of volunteers led by one or more heads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    pub department_name: String,
    pub volunteer_members: Vec<Membership>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub is_disabled: bool,
}

impl Department {
    pub fn new(department_name: impl Into<String>, volunteer_members: Vec<Membership>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            department_name: department_name.into(),
            volunteer_members,
            created_at: now,
            last_updated: now,
            is_disabled: false,
        }
    }

    /// True if the volunteer appears in this department in any role
    pub fn has_member(&self, volunteer_id: &str) -> bool {
        self.volunteer_members
            .iter()
            .any(|m| m.volunteer_id == volunteer_id)
    }

    pub fn member_mut(&mut self, volunteer_id: &str) -> Option<&mut Membership> {
        self.volunteer_members
            .iter_mut()
            .find(|m| m.volunteer_id == volunteer_id)
    }

    /// Drop the volunteer's membership, returning it if there was one
    pub fn remove_member(&mut self, volunteer_id: &str) -> Option<Membership> {
        let index = self
            .volunteer_members
            .iter()
            .position(|m| m.volunteer_id == volunteer_id)?;
        Some(self.volunteer_members.remove(index))
    }
}
