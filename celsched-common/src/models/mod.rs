//! Stored record types

pub mod department;
pub mod system_log;
pub mod volunteer;

pub use department::{Department, Membership, MembershipType};
pub use system_log::{LogCategory, LogMetadata, LogType, MetaKey, MetaValue, Severity, SystemLog};
pub use volunteer::{name_key, Volunteer};
