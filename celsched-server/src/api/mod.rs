//! HTTP API handlers

pub mod auth;
pub mod batch_import;
pub mod departments;
pub mod health;
pub mod logs;
pub mod volunteers;

pub use auth::{require_admin, require_auth, Claims, JwtKeys};
pub use batch_import::{execute_batch_import, preview_batch_import};
pub use departments::{
    add_department_member, create_department, delete_department, get_department,
    list_departments, remove_department_member, update_department, update_member_type,
};
pub use health::health_routes;
pub use logs::{list_department_logs, list_logs, list_volunteer_logs};
pub use volunteers::{
    create_volunteer, delete_volunteer, get_volunteer, list_volunteers, update_volunteer,
};
