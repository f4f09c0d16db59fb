//! # celsched common library
//!
//! Shared code for the volunteer scheduling backend:
//! - Record models (volunteers, departments, audit log entries)
//! - Repository traits and the SQLite-backed document store
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;

pub use error::{Error, Result};
pub use repository::Store;
