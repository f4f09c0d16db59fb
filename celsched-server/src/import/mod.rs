//! Batch import of departments from a spreadsheet
//!
//! Two steps:
//! - preview: decode the workbook, parse columns, detect name conflicts and
//!   park the result in an [`ImportSession`]
//! - execute: apply the caller's conflict resolutions and write volunteers,
//!   then departments

pub mod conflicts;
pub mod executor;
pub mod parser;
pub mod session;
pub mod spreadsheet;
pub mod types;

pub use conflicts::{count_distinct_volunteers, detect_conflicts};
pub use executor::{execute_import, ExecuteError, ImportOutcome, ImportStage, StageFailure};
pub use parser::{parse_columns, ParsedColumns};
pub use session::{
    spawn_session_sweeper, ImportSession, InMemorySessionStore, SessionStore, SWEEP_INTERVAL,
};
pub use spreadsheet::{is_spreadsheet_filename, read_first_sheet, SpreadsheetError};
pub use types::*;
