//! Column parser
//!
//! Each spreadsheet column is one prospective department:
//! - row 0: department name
//! - row 1: department head
//! - rows 2..: members
//!
//! Cells are trimmed and blank cells ignored. Problems are collected across
//! every column rather than stopping at the first one.

use celsched_common::models::name_key;
use std::collections::HashSet;

use super::types::{DepartmentPreview, ValidationError, ValidationErrorType};

/// Result of parsing a grid
#[derive(Debug, Default)]
pub struct ParsedColumns {
    pub departments: Vec<DepartmentPreview>,
    pub errors: Vec<ValidationError>,
}

impl ParsedColumns {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse a row-major grid into department previews plus validation errors
pub fn parse_columns(rows: &[Vec<String>]) -> ParsedColumns {
    if rows.is_empty() {
        return ParsedColumns {
            departments: Vec::new(),
            errors: vec![ValidationError {
                error_type: ValidationErrorType::InvalidFileFormat,
                message: "Excel file is empty".to_string(),
                column_index: 0,
                row_index: None,
                department_name: None,
            }],
        };
    }

    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut parsed = ParsedColumns::default();

    for column in 0..column_count {
        if let Some(department) = parse_column(rows, column, &mut parsed.errors) {
            parsed.departments.push(department);
        }
    }

    parsed
}

fn parse_column(
    rows: &[Vec<String>],
    column: usize,
    errors: &mut Vec<ValidationError>,
) -> Option<DepartmentPreview> {
    let mut department_name = String::new();
    let mut head_name = String::new();
    let mut members: Vec<String> = Vec::new();
    let mut seen_members: HashSet<String> = HashSet::new();

    for (row_index, row) in rows.iter().enumerate() {
        let Some(cell) = row.get(column) else {
            continue;
        };
        let value = cell.trim();
        if value.is_empty() {
            continue;
        }

        match row_index {
            0 => department_name = value.to_string(),
            1 => head_name = value.to_string(),
            _ => {
                if !seen_members.insert(name_key(value)) {
                    errors.push(ValidationError {
                        error_type: ValidationErrorType::DuplicateInColumn,
                        message: format!(
                            "Duplicate volunteer '{}' in column {}",
                            value,
                            column + 1
                        ),
                        column_index: column,
                        row_index: Some(row_index),
                        department_name: non_empty(&department_name),
                    });
                    continue;
                }
                members.push(value.to_string());
            }
        }
    }

    if department_name.is_empty() && head_name.is_empty() && members.is_empty() {
        return None;
    }

    if department_name.is_empty() {
        errors.push(ValidationError {
            error_type: ValidationErrorType::EmptyDepartmentName,
            message: format!("Department name is empty in column {}", column + 1),
            column_index: column,
            row_index: None,
            department_name: None,
        });
        return None;
    }

    if head_name.is_empty() {
        errors.push(ValidationError {
            error_type: ValidationErrorType::EmptyHead,
            message: format!("Department head is empty for '{}'", department_name),
            column_index: column,
            row_index: None,
            department_name: Some(department_name),
        });
        return None;
    }

    if seen_members.contains(&name_key(&head_name)) {
        errors.push(ValidationError {
            error_type: ValidationErrorType::DuplicateInColumn,
            message: format!(
                "Department head '{}' is also listed as a member",
                head_name
            ),
            column_index: column,
            row_index: None,
            department_name: Some(department_name),
        });
        return None;
    }

    Some(DepartmentPreview::new(
        department_name,
        head_name,
        members,
        column,
    ))
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
