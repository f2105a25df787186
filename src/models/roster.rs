// src/models/roster.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Departments a professor roster row may belong to.
pub const DEPARTMENTS: &[&str] = &[
    "Computer Science",
    "Electronics and Communication",
    "Mathematics",
    "Physics",
    "Chemistry",
    "English",
    "Commerce",
    "Management",
];

pub fn is_known_department(department: &str) -> bool {
    DEPARTMENTS.contains(&department)
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRoster {
    pub id: i64,
    pub name: String,
    pub registration_number: String,
    pub examination_number: String,
    pub course: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessorRoster {
    pub id: i64,
    pub name: String,
    pub user_id: String,
    pub department: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRosterInput {
    pub name: String,
    pub registration_number: String,
    pub examination_number: String,
    pub course: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessorRosterInput {
    pub name: String,
    pub user_id: String,
    pub department: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterSearchParams {
    pub q: Option<String>,
    /// Course (students) or department (professors); "all" disables it.
    pub filter: Option<String>,
    pub page: Option<usize>,
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    /// Slices an already-filtered list into one page.
    pub fn from_vec(all: Vec<T>, page: usize, size: usize) -> Self {
        let size = size.max(1);
        let total_count = all.len();
        let items = all.into_iter().skip(page.saturating_mul(size)).take(size).collect();
        Page {
            items,
            total_count,
            current_page: page,
            total_pages: total_count.div_ceil(size),
            page_size: size,
        }
    }
}

/// Outcome of a bulk roster import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport<T> {
    pub success: bool,
    pub total_rows: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
    pub imported_records: Vec<T>,
    pub message: String,
}
