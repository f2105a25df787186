// src/models/document.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata for a rendered letter. One per approved request at most.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedDocument {
    pub id: i64,
    pub request_id: i64,
    pub reference_number: String,
    pub file_name: String,
    /// Storage path, relative to the storage root.
    #[serde(skip)]
    pub file_path: String,
    pub file_size: i64,
    pub generated_by: i64,
    pub generated_at: DateTime<Utc>,
}

/// Document joined with the owning student of its request, for access checks.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentAccessRow {
    #[sqlx(flatten)]
    pub document: IssuedDocument,
    pub student_id: i64,
}

/// Everything printed on the letter. Built from defaults, optionally
/// overridden field by field by the professor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterPreview {
    pub student_name: String,
    pub class_roll_number: String,
    pub registration_number: String,
    pub examination_number: String,
    pub course: String,
    pub semester: String,
    pub session: String,
    pub institute_company: String,

    pub recipient_title: String,
    pub recipient_department: String,
    pub recipient_company: String,
    pub recipient_location: String,

    pub subject: String,
    pub salutation: String,
    pub main_content: String,
    pub paper_code: String,

    pub professor_name: String,
    pub professor_department: String,
    pub professor_designation: String,

    pub reference_number: String,
    pub current_date: String,
}

/// Professor-supplied replacements for the default letter fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterOverrides {
    pub recipient_title: Option<String>,
    pub recipient_department: Option<String>,
    pub recipient_company: Option<String>,
    pub recipient_location: Option<String>,
    pub subject: Option<String>,
    pub salutation: Option<String>,
    pub main_content: Option<String>,
    pub professor_designation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total_documents: i64,
    pub total_file_size: i64,
}
