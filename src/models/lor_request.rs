// src/models/lor_request.rs
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            other => {
                tracing::error!("Unknown request status in database: {}", other);
                Err(AppError::InternalServerError)
            }
        }
    }
}

/// Professor's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

/// Fields the student submits with a request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestForm {
    pub professor_id: i64,
    pub semester: String,
    pub session: String,
    pub class_roll_number: String,
    pub institute_company: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionForm {
    #[serde(default)]
    pub comments: Option<String>,
}

/// Raw `lor_requests` row.
#[derive(Debug, Clone, FromRow)]
pub struct LorRequestRow {
    pub id: i64,
    pub student_id: i64,
    pub professor_id: i64,
    pub student_name: String,
    pub registration_number: String,
    pub examination_number: String,
    pub course: String,
    pub semester: String,
    pub session: String,
    pub class_roll_number: String,
    pub institute_company: String,
    pub status: String,
    pub professor_comments: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A request with its student snapshot, frozen at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LorRequest {
    pub id: i64,
    pub student_id: i64,
    pub professor_id: i64,
    pub student_name: String,
    pub registration_number: String,
    pub examination_number: String,
    pub course: String,
    pub semester: String,
    pub session: String,
    pub class_roll_number: String,
    pub institute_company: String,
    pub status: RequestStatus,
    pub professor_comments: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl LorRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

impl TryFrom<LorRequestRow> for LorRequest {
    type Error = AppError;

    fn try_from(row: LorRequestRow) -> Result<Self, Self::Error> {
        Ok(LorRequest {
            status: row.status.parse()?,
            id: row.id,
            student_id: row.student_id,
            professor_id: row.professor_id,
            student_name: row.student_name,
            registration_number: row.registration_number,
            examination_number: row.examination_number,
            course: row.course,
            semester: row.semester,
            session: row.session,
            class_roll_number: row.class_roll_number,
            institute_company: row.institute_company,
            professor_comments: row.professor_comments,
            requested_at: row.requested_at,
            processed_at: row.processed_at,
        })
    }
}

/// Listing row joined with professor and document details.
#[derive(Debug, Clone, FromRow)]
pub struct LorRequestViewRow {
    #[sqlx(flatten)]
    pub request: LorRequestRow,
    pub professor_name: String,
    pub professor_department: Option<String>,
    pub document_reference: Option<String>,
    pub document_file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LorRequestView {
    #[serde(flatten)]
    pub request: LorRequest,
    pub professor_name: String,
    pub professor_department: Option<String>,
    pub has_document: bool,
    pub document_reference: Option<String>,
    pub document_file_name: Option<String>,
}

impl TryFrom<LorRequestViewRow> for LorRequestView {
    type Error = AppError;

    fn try_from(row: LorRequestViewRow) -> Result<Self, Self::Error> {
        Ok(LorRequestView {
            request: row.request.try_into()?,
            professor_name: row.professor_name,
            professor_department: row.professor_department,
            has_document: row.document_reference.is_some(),
            document_reference: row.document_reference,
            document_file_name: row.document_file_name,
        })
    }
}

/// Request counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}
