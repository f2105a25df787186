// src/models/account.rs
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Student,
    Professor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Student => "STUDENT",
            Role::Professor => "PROFESSOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "STUDENT" => Ok(Role::Student),
            "PROFESSOR" => Ok(Role::Professor),
            other => Err(AppError::ValidationFailed(format!("unknown role '{}'", other))),
        }
    }
}

/// Role-specific attributes. Only the fields of the matching role exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Profile {
    Admin,
    #[serde(rename_all = "camelCase")]
    Student {
        registration_number: String,
        examination_number: String,
        course: String,
    },
    #[serde(rename_all = "camelCase")]
    Professor { user_id: String, department: String },
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Admin => Role::Admin,
            Profile::Student { .. } => Role::Student,
            Profile::Professor { .. } => Role::Professor,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_active: bool,
    #[serde(flatten)]
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

/// Raw `accounts` row; role-specific columns are nullable in the table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub registration_number: Option<String>,
    pub examination_number: Option<String>,
    pub course: Option<String>,
    pub professor_user_id: Option<String>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AppError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let profile = match row.role.parse::<Role>()? {
            Role::Admin => Profile::Admin,
            Role::Student => match (row.registration_number, row.examination_number, row.course) {
                (Some(registration_number), Some(examination_number), Some(course)) => {
                    Profile::Student { registration_number, examination_number, course }
                }
                _ => {
                    tracing::error!("Student account {} is missing roster fields", row.id);
                    return Err(AppError::InternalServerError);
                }
            },
            Role::Professor => match (row.professor_user_id, row.department) {
                (Some(user_id), Some(department)) => Profile::Professor { user_id, department },
                _ => {
                    tracing::error!("Professor account {} is missing roster fields", row.id);
                    return Err(AppError::InternalServerError);
                }
            },
        };

        Ok(Account {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            is_active: row.is_active,
            profile,
            created_at: row.created_at,
        })
    }
}

/// Data for inserting an account; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Email, examination number or professor user id.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub registration_number: String,
    pub examination_number: String,
    pub course: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessorRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub user_id: String,
    pub department: String,
}

/// Public listing entry for the professor picker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessorSummary {
    pub id: i64,
    pub name: String,
    pub user_id: String,
    pub department: String,
}
