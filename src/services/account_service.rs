// src/services/account_service.rs
use crate::{
    db::is_unique_violation,
    error::{AppError, AppResult},
    models::account::{Account, AccountRow, NewAccount, Profile, ProfessorSummary, Role},
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

const ACCOUNT_COLUMNS: &str = r#"
    id, name, email, password_hash, role, is_active,
    registration_number, examination_number, course,
    professor_user_id, department, created_at
"#;

/// Fetches an account by id.
pub async fn find_by_id(db_pool: &SqlitePool, account_id: i64) -> AppResult<Option<Account>> {
    tracing::debug!("Looking up account by id: {}", account_id);
    let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(account_id)
        .fetch_optional(db_pool)
        .await?
        .map(Account::try_from)
        .transpose()
}

/// Columns a login name is matched against, in order of precedence.
const LOGIN_COLUMNS: [&str; 3] = ["email", "examination_number", "professor_user_id"];

/// Resolves a login name: email first, then examination number, then
/// professor user id. When the name matches different accounts through
/// different columns, the earliest column wins and the clash is logged.
pub async fn find_by_login(db_pool: &SqlitePool, username: &str) -> AppResult<Option<Account>> {
    let mut found: Option<(Account, &str)> = None;
    for column in LOGIN_COLUMNS {
        let sql = format!("SELECT {} FROM accounts WHERE {} = ?", ACCOUNT_COLUMNS, column);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(username)
            .fetch_optional(db_pool)
            .await?;
        let Some(row) = row else { continue };
        let account = Account::try_from(row)?;

        match &found {
            None => {
                tracing::debug!("Login '{}' matched by {}", username, column);
                found = Some((account, column));
            }
            Some((first, first_column)) if first.id != account.id => {
                tracing::warn!(
                    "Login '{}' matches account {} by {} and account {} by {}; using account {}",
                    username,
                    first.id,
                    first_column,
                    account.id,
                    column,
                    first.id
                );
            }
            Some(_) => {}
        }
    }
    Ok(found.map(|(account, _)| account))
}

pub async fn exists_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<bool> {
    exists_by(db_pool, "email", email).await
}

pub async fn exists_by_examination_number(db_pool: &SqlitePool, examination_number: &str) -> AppResult<bool> {
    exists_by(db_pool, "examination_number", examination_number).await
}

pub async fn exists_by_professor_user_id(db_pool: &SqlitePool, user_id: &str) -> AppResult<bool> {
    exists_by(db_pool, "professor_user_id", user_id).await
}

async fn exists_by(db_pool: &SqlitePool, column: &str, value: &str) -> AppResult<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM accounts WHERE {} = ?)", column);
    let found: bool = sqlx::query_scalar(&sql).bind(value).fetch_one(db_pool).await?;
    Ok(found)
}

/// Inserts an active account. Unique violations become `Conflict`.
pub async fn insert_account(db_pool: &SqlitePool, new: NewAccount) -> AppResult<Account> {
    tracing::info!("Creating {} account: {}", new.profile.role(), new.email);

    let (registration_number, examination_number, course, user_id, department) = match &new.profile {
        Profile::Admin => (None, None, None, None, None),
        Profile::Student { registration_number, examination_number, course } => {
            (Some(registration_number), Some(examination_number), Some(course), None, None)
        }
        Profile::Professor { user_id, department } => (None, None, None, Some(user_id), Some(department)),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO accounts (
            name, email, password_hash, role, is_active,
            registration_number, examination_number, course,
            professor_user_id, department, created_at
        )
        VALUES (?, ?, ?, ?, 1, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(new.profile.role().as_str())
    .bind(registration_number)
    .bind(examination_number)
    .bind(course)
    .bind(user_id)
    .bind(department)
    .bind(Utc::now())
    .execute(db_pool)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(e) if is_unique_violation(&e) => {
            tracing::warn!("Account creation refused, duplicate identity: {}", new.email);
            return Err(AppError::Conflict("account already registered".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let account = find_by_id(db_pool, id).await?.ok_or(AppError::InternalServerError)?;
    tracing::info!("✅ Account {} created ({})", account.id, account.email);
    Ok(account)
}

/// Active professors for the student's professor picker.
pub async fn list_active_professors(db_pool: &SqlitePool) -> AppResult<Vec<ProfessorSummary>> {
    let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
        r#"
        SELECT id, name, professor_user_id, department
        FROM accounts
        WHERE role = 'PROFESSOR' AND is_active = 1
        ORDER BY name ASC
        "#,
    )
    .fetch_all(db_pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, user_id, department)| ProfessorSummary { id, name, user_id, department })
        .collect())
}

/// All accounts, optionally filtered by role (admin view).
pub async fn list_accounts(db_pool: &SqlitePool, role: Option<Role>) -> AppResult<Vec<Account>> {
    let rows = match role {
        Some(role) => {
            let sql = format!("SELECT {} FROM accounts WHERE role = ? ORDER BY id ASC", ACCOUNT_COLUMNS);
            sqlx::query_as::<_, AccountRow>(&sql)
                .bind(role.as_str())
                .fetch_all(db_pool)
                .await?
        }
        None => {
            let sql = format!("SELECT {} FROM accounts ORDER BY id ASC", ACCOUNT_COLUMNS);
            sqlx::query_as::<_, AccountRow>(&sql).fetch_all(db_pool).await?
        }
    };
    tracing::debug!("Listed {} accounts", rows.len());
    rows.into_iter().map(Account::try_from).collect()
}

/// Flips the active flag. Accounts are never hard-deleted; admins cannot be toggled.
pub async fn toggle_account_status(db_pool: &SqlitePool, account_id: i64) -> AppResult<Account> {
    let account = find_by_id(db_pool, account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".into()))?;

    if account.is_admin() {
        tracing::warn!("Refusing to toggle admin account {}", account_id);
        return Err(AppError::Forbidden("cannot change admin account status".into()));
    }

    sqlx::query("UPDATE accounts SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(!account.is_active)
        .bind(Utc::now())
        .bind(account_id)
        .execute(db_pool)
        .await?;

    let updated = find_by_id(db_pool, account_id).await?.ok_or(AppError::InternalServerError)?;
    tracing::info!("Account {} active = {}", updated.email, updated.is_active);
    Ok(updated)
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCounts {
    pub total_students: i64,
    pub total_professors: i64,
    pub total_admins: i64,
    pub active_students: i64,
    pub active_professors: i64,
}

pub async fn count_accounts(db_pool: &SqlitePool) -> AppResult<AccountCounts> {
    let rows: Vec<(String, bool, i64)> =
        sqlx::query_as("SELECT role, is_active, COUNT(*) FROM accounts GROUP BY role, is_active")
            .fetch_all(db_pool)
            .await?;

    let mut counts = AccountCounts::default();
    for (role, active, n) in rows {
        match role.parse::<Role>()? {
            Role::Student => {
                counts.total_students += n;
                if active {
                    counts.active_students += n;
                }
            }
            Role::Professor => {
                counts.total_professors += n;
                if active {
                    counts.active_professors += n;
                }
            }
            Role::Admin => counts.total_admins += n,
        }
    }
    Ok(counts)
}

#[cfg(test)]
pub mod fixtures {
    //! Account builders shared by service tests. Hashes are dummies.
    use super::*;

    pub async fn student(db_pool: &SqlitePool, name: &str, exam: &str) -> Account {
        insert_account(
            db_pool,
            NewAccount {
                name: name.to_string(),
                email: format!("{}@students.test", exam.to_lowercase()),
                password_hash: "x".into(),
                profile: Profile::Student {
                    registration_number: format!("REG-{}", exam),
                    examination_number: exam.to_string(),
                    course: "BCA".into(),
                },
            },
        )
        .await
        .expect("student fixture")
    }

    pub async fn professor(db_pool: &SqlitePool, name: &str, user_id: &str) -> Account {
        insert_account(
            db_pool,
            NewAccount {
                name: name.to_string(),
                email: format!("{}@staff.test", user_id.to_lowercase()),
                password_hash: "x".into(),
                profile: Profile::Professor {
                    user_id: user_id.to_string(),
                    department: "Computer Science".into(),
                },
            },
        )
        .await
        .expect("professor fixture")
    }

    pub async fn admin(db_pool: &SqlitePool) -> Account {
        insert_account(
            db_pool,
            NewAccount {
                name: "Administrator".into(),
                email: "admin@lor.test".into(),
                password_hash: "x".into(),
                profile: Profile::Admin,
            },
        )
        .await
        .expect("admin fixture")
    }
}
