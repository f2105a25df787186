// src/services/auth_service.rs
use crate::{
    error::{AppError, AppResult},
    models::account::{Account, NewAccount, ProfessorRegistration, Profile, StudentRegistration},
    services::{account_service, roster_service},
};
use sqlx::SqlitePool;

const MIN_PASSWORD_LEN: usize = 6;

/// Checks a password against the stored bcrypt hash.
pub async fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Verifying bcrypt hash...");
        bcrypt::verify(&password, &stored_hash)
    })
    .await
    .map_err(|e| {
        tracing::error!("spawn_blocking task failed (verify_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("bcrypt verification error: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Produces a bcrypt hash for a password.
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Generating bcrypt hash...");
        bcrypt::hash(&password, bcrypt::DEFAULT_COST)
    })
    .await
    .map_err(|e| {
        tracing::error!("spawn_blocking task failed (hash_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("bcrypt hashing error: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Resolves login credentials into an active account.
pub async fn authenticate(db_pool: &SqlitePool, username: &str, password: &str) -> AppResult<Account> {
    tracing::info!("Login attempt for: {}", username);

    let Some(account) = account_service::find_by_login(db_pool, username.trim()).await? else {
        tracing::warn!("No account for login: {}", username);
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, &account.password_hash).await? {
        tracing::warn!("Wrong password for: {}", username);
        return Err(AppError::InvalidCredentials);
    }

    if !account.is_active {
        tracing::warn!("Login refused, account {} is inactive", account.id);
        return Err(AppError::Forbidden("account is deactivated".into()));
    }

    tracing::info!("✅ Login succeeded for account {}", account.id);
    Ok(account)
}

fn check_registration_basics(name: &str, email: &str, password: &str) -> AppResult<()> {
    if name.trim().is_empty() || email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::ValidationFailed("name and a valid email are required".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationFailed(format!(
            "password must have at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Self-registration for students, gated by the roster.
pub async fn register_student(db_pool: &SqlitePool, form: StudentRegistration) -> AppResult<Account> {
    tracing::info!("Student registration attempt: {}", form.name);
    check_registration_basics(&form.name, &form.email, &form.password)?;

    roster_service::validate_student_claim(
        db_pool,
        &form.name,
        &form.registration_number,
        &form.examination_number,
        &form.course,
    )
    .await?;

    if account_service::exists_by_email(db_pool, &form.email).await? {
        return Err(AppError::Conflict("email is already in use".into()));
    }
    if account_service::exists_by_examination_number(db_pool, &form.examination_number).await? {
        return Err(AppError::Conflict("examination number is already registered".into()));
    }

    let password_hash = hash_password(&form.password).await?;
    account_service::insert_account(
        db_pool,
        NewAccount {
            name: form.name,
            email: form.email,
            password_hash,
            profile: Profile::Student {
                registration_number: form.registration_number,
                examination_number: form.examination_number,
                course: form.course,
            },
        },
    )
    .await
}

/// Self-registration for professors, gated by the roster.
pub async fn register_professor(db_pool: &SqlitePool, form: ProfessorRegistration) -> AppResult<Account> {
    tracing::info!("Professor registration attempt: {}", form.name);
    check_registration_basics(&form.name, &form.email, &form.password)?;

    roster_service::validate_professor_claim(db_pool, &form.name, &form.user_id, &form.department).await?;

    if account_service::exists_by_email(db_pool, &form.email).await? {
        return Err(AppError::Conflict("email is already in use".into()));
    }
    if account_service::exists_by_professor_user_id(db_pool, &form.user_id).await? {
        return Err(AppError::Conflict("user id is already registered".into()));
    }

    let password_hash = hash_password(&form.password).await?;
    account_service::insert_account(
        db_pool,
        NewAccount {
            name: form.name,
            email: form.email,
            password_hash,
            profile: Profile::Professor { user_id: form.user_id, department: form.department },
        },
    )
    .await
}

/// Creates the configured admin account if it does not exist yet.
pub async fn seed_admin(db_pool: &SqlitePool, email: &str, password: &str) -> AppResult<()> {
    if account_service::exists_by_email(db_pool, email).await? {
        tracing::info!("Seed admin {} already exists", email);
        return Ok(());
    }
    let password_hash = hash_password(password).await?;
    account_service::insert_account(
        db_pool,
        NewAccount {
            name: "System Administrator".into(),
            email: email.to_string(),
            password_hash,
            profile: Profile::Admin,
        },
    )
    .await?;
    tracing::info!("Seed admin {} created", email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, models::roster::StudentRosterInput};

    fn registration(exam: &str) -> StudentRegistration {
        StudentRegistration {
            name: "Asha Toppo".into(),
            email: "asha@students.test".into(),
            password: "secret123".into(),
            registration_number: "22SXC001".into(),
            examination_number: exam.into(),
            course: "BCA".into(),
        }
    }

    async fn seed_roster(pool: &SqlitePool) {
        roster_service::add_student(
            pool,
            StudentRosterInput {
                name: "Asha Toppo".into(),
                registration_number: "22SXC001".into(),
                examination_number: "22VBCA001".into(),
                course: "BCA".into(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn partial_roster_match_is_refused() {
        let pool = test_pool().await;
        seed_roster(&pool).await;

        let err = register_student(&pool, registration("22VBCA999")).await.unwrap_err();
        assert!(matches!(err, AppError::RosterMismatch));
        assert!(account_service::list_accounts(&pool, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn registration_then_login() {
        let pool = test_pool().await;
        seed_roster(&pool).await;

        let account = register_student(&pool, registration("22VBCA001")).await.unwrap();
        assert!(account.is_active);

        let again = register_student(&pool, registration("22VBCA001")).await.unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));

        let logged = authenticate(&pool, "22VBCA001", "secret123").await.unwrap();
        assert_eq!(logged.id, account.id);
        assert!(matches!(
            authenticate(&pool, "22VBCA001", "wrong-pass").await,
            Err(AppError::InvalidCredentials)
        ));
    }
}
