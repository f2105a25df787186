// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::account::{Account, LoginForm, ProfessorRegistration, ProfessorSummary, StudentRegistration},
    services::{account_service, auth_service},
    state::AppState,
    web::{done, mw_auth::{CurrentAccount, SESSION_ACCOUNT_KEY}},
};
use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_sessions::Session;

// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<Value>> {
    let account = auth_service::authenticate(&state.db_pool, &form.username, &form.password).await?;

    session
        .cycle_id()
        .await
        .map_err(|e| AppError::SessionError(format!("failed to cycle session id: {}", e)))?;
    session
        .insert(SESSION_ACCOUNT_KEY, account.id)
        .await
        .map_err(|e| AppError::SessionError(format!("failed to store session: {}", e)))?;

    Ok(done("Login successful", account))
}

// POST /auth/logout
pub async fn handle_logout(session: Session) -> AppResult<Json<Value>> {
    let account_id: Option<i64> = session.get(SESSION_ACCOUNT_KEY).await.ok().flatten();

    session
        .delete()
        .await
        .map_err(|e| AppError::SessionError(format!("failed to delete session: {}", e)))?;

    match account_id {
        Some(id) => tracing::info!("🚪 Account {} logged out", id),
        None => tracing::info!("🚪 Anonymous session closed"),
    }
    Ok(Json(json!({ "success": true, "message": "Logged out" })))
}

// POST /auth/register/student
pub async fn handle_register_student(
    State(db_pool): State<SqlitePool>,
    Json(form): Json<StudentRegistration>,
) -> AppResult<impl IntoResponse> {
    let account = auth_service::register_student(&db_pool, form).await?;
    Ok((StatusCode::CREATED, done("Student registered successfully", account)))
}

// POST /auth/register/professor
pub async fn handle_register_professor(
    State(db_pool): State<SqlitePool>,
    Json(form): Json<ProfessorRegistration>,
) -> AppResult<impl IntoResponse> {
    let account = auth_service::register_professor(&db_pool, form).await?;
    Ok((StatusCode::CREATED, done("Professor registered successfully", account)))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaminationNumberQuery {
    pub examination_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    pub user_id: String,
}

// GET /auth/check-email?email=
pub async fn check_email(
    State(db_pool): State<SqlitePool>,
    Query(query): Query<EmailQuery>,
) -> AppResult<Json<Value>> {
    let taken = account_service::exists_by_email(&db_pool, query.email.trim()).await?;
    Ok(Json(json!({ "available": !taken, "email": query.email })))
}

// GET /auth/check-examination-number?examinationNumber=
pub async fn check_examination_number(
    State(db_pool): State<SqlitePool>,
    Query(query): Query<ExaminationNumberQuery>,
) -> AppResult<Json<Value>> {
    let taken = account_service::exists_by_examination_number(&db_pool, query.examination_number.trim()).await?;
    Ok(Json(json!({ "available": !taken, "examinationNumber": query.examination_number })))
}

// GET /auth/check-user-id?userId=
pub async fn check_user_id(
    State(db_pool): State<SqlitePool>,
    Query(query): Query<UserIdQuery>,
) -> AppResult<Json<Value>> {
    let taken = account_service::exists_by_professor_user_id(&db_pool, query.user_id.trim()).await?;
    Ok(Json(json!({ "available": !taken, "userId": query.user_id })))
}

// GET /auth/me
pub async fn current_account(Extension(CurrentAccount(account)): Extension<CurrentAccount>) -> Json<Account> {
    Json(account)
}

// GET /professors
pub async fn list_professors(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<ProfessorSummary>>> {
    Ok(Json(account_service::list_active_professors(&db_pool).await?))
}

// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, services::account_service::fixtures as accounts};

    #[tokio::test]
    async fn availability_checks_reflect_registered_accounts() {
        let pool = test_pool().await;
        accounts::student(&pool, "Asha", "EX1").await;
        accounts::professor(&pool, "Dr. Roy", "PROF001").await;

        let taken = check_email(State(pool.clone()), Query(EmailQuery { email: "ex1@students.test".into() }))
            .await
            .unwrap();
        assert_eq!(taken.0["available"], false);
        assert_eq!(taken.0["email"], "ex1@students.test");

        let free = check_email(State(pool.clone()), Query(EmailQuery { email: "new@students.test".into() }))
            .await
            .unwrap();
        assert_eq!(free.0["available"], true);

        let exam = check_examination_number(
            State(pool.clone()),
            Query(ExaminationNumberQuery { examination_number: " EX1 ".into() }),
        )
        .await
        .unwrap();
        assert_eq!(exam.0["available"], false);

        let uid = check_user_id(State(pool.clone()), Query(UserIdQuery { user_id: "PROF002".into() }))
            .await
            .unwrap();
        assert_eq!(uid.0["available"], true);
        assert_eq!(uid.0["userId"], "PROF002");
    }
}
