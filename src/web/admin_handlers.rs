// src/web/admin_handlers.rs
use crate::{
    error::AppResult,
    models::{
        account::{Account, Role},
        lor_request::LorRequestView,
        roster::{
            ImportReport, DEPARTMENTS, Page, ProfessorRoster, ProfessorRosterInput, RosterSearchParams, StudentRoster,
            StudentRosterInput,
        },
    },
    services::{
        account_service,
        dashboard_service::{self, DashboardStats},
        document_service, import_service, request_service, roster_service,
    },
    state::AppState,
    web::{done, mw_auth::CurrentAccount},
};
use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

// --- Student roster ---

// GET /admin/roster/students
pub async fn list_roster_students(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<StudentRoster>>> {
    Ok(Json(roster_service::list_students(&db_pool).await?))
}

// GET /admin/roster/students/search?q=&filter=&page=&size=
pub async fn search_roster_students(
    State(db_pool): State<SqlitePool>,
    Query(params): Query<RosterSearchParams>,
) -> AppResult<Json<Page<StudentRoster>>> {
    Ok(Json(roster_service::search_students(&db_pool, &params).await?))
}

// POST /admin/roster/students
pub async fn add_roster_student(
    State(db_pool): State<SqlitePool>,
    Json(input): Json<StudentRosterInput>,
) -> AppResult<impl IntoResponse> {
    let row = roster_service::add_student(&db_pool, input).await?;
    Ok((StatusCode::CREATED, done("Student added to roster", row)))
}

// GET /admin/roster/students/{id}
pub async fn get_roster_student(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> AppResult<Json<StudentRoster>> {
    Ok(Json(roster_service::find_student(&db_pool, id).await?))
}

// PUT /admin/roster/students/{id}
pub async fn update_roster_student(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(input): Json<StudentRosterInput>,
) -> AppResult<Json<Value>> {
    let row = roster_service::update_student(&db_pool, id, input).await?;
    Ok(done("Roster student updated", row))
}

// DELETE /admin/roster/students/{id}
pub async fn delete_roster_student(State(db_pool): State<SqlitePool>, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    roster_service::delete_student(&db_pool, id).await?;
    Ok(done("Roster student deleted", id))
}

// --- Professor roster ---

// GET /admin/roster/professors
pub async fn list_roster_professors(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<ProfessorRoster>>> {
    Ok(Json(roster_service::list_professors(&db_pool).await?))
}

// GET /admin/roster/professors/search?q=&filter=&page=&size=
pub async fn search_roster_professors(
    State(db_pool): State<SqlitePool>,
    Query(params): Query<RosterSearchParams>,
) -> AppResult<Json<Page<ProfessorRoster>>> {
    Ok(Json(roster_service::search_professors(&db_pool, &params).await?))
}

// POST /admin/roster/professors
pub async fn add_roster_professor(
    State(db_pool): State<SqlitePool>,
    Json(input): Json<ProfessorRosterInput>,
) -> AppResult<impl IntoResponse> {
    let row = roster_service::add_professor(&db_pool, input).await?;
    Ok((StatusCode::CREATED, done("Professor added to roster", row)))
}

// GET /admin/roster/professors/{id}
pub async fn get_roster_professor(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> AppResult<Json<ProfessorRoster>> {
    Ok(Json(roster_service::find_professor(&db_pool, id).await?))
}

// PUT /admin/roster/professors/{id}
pub async fn update_roster_professor(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(input): Json<ProfessorRosterInput>,
) -> AppResult<Json<Value>> {
    let row = roster_service::update_professor(&db_pool, id, input).await?;
    Ok(done("Roster professor updated", row))
}

// DELETE /admin/roster/professors/{id}
pub async fn delete_roster_professor(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    roster_service::delete_professor(&db_pool, id).await?;
    Ok(done("Roster professor deleted", id))
}

// GET /admin/students/courses
pub async fn list_courses(State(db_pool): State<SqlitePool>) -> AppResult<Json<Value>> {
    let courses = roster_service::list_student_courses(&db_pool).await?;
    Ok(Json(json!({ "count": courses.len(), "courses": courses })))
}

// GET /admin/departments
pub async fn list_departments() -> Json<Value> {
    Json(json!({ "count": DEPARTMENTS.len(), "departments": DEPARTMENTS }))
}

// --- Bulk import ---

fn csv_attachment(file_name: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        body,
    )
}

// GET /admin/import/students/template
pub async fn student_template() -> impl IntoResponse {
    csv_attachment("student_roster_template.csv", import_service::student_csv_template())
}

// GET /admin/import/professors/template
pub async fn professor_template() -> impl IntoResponse {
    csv_attachment("professor_roster_template.csv", import_service::professor_csv_template())
}

// POST /admin/import/students  (raw CSV body)
pub async fn import_students(
    State(db_pool): State<SqlitePool>,
    body: Bytes,
) -> AppResult<Json<ImportReport<StudentRoster>>> {
    tracing::info!("Student roster upload received ({} bytes)", body.len());
    Ok(Json(import_service::import_students(&db_pool, &body).await?))
}

// POST /admin/import/professors  (raw CSV body)
pub async fn import_professors(
    State(db_pool): State<SqlitePool>,
    body: Bytes,
) -> AppResult<Json<ImportReport<ProfessorRoster>>> {
    tracing::info!("Professor roster upload received ({} bytes)", body.len());
    Ok(Json(import_service::import_professors(&db_pool, &body).await?))
}

// --- Accounts, requests, documents ---

#[derive(Debug, Deserialize)]
pub struct AccountFilter {
    pub role: Option<String>,
}

// GET /admin/accounts?role=
pub async fn list_accounts(
    State(db_pool): State<SqlitePool>,
    Query(filter): Query<AccountFilter>,
) -> AppResult<Json<Vec<Account>>> {
    let role = filter
        .role
        .as_deref()
        .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case("all"))
        .map(str::parse::<Role>)
        .transpose()?;
    Ok(Json(account_service::list_accounts(&db_pool, role).await?))
}

// POST /admin/accounts/{id}/toggle
pub async fn toggle_account(State(db_pool): State<SqlitePool>, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    let account = account_service::toggle_account_status(&db_pool, id).await?;
    let message = if account.is_active { "Account activated" } else { "Account deactivated" };
    Ok(done(message, account))
}

// GET /admin/requests
pub async fn list_requests(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<LorRequestView>>> {
    Ok(Json(request_service::list_all(&db_pool).await?))
}

// GET /admin/stats
pub async fn dashboard(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(admin)): Extension<CurrentAccount>,
) -> AppResult<Json<DashboardStats>> {
    Ok(Json(dashboard_service::dashboard(&db_pool, &admin).await?))
}

// DELETE /admin/documents/{reference}
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(CurrentAccount(admin)): Extension<CurrentAccount>,
    Path(reference): Path<String>,
) -> AppResult<Json<Value>> {
    document_service::delete_document(&state.db_pool, &state.storage, &reference, &admin).await?;
    Ok(done("Document deleted successfully", reference))
}
