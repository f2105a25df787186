// src/web/request_handlers.rs
use crate::{
    error::AppResult,
    models::{
        account::Role,
        document::{IssuedDocument, LetterOverrides, LetterPreview},
        lor_request::{DecisionForm, LorRequestView, RequestCounts, RequestForm},
    },
    services::{document_service, request_service},
    state::AppState,
    web::{done, mw_auth::CurrentAccount, require_role},
};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use sqlx::SqlitePool;

// POST /requests
pub async fn create_request(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(form): Json<RequestForm>,
) -> AppResult<impl IntoResponse> {
    let request = request_service::create(&db_pool, &account, form).await?;
    Ok((StatusCode::CREATED, done("LOR request submitted successfully", request)))
}

// GET /requests/student
pub async fn student_requests(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> AppResult<Json<Vec<LorRequestView>>> {
    require_role(&account, Role::Student)?;
    Ok(Json(request_service::list_for_student(&db_pool, &account).await?))
}

// GET /requests/student/approved
pub async fn student_approved_requests(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> AppResult<Json<Vec<LorRequestView>>> {
    require_role(&account, Role::Student)?;
    Ok(Json(request_service::list_approved_for_student(&db_pool, &account).await?))
}

// GET /requests/professor
pub async fn professor_requests(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> AppResult<Json<Vec<LorRequestView>>> {
    require_role(&account, Role::Professor)?;
    Ok(Json(request_service::list_for_professor(&db_pool, &account).await?))
}

// GET /requests/professor/pending
pub async fn professor_pending_requests(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> AppResult<Json<Vec<LorRequestView>>> {
    require_role(&account, Role::Professor)?;
    Ok(Json(request_service::list_pending_for_professor(&db_pool, &account).await?))
}

// GET /requests/stats
pub async fn request_stats(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> AppResult<Json<RequestCounts>> {
    Ok(Json(request_service::counts_for(&db_pool, &account).await?))
}

// GET /requests/{id}
pub async fn get_request(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(id): Path<i64>,
) -> AppResult<Json<LorRequestView>> {
    Ok(Json(request_service::get(&db_pool, id, &account).await?))
}

// DELETE /requests/{id}
pub async fn delete_request(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    request_service::delete(&state.db_pool, &state.storage, id, &account).await?;
    Ok(done("LOR request deleted successfully", id))
}

// POST /requests/{id}/approve
pub async fn approve_request(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(id): Path<i64>,
    Json(form): Json<DecisionForm>,
) -> AppResult<Json<Value>> {
    let request = request_service::approve(&db_pool, id, &account, form.comments).await?;
    Ok(done("LOR request approved successfully", request))
}

// POST /requests/{id}/reject
pub async fn reject_request(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(id): Path<i64>,
    Json(form): Json<DecisionForm>,
) -> AppResult<Json<Value>> {
    let request = request_service::reject(&db_pool, id, &account, form.comments).await?;
    Ok(done("LOR request rejected", request))
}

// GET /requests/{id}/preview
pub async fn preview_letter(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(id): Path<i64>,
) -> AppResult<Json<LetterPreview>> {
    Ok(Json(document_service::preview(&db_pool, id, &account).await?))
}

// POST /requests/{id}/document
// Body: letter overrides, `{}` for the default letter.
pub async fn issue_document(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(id): Path<i64>,
    Json(overrides): Json<LetterOverrides>,
) -> AppResult<Json<IssuedDocument>> {
    let document = document_service::issue(&state.db_pool, &state.storage, id, &account, Some(overrides)).await?;
    Ok(Json(document))
}
