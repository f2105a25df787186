// src/web/document_handlers.rs
use crate::{
    error::AppResult,
    models::document::IssuedDocument,
    services::document_service,
    state::AppState,
    web::mw_auth::CurrentAccount,
};
use axum::{
    extract::{Extension, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;

// GET /documents/{reference}
pub async fn document_info(
    State(db_pool): State<SqlitePool>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(reference): Path<String>,
) -> AppResult<Json<IssuedDocument>> {
    Ok(Json(document_service::document_info(&db_pool, &reference, &account).await?))
}

// GET /documents/{reference}/download
pub async fn download_document(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(reference): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (document, bytes) = document_service::download(&state.db_pool, &state.storage, &reference, &account).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        document.file_name,
        urlencoding::encode(&document.file_name)
    );
    let headers = [
        (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, bytes))
}
