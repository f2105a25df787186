// src/web/mw_admin.rs
use crate::{error::AppError, web::mw_auth::CurrentAccount};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

/// Admin-only gate. Runs after `require_auth`.
pub async fn require_admin(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !account.is_admin() {
        tracing::warn!("Admin MW: access denied for account {}", account.id);
        return Err(AppError::Forbidden("admin access required".into()));
    }
    tracing::debug!("Admin MW: access granted for account {}", account.id);
    Ok(next.run(request).await)
}
