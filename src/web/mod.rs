// src/web/mod.rs
pub mod admin_handlers;
pub mod auth_handlers;
pub mod document_handlers;
pub mod mw_admin;
pub mod mw_auth;
pub mod request_handlers;
pub mod routes;

use crate::{
    error::{AppError, AppResult},
    models::account::{Account, Role},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Refuses accounts of any other role.
pub fn require_role(account: &Account, role: Role) -> AppResult<()> {
    if account.role() != role {
        tracing::warn!("Account {} ({}) tried a {} action", account.id, account.role(), role);
        return Err(AppError::Forbidden(format!("only {} accounts can do this", role.as_str().to_lowercase())));
    }
    Ok(())
}

/// `{success: true, message, data}` envelope for mutating endpoints.
pub fn done<T: Serialize>(message: &str, data: T) -> axum::Json<Value> {
    axum::Json(json!({ "success": true, "message": message, "data": data }))
}
