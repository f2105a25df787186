// src/web/mw_auth.rs
use crate::{error::AppError, models::account::Account, services::account_service, state::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;

/// Session key holding the logged-in account id.
pub const SESSION_ACCOUNT_KEY: &str = "account_id";

/// The authenticated account, placed in request extensions by `require_auth`.
#[derive(Clone, Debug)]
pub struct CurrentAccount(pub Account);

/// Resolves the session into an active account or refuses the request.
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let account_id = match session.get::<i64>(SESSION_ACCOUNT_KEY).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            tracing::debug!("Auth MW: no account in session");
            return Err(AppError::Unauthorized);
        }
        Err(e) => {
            tracing::error!("Auth MW: failed to read session: {:?}", e);
            return Err(AppError::SessionError(format!("could not read session: {}", e)));
        }
    };

    match account_service::find_by_id(&state.db_pool, account_id).await? {
        Some(account) if account.is_active => {
            tracing::debug!("Auth MW: account {} authenticated", account.id);
            request.extensions_mut().insert(CurrentAccount(account));
            Ok(next.run(request).await)
        }
        Some(_) => {
            tracing::warn!("Auth MW: account {} is inactive, dropping session", account_id);
            if let Err(e) = session.flush().await {
                tracing::error!("Auth MW: failed to flush session: {:?}", e);
            }
            Err(AppError::Unauthorized)
        }
        None => {
            tracing::warn!("Auth MW: session points at missing account {}", account_id);
            Err(AppError::Unauthorized)
        }
    }
}
