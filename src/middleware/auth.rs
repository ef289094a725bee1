//! Authentication middleware
//!
//! Resolves the acting user from the session cookie, or from a bearer token
//! when no session is present, and attaches it to the request as
//! [`CurrentUser`].

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::entity::usuario;
use crate::error::{AppError, AppResult};
use crate::middleware::token::bearer_token;
use crate::state::AppState;
use crate::store;

/// Session key for storing the user id
pub const SESSION_USER_KEY: &str = "user_id";

/// Extension to store current user in request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
    pub can_edit: bool,
}

impl From<&usuario::Model> for CurrentUser {
    fn from(user: &usuario::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
            can_edit: user.can_edit,
        }
    }
}

/// Paths that don't require authentication
fn is_public_path(path: &str) -> bool {
    // Anything outside the API is a plain 404
    if !path.starts_with("/api") {
        return true;
    }

    matches!(
        path.trim_end_matches('/'),
        "/api/health" | "/api/auth/login" | "/api/auth/logout"
    )
}

/// Authentication middleware
pub async fn auth_layer(
    State(state): State<AppState>,
    session: Session,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    match resolve_user(&state, &session, request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Look up the acting user; inactive or vanished accounts are rejected
async fn resolve_user(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
) -> AppResult<CurrentUser> {
    let session_user: Option<i32> = session.get(SESSION_USER_KEY).await.unwrap_or(None);

    let (user_id, from_session) = match session_user {
        Some(id) => (id, true),
        None => {
            let token = headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(bearer_token)
                .ok_or_else(|| AppError::Unauthorized("Não autenticado".to_string()))?;

            let claims = state.tokens.verify(token).map_err(|e| {
                tracing::debug!("Rejected bearer token: {}", e);
                AppError::Unauthorized("Token inválido".to_string())
            })?;
            (claims.sub, false)
        }
    };

    match store::usuario::find_active(&state.db, user_id).await? {
        Some(user) => Ok(CurrentUser::from(&user)),
        None => {
            tracing::warn!("Session or token refers to missing/inactive user id={}", user_id);
            if from_session {
                if let Err(e) = session.flush().await {
                    tracing::error!("Failed to flush session: {}", e);
                }
            }
            Err(AppError::Unauthorized("Usuário inválido".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        assert!(is_public_path("/api/health"));
        assert!(is_public_path("/api/auth/login"));
        assert!(is_public_path("/api/auth/logout"));
        assert!(is_public_path("/api/auth/login/"));
        assert!(is_public_path("/favicon.ico"));
        assert!(!is_public_path("/api/auth/me"));
        assert!(!is_public_path("/api/funcionarios"));
        assert!(!is_public_path("/api/funcionarios/"));
        assert!(!is_public_path("/api/usuarios"));
    }
}
