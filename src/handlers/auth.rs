//! Authentication handlers
//!
//! Implements login, logout, and current user endpoints

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::{ApiJson, MessageResponse};
use crate::entity::usuario::UsuarioResponse;
use crate::error::{AppError, AppResult, OptionExt};
use crate::middleware::auth::{CurrentUser, SESSION_USER_KEY};
use crate::state::AppState;
use crate::store;

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UsuarioResponse,
    /// Bearer token for clients without a cookie jar
    pub token: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Usuário e senha são obrigatórios".to_string(),
        ));
    }

    let user = store::usuario::authenticate(&state.db, username, &req.password, state.bcrypt_cost())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Credenciais inválidas".to_string()))?;

    let user = store::usuario::record_login(&state.db, user).await?;
    let token = state.tokens.sign(user.id, &user.username)?;

    // New id on privilege change
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to cycle session: {}", e)))?;
    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to save session: {}", e)))?;

    tracing::info!("User logged in: {}", user.username);

    Ok(Json(LoginResponse {
        message: "Login realizado com sucesso".to_string(),
        user: user.into(),
        token,
    }))
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> AppResult<Json<MessageResponse>> {
    let user_id: Option<i32> = session.get(SESSION_USER_KEY).await.unwrap_or(None);

    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to flush session: {}", e)))?;

    if let Some(id) = user_id {
        tracing::info!("User logged out: id={}", id);
    }
    Ok(Json(MessageResponse::new("Logout realizado com sucesso")))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<UsuarioResponse>> {
    let user = store::usuario::find_active(&state.db, current_user.id)
        .await?
        .ok_or_not_found("Usuário não encontrado")?;
    Ok(Json(user.into()))
}
