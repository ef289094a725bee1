//! User handlers
//!
//! Implements user CRUD operations

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::{ApiJson, ApiPath, ApiQuery, MessageResponse};
use crate::entity::usuario::UsuarioResponse;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::permission::{authorize, authorize_privilege_change, Action, Resource};
use crate::state::AppState;
use crate::store::usuario::{self, NewUsuario, UsuarioChanges, UsuarioListParams};

/// GET /api/usuarios
pub async fn list_usuarios(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiQuery(params): ApiQuery<UsuarioListParams>,
) -> AppResult<Json<Vec<UsuarioResponse>>> {
    Ok(Json(usuario::list(&state.db, &actor, &params).await?))
}

/// GET /api/usuarios/:id
pub async fn get_usuario(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<UsuarioResponse>> {
    Ok(Json(usuario::get(&state.db, &actor, id).await?))
}

/// POST /api/usuarios
pub async fn create_usuario(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiJson(req): ApiJson<NewUsuario>,
) -> AppResult<(StatusCode, Json<UsuarioResponse>)> {
    authorize(&actor, Resource::Usuario, Action::Create, None)?;
    let user = usuario::create(&state.db, req, state.bcrypt_cost()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/usuarios/:id
pub async fn update_usuario(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<UsuarioChanges>,
) -> AppResult<Json<UsuarioResponse>> {
    authorize(&actor, Resource::Usuario, Action::Update, Some(id))?;
    if req.touches_privileges() {
        authorize_privilege_change(&actor)?;
    }
    let user = usuario::update(&state.db, &actor, id, req, state.bcrypt_cost()).await?;
    tracing::info!("User id={} updated by {}", id, actor.username);
    Ok(Json(user))
}

/// DELETE /api/usuarios/:id
pub async fn delete_usuario(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<MessageResponse>> {
    authorize(&actor, Resource::Usuario, Action::Delete, Some(id))?;
    usuario::delete(&state.db, &actor, id).await?;
    Ok(Json(MessageResponse::new("Usuário excluído com sucesso")))
}
