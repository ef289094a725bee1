//! Employee handlers

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};

use super::{ApiJson, ApiPath, ApiQuery, MessageResponse};
use crate::entity::funcionario::FuncionarioResponse;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::permission::{authorize, Action, Resource};
use crate::state::AppState;
use crate::store::funcionario::{self, FuncionarioChanges, NewFuncionario, SearchParams};

/// GET /api/funcionarios and /api/funcionarios/search
///
/// A malformed id filter is ignored and reported in a `Warning` header.
pub async fn search_funcionarios(
    State(state): State<AppState>,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> AppResult<Response> {
    let params = SearchParams::from_pairs(pairs);
    let outcome = funcionario::search(&state.db, &params).await?;

    let mut response = Json(outcome.funcionarios).into_response();
    if let Some(param) = outcome.ignored_param {
        let warning = format!("199 ramais \"Filtro invalido ignorado: {}\"", param);
        if let Ok(value) = HeaderValue::from_str(&warning) {
            response.headers_mut().insert(header::WARNING, value);
        }
    }
    Ok(response)
}

/// GET /api/funcionarios/:id
pub async fn get_funcionario(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<FuncionarioResponse>> {
    Ok(Json(funcionario::get(&state.db, id).await?))
}

/// POST /api/funcionarios
pub async fn create_funcionario(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiJson(req): ApiJson<NewFuncionario>,
) -> AppResult<(StatusCode, Json<FuncionarioResponse>)> {
    authorize(&actor, Resource::Funcionario, Action::Create, None)?;
    let created = funcionario::create(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/funcionarios/:id
pub async fn update_funcionario(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<FuncionarioChanges>,
) -> AppResult<Json<FuncionarioResponse>> {
    authorize(&actor, Resource::Funcionario, Action::Update, None)?;
    let updated = funcionario::update(&state.db, id, req).await?;
    tracing::info!("Funcionario id={} updated by {}", id, actor.username);
    Ok(Json(updated))
}

/// DELETE /api/funcionarios/:id
pub async fn delete_funcionario(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<MessageResponse>> {
    authorize(&actor, Resource::Funcionario, Action::Delete, None)?;
    funcionario::delete(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Funcionário excluído com sucesso")))
}
