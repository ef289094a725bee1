//! Handlers shared by the departamento, funcao and unidade endpoints

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;

use super::{ApiJson, ApiPath, ApiQuery, MessageResponse};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::permission::{authorize, Action};
use crate::state::AppState;
use crate::store::lookup::{self, LookupChanges, LookupResponse, LookupTable};

#[derive(Debug, Deserialize)]
pub struct CreateLookupRequest {
    #[serde(default)]
    pub nome: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
}

pub async fn list<T: LookupTable>(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<Json<Vec<LookupResponse>>> {
    Ok(Json(lookup::list::<T>(&state.db, params.search.as_deref()).await?))
}

pub async fn get<T: LookupTable>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<LookupResponse>> {
    Ok(Json(lookup::get::<T>(&state.db, id).await?))
}

pub async fn create<T: LookupTable>(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateLookupRequest>,
) -> AppResult<(StatusCode, Json<LookupResponse>)> {
    authorize(&actor, T::RESOURCE, Action::Create, None)?;
    let created = lookup::create::<T>(&state.db, &req.nome).await?;
    tracing::info!("{:?} id={} created by {}", T::RESOURCE, created.id, actor.username);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update<T: LookupTable>(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<LookupChanges>,
) -> AppResult<Json<LookupResponse>> {
    authorize(&actor, T::RESOURCE, Action::Update, None)?;
    Ok(Json(lookup::update::<T>(&state.db, id, req).await?))
}

pub async fn delete<T: LookupTable>(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<MessageResponse>> {
    authorize(&actor, T::RESOURCE, Action::Delete, None)?;
    lookup::delete::<T>(&state.db, id).await?;
    tracing::info!("{:?} id={} deleted by {}", T::RESOURCE, id, actor.username);
    Ok(Json(MessageResponse::new("Registro excluído com sucesso")))
}
