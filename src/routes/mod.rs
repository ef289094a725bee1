use axum::{
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, MethodRouter},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::entity::{departamento, funcao, unidade};
use crate::handlers::{self, lookup};
use crate::middleware::auth_layer;
use crate::state::AppState;
use crate::store::lookup::LookupTable;

pub mod health;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // Session store (in-memory; sessions are lost on restart)
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.config.auth.secure_cookie)
        .with_http_only(true);

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new();
    // Health check
    let api_routes = route(api_routes, "/health", get(health::health_check));
    // Auth routes
    let api_routes = route(api_routes, "/auth/login", post(handlers::auth::login));
    let api_routes = route(api_routes, "/auth/logout", post(handlers::auth::logout));
    let api_routes = route(api_routes, "/auth/me", get(handlers::auth::me));
    // User routes
    let api_routes = route(
        api_routes,
        "/usuarios",
        get(handlers::usuario::list_usuarios).post(handlers::usuario::create_usuario),
    );
    let api_routes = route(
        api_routes,
        "/usuarios/:id",
        get(handlers::usuario::get_usuario)
            .put(handlers::usuario::update_usuario)
            .delete(handlers::usuario::delete_usuario),
    );
    // Employee routes
    let api_routes = route(
        api_routes,
        "/funcionarios",
        get(handlers::funcionario::search_funcionarios)
            .post(handlers::funcionario::create_funcionario),
    );
    let api_routes = route(
        api_routes,
        "/funcionarios/search",
        get(handlers::funcionario::search_funcionarios),
    );
    let api_routes = route(
        api_routes,
        "/funcionarios/:id",
        get(handlers::funcionario::get_funcionario)
            .put(handlers::funcionario::update_funcionario)
            .delete(handlers::funcionario::delete_funcionario),
    );

    // Lookup tables
    let api_routes = lookup_routes::<departamento::Entity>(api_routes, "/departamentos");
    let api_routes = lookup_routes::<funcao::Entity>(api_routes, "/funcoes");
    let api_routes = lookup_routes::<unidade::Entity>(api_routes, "/unidades");

    Router::new()
        .nest("/api", api_routes)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Mount `path` with and without a trailing slash
fn route(
    router: Router<AppState>,
    path: &str,
    method_router: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(&format!("{}/", path), method_router.clone())
        .route(path, method_router)
}

/// Mount list/create and get/update/delete for one lookup table
fn lookup_routes<T: LookupTable>(router: Router<AppState>, base: &str) -> Router<AppState> {
    let router = route(router, base, get(lookup::list::<T>).post(lookup::create::<T>));
    route(
        router,
        &format!("{}/:id", base),
        get(lookup::get::<T>)
            .put(lookup::update::<T>)
            .delete(lookup::delete::<T>),
    )
}

/// Fallback handler for 404
pub async fn fallback() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "Recurso não encontrado"})),
    )
}
