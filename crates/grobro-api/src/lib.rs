//! GroBro REST API: handlers, auth middleware and the messaging policy.

pub mod auth;
pub mod convert;
pub mod crops;
pub mod error;
pub mod files;
pub mod messages;
pub mod messaging;
pub mod middleware;
pub mod notify;
pub mod policy;
pub mod profiles;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use grobro_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(Into::into)
}

/// Every GroBro route, with CORS and request tracing applied.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users/{id}", get(profiles::get_profile))
        .route("/users/{id}/stand", get(profiles::get_stand))
        .route("/crops/{id}", get(crops::get_crop))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/messages", get(messages::get_inbox))
        .route("/messages/{crop_id}", get(messages::get_crop_messages))
        .route("/users/{id}/messages/{crop_id}", post(messages::send_message))
        .route("/users/settings", put(profiles::update_settings))
        .route("/users/stand", put(profiles::add_stand))
        .route("/users/avatar", post(files::upload_avatar))
        .route("/crops", post(crops::create_crop))
        .route("/crops/{id}/photos", post(crops::add_photo))
        .layer(DefaultBodyLimit::max(files::MAX_UPLOAD_SIZE))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state.clone());

    let uploads = Router::new().nest_service("/uploads", ServeDir::new(state.storage.dir()));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(uploads)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
