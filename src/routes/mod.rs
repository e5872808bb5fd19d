use axum::http::{HeaderValue, StatusCode};
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod health;
pub mod maid;
pub mod senior_cleaner;
pub mod views;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = build_cors(state.config.cors_allowed_origin.as_deref());

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    Router::new()
        .nest("/api/auth", auth_routes)
        .route("/api/admin", any(admin::dispatch))
        .route("/api/maid", any(maid::dispatch))
        .route("/api/senior-cleaner", any(senior_cleaner::dispatch))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
}

fn build_cors(allowed: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(_) => {
                        tracing::warn!(origin = value, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub(crate) fn respond<T: Serialize>(status: StatusCode, body: T) -> AppResult<Response> {
    Ok((status, Json(body)).into_response())
}

pub(crate) fn unknown_action(action: &str) -> AppError {
    if action.is_empty() {
        AppError::new(StatusCode::NOT_FOUND, "action is required")
    } else {
        AppError::new(StatusCode::NOT_FOUND, format!("unknown action: {action}"))
    }
}
