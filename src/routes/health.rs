use axum::{extract::State, http::StatusCode, response::Json};
use diesel::connection::SimpleConnection;
use serde_json::{json, Value};

use crate::state::AppState;

/// Liveness plus a round trip to the database. Reports 503 when the pool
/// cannot hand out a working connection.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database_ok = state
        .pool
        .get()
        .map_err(|err| err.to_string())
        .and_then(|mut conn| conn.batch_execute("SELECT 1").map_err(|err| err.to_string()));

    match database_ok {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "ok" })),
        ),
        Err(error) => {
            tracing::error!(%error, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable" })),
            )
        }
    }
}
