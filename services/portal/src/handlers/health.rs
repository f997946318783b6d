use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Handler for `GET /readyz`: ready once the storage backend answers.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    match state.kv_store().ping().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "storage backend not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
