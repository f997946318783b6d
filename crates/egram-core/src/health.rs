use axum::http::StatusCode;

/// Handler for `GET /healthz`: the process is up and serving requests.
///
/// Readiness depends on each service's backends, so `GET /readyz` lives with the service.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
