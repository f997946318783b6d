use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower::ServiceBuilder;

use egram_core::health::healthz;
use egram_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::domain::types::MAX_FILE_RECORD_BYTES;
use crate::handlers::{
    files::{
        cleanup_files, download_file, file_exists, get_file, get_file_metadata, storage_usage,
        upload_file,
    },
    health::readyz,
    otp::{issue_otp, otp_remaining, resend_otp, verify_otp},
};
use crate::state::AppState;

/// Request bodies above this are refused before reaching the upload handler. Uploads that
/// fit here but not in a file record are rejected by the store with `FILE_TOO_LARGE`.
pub const MAX_REQUEST_BODY_BYTES: usize = MAX_FILE_RECORD_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // One-time codes
        .route("/otp", post(issue_otp))
        .route("/otp/resend", post(resend_otp))
        .route("/otp/verify", post(verify_otp))
        .route("/otp/remaining", get(otp_remaining))
        // Files
        .route("/files", post(upload_file))
        .route("/files/usage", get(storage_usage))
        .route("/files/cleanup", post(cleanup_files))
        .route("/files/{id}", get(get_file))
        .route("/files/{id}/metadata", get(get_file_metadata))
        .route("/files/{id}/exists", get(file_exists))
        .route("/files/{id}/download", get(download_file))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(trace_layer())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
