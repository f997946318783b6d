use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Portal service error variants.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid file identifier")]
    InvalidFileId,
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
    #[error("file record is {size} bytes, larger than the {limit} byte limit")]
    FileTooLarge { size: usize, limit: usize },
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("stored file could not be read back")]
    StoreVerificationFailed,
    #[error("file not found")]
    FileNotFound,
    #[error("file is corrupted")]
    FileCorrupted,
    #[error("a code was already sent; resend available in {remaining_seconds} seconds")]
    ResendTooSoon { remaining_seconds: u64 },
    #[error("failed to send verification email")]
    EmailDispatch(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidFileId => "INVALID_FILE_ID",
            Self::InvalidUpload(_) => "INVALID_UPLOAD",
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::StoreVerificationFailed => "STORE_VERIFICATION_FAILED",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::FileCorrupted => "FILE_CORRUPTED",
            Self::ResendTooSoon { .. } => "RESEND_TOO_SOON",
            Self::EmailDispatch(_) => "EMAIL_DISPATCH_FAILED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEmail
            | Self::MissingField(_)
            | Self::InvalidFileId
            | Self::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::QuotaExceeded => StatusCode::INSUFFICIENT_STORAGE,
            Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::FileCorrupted => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ResendTooSoon { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::EmailDispatch(_) => StatusCode::BAD_GATEWAY,
            Self::StoreVerificationFailed | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        // TraceLayer records every status; only server-side failures carry a cause worth logging.
        match &self {
            Self::Internal(e) | Self::EmailDispatch(e) => {
                tracing::error!(error = ?e, kind = self.kind(), "request failed");
            }
            Self::StoreVerificationFailed => {
                tracing::error!(kind = self.kind(), "request failed");
            }
            _ => {}
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        let mut response = (status, axum::Json(body)).into_response();
        if let Self::ResendTooSoon { remaining_seconds } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(remaining_seconds),
            );
        }
        response
    }
}
