use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use egram_core::serde::to_rfc3339_ms;

use crate::error::PortalError;
use crate::state::AppState;
use crate::usecase::otp::{
    IssueOtpInput, IssueOtpOutput, IssueOtpUseCase, OtpRemainingUseCase, ResendOtpUseCase,
    VerifyOtpUseCase,
};

#[derive(Deserialize)]
pub struct IssueOtpRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize)]
pub struct IssueOtpResponse {
    pub email: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

impl From<IssueOtpOutput> for IssueOtpResponse {
    fn from(output: IssueOtpOutput) -> Self {
        Self {
            email: output.email.into(),
            expires_at: output.expires_at,
        }
    }
}

// ── POST /otp ─────────────────────────────────────────────────────────────────

pub async fn issue_otp(
    State(state): State<AppState>,
    Json(body): Json<IssueOtpRequest>,
) -> Result<(StatusCode, Json<IssueOtpResponse>), PortalError> {
    let usecase = IssueOtpUseCase {
        store: state.kv_store(),
        mailer: state.mailer(),
    };
    let output = usecase
        .execute(IssueOtpInput {
            email: body.email,
            name: body.name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(output.into())))
}

// ── POST /otp/resend ──────────────────────────────────────────────────────────

pub async fn resend_otp(
    State(state): State<AppState>,
    Json(body): Json<IssueOtpRequest>,
) -> Result<(StatusCode, Json<IssueOtpResponse>), PortalError> {
    let usecase = ResendOtpUseCase {
        store: state.kv_store(),
        mailer: state.mailer(),
    };
    let output = usecase
        .execute(IssueOtpInput {
            email: body.email,
            name: body.name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(output.into())))
}

// ── POST /otp/verify ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyOtpResponse {
    pub verified: bool,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, PortalError> {
    let usecase = VerifyOtpUseCase {
        store: state.kv_store(),
    };
    let verified = usecase.execute(&body.email, &body.code).await?;
    Ok(Json(VerifyOtpResponse { verified }))
}

// ── GET /otp/remaining ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RemainingQuery {
    pub email: String,
}

#[derive(Serialize)]
pub struct RemainingResponse {
    pub remaining_seconds: u64,
}

pub async fn otp_remaining(
    State(state): State<AppState>,
    Query(query): Query<RemainingQuery>,
) -> Result<Json<RemainingResponse>, PortalError> {
    let usecase = OtpRemainingUseCase {
        store: state.kv_store(),
    };
    let remaining_seconds = usecase.execute(&query.email).await?;
    Ok(Json(RemainingResponse { remaining_seconds }))
}
