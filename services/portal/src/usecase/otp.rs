use anyhow::Context as _;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use egram_domain::email::Email;
use egram_domain::otp::OneTimeCode;

use crate::domain::repository::{EmailSender, KeyValueStore};
use crate::domain::types::{OtpRecord, otp_key};
use crate::error::PortalError;

pub struct IssueOtpInput {
    pub email: String,
    pub name: String,
}

#[derive(Debug)]
pub struct IssueOtpOutput {
    pub email: Email,
    pub expires_at: DateTime<Utc>,
}

/// Sends a fresh code and records it. Nothing is written unless dispatch succeeded.
async fn issue<K, M>(
    store: &K,
    mailer: &M,
    input: IssueOtpInput,
) -> Result<IssueOtpOutput, PortalError>
where
    K: KeyValueStore,
    M: EmailSender,
{
    let email = Email::parse(&input.email).map_err(|_| PortalError::InvalidEmail)?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(PortalError::MissingField("name"));
    }

    let code = OneTimeCode::generate();
    mailer.send(&email, name, &code).await?;

    let record = OtpRecord::new(&email, code, Utc::now());
    let value = serde_json::to_string(&record).context("serialize otp record")?;
    store.set(&otp_key(&email), &value).await?;

    info!(email = %email, expires_at = %record.expires_at(), "one-time code issued");
    Ok(IssueOtpOutput {
        email,
        expires_at: record.expires_at(),
    })
}

async fn load_record<K: KeyValueStore>(
    store: &K,
    email: &Email,
) -> Result<Option<OtpRecord>, PortalError> {
    let Some(raw) = store.get(&otp_key(email)).await? else {
        return Ok(None);
    };
    let record = OtpRecord::decode(&raw);
    if record.is_none() {
        warn!(email = %email, "ignoring malformed one-time code record");
    }
    Ok(record)
}

// ── Issue ─────────────────────────────────────────────────────────────────────

pub struct IssueOtpUseCase<K, M>
where
    K: KeyValueStore,
    M: EmailSender,
{
    pub store: K,
    pub mailer: M,
}

impl<K, M> IssueOtpUseCase<K, M>
where
    K: KeyValueStore,
    M: EmailSender,
{
    /// Replaces any code previously issued to the same address.
    pub async fn execute(&self, input: IssueOtpInput) -> Result<IssueOtpOutput, PortalError> {
        issue(&self.store, &self.mailer, input).await
    }
}

// ── Resend ────────────────────────────────────────────────────────────────────

pub struct ResendOtpUseCase<K, M>
where
    K: KeyValueStore,
    M: EmailSender,
{
    pub store: K,
    pub mailer: M,
}

impl<K, M> ResendOtpUseCase<K, M>
where
    K: KeyValueStore,
    M: EmailSender,
{
    /// Same as issuing, but refused while the previous code still has time left.
    pub async fn execute(&self, input: IssueOtpInput) -> Result<IssueOtpOutput, PortalError> {
        let email = Email::parse(&input.email).map_err(|_| PortalError::InvalidEmail)?;
        let remaining_seconds = match load_record(&self.store, &email).await? {
            Some(record) => record.remaining_seconds(Utc::now()),
            None => 0,
        };
        if remaining_seconds > 0 {
            return Err(PortalError::ResendTooSoon { remaining_seconds });
        }
        issue(&self.store, &self.mailer, input).await
    }
}

// ── Verify ────────────────────────────────────────────────────────────────────

pub struct VerifyOtpUseCase<K: KeyValueStore> {
    pub store: K,
}

impl<K: KeyValueStore> VerifyOtpUseCase<K> {
    /// `true` at most once per issued code. A wrong code leaves the record in place so the
    /// user can retry until it expires; an expired record is removed on sight.
    pub async fn execute(&self, email: &str, submitted_code: &str) -> Result<bool, PortalError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(false);
        };
        let Some(record) = load_record(&self.store, &email).await? else {
            return Ok(false);
        };

        let key = otp_key(&email);
        if record.is_expired(Utc::now()) {
            self.store.remove(&key).await?;
            info!(email = %email, "expired one-time code discarded");
            return Ok(false);
        }

        if !record.matches(&email, submitted_code) {
            return Ok(false);
        }

        self.store.remove(&key).await?;
        info!(email = %email, "one-time code verified");
        Ok(true)
    }
}

// ── Remaining time ────────────────────────────────────────────────────────────

pub struct OtpRemainingUseCase<K: KeyValueStore> {
    pub store: K,
}

impl<K: KeyValueStore> OtpRemainingUseCase<K> {
    /// Seconds until the current code expires; 0 when there is no usable code.
    pub async fn execute(&self, email: &str) -> Result<u64, PortalError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(0);
        };
        Ok(load_record(&self.store, &email)
            .await?
            .map_or(0, |record| record.remaining_seconds(Utc::now())))
    }
}
