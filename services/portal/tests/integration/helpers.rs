use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use egram_domain::data_uri::DataUri;
use egram_domain::email::Email;
use egram_domain::otp::OneTimeCode;
use egram_portal::domain::repository::{EmailSender, KeyValueStore};
use egram_portal::domain::types::{OtpRecord, StoredFileRecord, otp_key};
use egram_portal::error::PortalError;
use egram_portal::infra::memory::MemoryKvStore;

pub const TEST_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

pub fn memory_store() -> MemoryKvStore {
    MemoryKvStore::new(TEST_QUOTA_BYTES)
}

// ── MockEmailSender ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SentCode {
    pub to: String,
    pub name: String,
    pub code: String,
}

#[derive(Clone, Default)]
pub struct MockEmailSender {
    pub sent: Arc<Mutex<Vec<SentCode>>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code from the most recent email to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.to == to)
            .map(|s| s.code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl EmailSender for MockEmailSender {
    async fn send(
        &self,
        to: &Email,
        recipient_name: &str,
        code: &OneTimeCode,
    ) -> Result<(), PortalError> {
        self.sent.lock().unwrap().push(SentCode {
            to: to.to_string(),
            name: recipient_name.to_owned(),
            code: code.as_str().to_owned(),
        });
        Ok(())
    }
}

// ── FailingEmailSender ───────────────────────────────────────────────────────

pub struct FailingEmailSender;

impl EmailSender for FailingEmailSender {
    async fn send(
        &self,
        _to: &Email,
        _recipient_name: &str,
        _code: &OneTimeCode,
    ) -> Result<(), PortalError> {
        Err(PortalError::EmailDispatch(anyhow::anyhow!(
            "mail provider unavailable"
        )))
    }
}

// ── LossyStore ───────────────────────────────────────────────────────────────

/// Accepts writes but reads back something else, as a backend that silently drops data would.
#[derive(Clone)]
pub struct LossyStore {
    pub inner: MemoryKvStore,
}

impl KeyValueStore for LossyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PortalError> {
        Ok(self
            .inner
            .get(key)
            .await?
            .map(|v| v.chars().take(v.chars().count() / 2).collect()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PortalError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), PortalError> {
        self.inner.remove(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, PortalError> {
        self.inner.keys().await
    }
}

// ── UnavailableStore ─────────────────────────────────────────────────────────

/// Every operation fails, as when the backend is unreachable.
#[derive(Clone)]
pub struct UnavailableStore;

fn unavailable() -> PortalError {
    PortalError::Internal(anyhow::anyhow!("connection refused"))
}

impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, PortalError> {
        Err(unavailable())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), PortalError> {
        Err(unavailable())
    }

    async fn remove(&self, _key: &str) -> Result<(), PortalError> {
        Err(unavailable())
    }

    async fn keys(&self) -> Result<Vec<String>, PortalError> {
        Err(unavailable())
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

/// Store an OTP record directly, as if it had been issued at `issued_at`.
pub async fn seed_otp(store: &MemoryKvStore, email: &str, code: &str, issued_at: DateTime<Utc>) {
    let email = Email::parse(email).unwrap();
    let record = OtpRecord::new(&email, OneTimeCode::from(code), issued_at);
    store
        .set(&otp_key(&email), &serde_json::to_string(&record).unwrap())
        .await
        .unwrap();
}

/// Store a file record directly under `id` with the given upload time.
pub async fn seed_file(store: &MemoryKvStore, id: &str, name: &str, uploaded_at: DateTime<Utc>) {
    let record = StoredFileRecord {
        name: name.to_owned(),
        size: 5,
        content_type: "text/plain".to_owned(),
        url: id.to_owned(),
        uploaded_at: Some(uploaded_at),
        data: DataUri::encode("text/plain", b"hello"),
    };
    store
        .set(id, &serde_json::to_string(&record).unwrap())
        .await
        .unwrap();
}
