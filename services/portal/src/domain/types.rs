use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use egram_core::serde::{to_rfc3339_ms, to_rfc3339_ms_opt};
use egram_domain::email::Email;
use egram_domain::otp::OneTimeCode;

/// One-time code time-to-live in seconds.
pub const OTP_TTL_SECS: i64 = 300;

/// Storage key prefix for one-time code records.
pub const OTP_KEY_PREFIX: &str = "otp_";

/// Largest serialized file record accepted by a single upload (4.5 MiB).
pub const MAX_FILE_RECORD_BYTES: usize = 4_718_592;

/// Assumed capacity of the key-value store when none is configured (5 MiB).
pub const DEFAULT_STORAGE_QUOTA_BYTES: u64 = 5_242_880;

/// MIME type recorded when an upload does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub fn otp_key(email: &Email) -> String {
    format!("{OTP_KEY_PREFIX}{email}")
}

// ── One-time codes ────────────────────────────────────────────────────────────

/// Persisted one-time code, keyed by [`otp_key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRecord {
    pub code: OneTimeCode,
    pub email: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub issued_at: DateTime<Utc>,
    pub ttl_secs: i64,
}

impl OtpRecord {
    pub fn new(email: &Email, code: OneTimeCode, issued_at: DateTime<Utc>) -> Self {
        Self {
            code,
            email: email.to_string(),
            issued_at,
            ttl_secs: OTP_TTL_SECS,
        }
    }

    /// `None` when the stored value is not a well-formed record, including a TTL outside
    /// `1..=OTP_TTL_SECS`.
    pub fn decode(raw: &str) -> Option<Self> {
        let record: Self = serde_json::from_str(raw).ok()?;
        (1..=OTP_TTL_SECS)
            .contains(&record.ttl_secs)
            .then_some(record)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at
            .checked_add_signed(Duration::seconds(self.ttl()))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn ttl(&self) -> i64 {
        self.ttl_secs.clamp(0, OTP_TTL_SECS)
    }

    fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = now
            .signed_duration_since(self.issued_at)
            .num_milliseconds();
        (self.ttl() * 1000).saturating_sub(elapsed)
    }

    /// Expired once the elapsed time reaches the TTL.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_ms(now) <= 0
    }

    /// Whole seconds left, rounded up; never more than the TTL even under clock skew.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        let remaining = self.remaining_ms(now);
        if remaining <= 0 {
            return 0;
        }
        (remaining as u64)
            .div_ceil(1000)
            .min(self.ttl() as u64)
    }

    pub fn matches(&self, email: &Email, submitted_code: &str) -> bool {
        self.email == email.as_str() && self.code.matches(submitted_code)
    }
}

// ── Stored files ──────────────────────────────────────────────────────────────

/// Upload request handed to the file store.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Persisted file record, keyed by its identifier.
///
/// Field names follow the JSON shape the web front-end reads (`type`, `uploadedAt`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub url: String,
    /// Absent on records written without one; only cleanup treats that as damage.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "to_rfc3339_ms_opt"
    )]
    pub uploaded_at: Option<DateTime<Utc>>,
    /// `data:` URI holding the full file contents.
    #[serde(default)]
    pub data: String,
}

impl StoredFileRecord {
    /// `None` when the stored value does not parse or lacks a name or payload.
    pub fn decode(raw: &str) -> Option<Self> {
        let record: Self = serde_json::from_str(raw).ok()?;
        (!record.name.is_empty() && !record.data.is_empty()).then_some(record)
    }

    /// Uploaded strictly before `cutoff`; a record exactly at the cutoff is kept, and so is
    /// one with no upload time.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.uploaded_at.is_some_and(|at| at < cutoff)
    }

    pub fn info(&self) -> StoredFileInfo {
        StoredFileInfo {
            name: self.name.clone(),
            size: self.size,
            content_type: self.content_type.clone(),
            url: self.url.clone(),
            uploaded_at: self.uploaded_at,
        }
    }

    pub fn into_file(self) -> StoredFile {
        StoredFile {
            name: self.name,
            data: self.data,
            content_type: self.content_type,
            size: self.size,
        }
    }
}

/// Everything about a stored file except its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileInfo {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "to_rfc3339_ms_opt"
    )]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Metadata listing is the stored-file info without the payload.
pub type FileMetadata = StoredFileInfo;

/// A retrieved file with its `data:` URI payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub data: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
}

/// Decoded file ready to hand to a client as a download.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Outcome of a read-path lookup. Only `Found` carries data; the other states let callers
/// decide whether a retry makes sense (it can for `NotFound`, it cannot for `Corrupted`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLookup<T> {
    Found(T),
    NotFound,
    InvalidId,
    Corrupted,
}

impl<T> FileLookup<T> {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
            Self::InvalidId => "invalid_id",
            Self::Corrupted => "corrupted",
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FileLookup<U> {
        match self {
            Self::Found(value) => FileLookup::Found(f(value)),
            Self::NotFound => FileLookup::NotFound,
            Self::InvalidId => FileLookup::InvalidId,
            Self::Corrupted => FileLookup::Corrupted,
        }
    }
}

/// Advisory storage usage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageInfo {
    pub used: u64,
    pub available: u64,
    pub files: usize,
    pub limit: u64,
}
