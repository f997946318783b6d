use anyhow::Context as _;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::{info, warn};

use egram_domain::data_uri::DataUri;
use egram_domain::id::FileId;

use crate::domain::repository::KeyValueStore;
use crate::domain::types::{
    DEFAULT_CONTENT_TYPE, DownloadedFile, FileLookup, FileMetadata, MAX_FILE_RECORD_BYTES,
    NewFile, StoredFile, StoredFileInfo, StoredFileRecord, UsageInfo,
};
use crate::error::PortalError;

/// Shared read path. Never fails: backend errors are logged and reported as `NotFound`.
async fn lookup<K: KeyValueStore>(store: &K, raw_id: &str) -> FileLookup<StoredFileRecord> {
    let Ok(id) = FileId::parse(raw_id) else {
        return FileLookup::InvalidId;
    };
    let raw = match store.get(id.as_str()).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return FileLookup::NotFound,
        Err(e) => {
            warn!(file_id = %id, error = %e, "file lookup failed; reporting not found");
            return FileLookup::NotFound;
        }
    };
    match StoredFileRecord::decode(&raw) {
        Some(record) => FileLookup::Found(record),
        None => {
            warn!(file_id = %id, "stored file record is corrupted");
            FileLookup::Corrupted
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

pub struct StoreFileUseCase<K: KeyValueStore> {
    pub store: K,
}

impl<K: KeyValueStore> StoreFileUseCase<K> {
    pub async fn execute(&self, file: NewFile) -> Result<StoredFileInfo, PortalError> {
        let name = file.name.trim();
        if name.is_empty() {
            return Err(PortalError::MissingField("name"));
        }
        let content_type = match file.content_type.trim() {
            "" => DEFAULT_CONTENT_TYPE,
            declared => declared,
        };

        // Millisecond precision, matching both the id and the stored timestamp.
        let uploaded_at = Utc::now().trunc_subsecs(3);
        let id = FileId::generate(uploaded_at);
        let record = StoredFileRecord {
            name: name.to_owned(),
            size: file.bytes.len() as u64,
            content_type: content_type.to_owned(),
            url: id.to_string(),
            uploaded_at: Some(uploaded_at),
            data: DataUri::encode(content_type, &file.bytes),
        };
        let serialized = serde_json::to_string(&record).context("serialize file record")?;
        if serialized.len() > MAX_FILE_RECORD_BYTES {
            return Err(PortalError::FileTooLarge {
                size: serialized.len(),
                limit: MAX_FILE_RECORD_BYTES,
            });
        }

        self.store.set(id.as_str(), &serialized).await?;

        let read_back = self.store.get(id.as_str()).await;
        if !matches!(&read_back, Ok(Some(value)) if *value == serialized) {
            if let Err(e) = &read_back {
                warn!(file_id = %id, error = %e, "read-back after store failed");
            }
            if let Err(e) = self.store.remove(id.as_str()).await {
                warn!(file_id = %id, error = %e, "failed to remove unverified file record");
            }
            return Err(PortalError::StoreVerificationFailed);
        }

        info!(
            file_id = %id,
            size = record.size,
            content_type = %record.content_type,
            "file stored"
        );
        Ok(record.info())
    }
}

// ── Retrieve ──────────────────────────────────────────────────────────────────

pub struct RetrieveFileUseCase<K: KeyValueStore> {
    pub store: K,
}

impl<K: KeyValueStore> RetrieveFileUseCase<K> {
    pub async fn execute(&self, id: &str) -> FileLookup<StoredFile> {
        lookup(&self.store, id)
            .await
            .map(StoredFileRecord::into_file)
    }
}

// ── Exists ────────────────────────────────────────────────────────────────────

pub struct FileExistsUseCase<K: KeyValueStore> {
    pub store: K,
}

impl<K: KeyValueStore> FileExistsUseCase<K> {
    /// `true` only for a record that decodes with both a name and a payload.
    pub async fn execute(&self, id: &str) -> bool {
        lookup(&self.store, id).await.is_found()
    }
}

// ── Metadata ──────────────────────────────────────────────────────────────────

pub struct FileMetadataUseCase<K: KeyValueStore> {
    pub store: K,
}

impl<K: KeyValueStore> FileMetadataUseCase<K> {
    pub async fn execute(&self, id: &str) -> FileLookup<FileMetadata> {
        lookup(&self.store, id).await.map(|record| record.info())
    }
}

// ── Download ──────────────────────────────────────────────────────────────────

pub struct DownloadFileUseCase<K: KeyValueStore> {
    pub store: K,
}

impl<K: KeyValueStore> DownloadFileUseCase<K> {
    pub async fn execute(&self, id: &str) -> Result<DownloadedFile, PortalError> {
        let record = match lookup(&self.store, id).await {
            FileLookup::Found(record) => record,
            FileLookup::NotFound => return Err(PortalError::FileNotFound),
            FileLookup::InvalidId => return Err(PortalError::InvalidFileId),
            FileLookup::Corrupted => return Err(PortalError::FileCorrupted),
        };
        let decoded = DataUri::decode(&record.data).map_err(|e| {
            warn!(file_id = %id, error = %e, "stored payload is not a valid data URI");
            PortalError::FileCorrupted
        })?;
        let content_type = if record.content_type.is_empty() {
            decoded.mime_type
        } else {
            record.content_type
        };
        Ok(DownloadedFile {
            name: record.name,
            content_type,
            bytes: decoded.bytes,
        })
    }
}

// ── Cleanup ───────────────────────────────────────────────────────────────────

pub struct CleanupFilesUseCase<K: KeyValueStore> {
    pub store: K,
}

impl<K: KeyValueStore> CleanupFilesUseCase<K> {
    /// Removes file records uploaded more than `max_age_hours` ago, plus any file record
    /// that no longer decodes. Returns how many records were removed.
    ///
    /// A failure on one record is logged and the scan moves on to the next.
    pub async fn execute(&self, max_age_hours: u64) -> Result<usize, PortalError> {
        let max_age = i64::try_from(max_age_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = self.remove_older_than(cutoff).await?;
        info!(removed, max_age_hours, "file cleanup finished");
        Ok(removed)
    }

    /// Removes file records uploaded strictly before `cutoff`, plus file records that no
    /// longer decode or carry no upload time. Keys that are not file identifiers are never
    /// touched.
    pub async fn remove_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, PortalError> {
        let keys = self.store.keys().await?;
        let mut removed = 0;
        for key in keys.iter().filter(|k| FileId::is_valid(k)) {
            let raw = match self.store.get(key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unreadable file record");
                    continue;
                }
            };
            let remove = match StoredFileRecord::decode(&raw) {
                Some(record) if record.uploaded_at.is_some() => record.is_stale(cutoff),
                Some(_) => {
                    warn!(key = %key, "removing file record without an upload time");
                    true
                }
                None => {
                    warn!(key = %key, "removing corrupted file record");
                    true
                }
            };
            if !remove {
                continue;
            }
            match self.store.remove(key).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(key = %key, error = %e, "failed to remove file record"),
            }
        }
        Ok(removed)
    }
}

// ── Usage ─────────────────────────────────────────────────────────────────────

pub struct FileUsageUseCase<K: KeyValueStore> {
    pub store: K,
    pub quota_bytes: u64,
}

impl<K: KeyValueStore> FileUsageUseCase<K> {
    /// Bytes are counted as key plus value length over every key in the store, the same
    /// accounting the in-memory backend enforces its quota with. Only file records count
    /// towards `files`.
    pub async fn execute(&self) -> Result<UsageInfo, PortalError> {
        let keys = self.store.keys().await?;
        let mut used = 0u64;
        let mut files = 0usize;
        for key in &keys {
            let Some(raw) = self.store.get(key).await? else {
                continue;
            };
            used += (key.len() + raw.len()) as u64;
            if FileId::is_valid(key) {
                files += 1;
            }
        }
        Ok(UsageInfo {
            used,
            available: self.quota_bytes.saturating_sub(used),
            files,
            limit: self.quota_bytes,
        })
    }
}
