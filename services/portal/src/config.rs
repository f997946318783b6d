use serde::Deserialize;

use egram_core::config::Config;

use crate::domain::types::DEFAULT_STORAGE_QUOTA_BYTES;
use crate::infra::email::EMAILJS_SEND_URL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailBackendKind {
    EmailJs,
    Log,
}

/// Portal service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct PortalConfig {
    /// TCP port to listen on (default 3120). Env var: `PORTAL_PORT`.
    #[serde(default = "default_port")]
    pub portal_port: u16,
    /// `memory` (default) or `redis`. Env var: `STORAGE_BACKEND`.
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackendKind,
    /// Redis connection URL, required for the redis backend. Env var: `REDIS_URL`.
    pub redis_url: Option<String>,
    /// Prefix applied to every Redis key. Env var: `REDIS_NAMESPACE`.
    #[serde(default = "default_redis_namespace")]
    pub redis_namespace: String,
    /// Assumed storage capacity in bytes. Env var: `STORAGE_QUOTA_BYTES` or `storageQuotaBytes`.
    #[serde(default = "default_quota", alias = "storagequotabytes")]
    pub storage_quota_bytes: u64,
    /// `log` (default) or `emailjs`. Env var: `EMAIL_BACKEND`.
    #[serde(default = "default_email_backend")]
    pub email_backend: EmailBackendKind,
    #[serde(default = "default_emailjs_api_url")]
    pub emailjs_api_url: String,
    pub emailjs_service_id: Option<String>,
    pub emailjs_template_id: Option<String>,
    pub emailjs_public_key: Option<String>,
    /// When set, files older than this are removed periodically. Env var: `FILE_MAX_AGE_HOURS`.
    pub file_max_age_hours: Option<u64>,
    /// Period of the scheduled cleanup (default 3600). Env var: `CLEANUP_INTERVAL_SECS`.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Config for PortalConfig {}

fn default_port() -> u16 {
    3120
}

fn default_storage_backend() -> StorageBackendKind {
    StorageBackendKind::Memory
}

fn default_redis_namespace() -> String {
    "egram:".to_owned()
}

fn default_quota() -> u64 {
    DEFAULT_STORAGE_QUOTA_BYTES
}

fn default_email_backend() -> EmailBackendKind {
    EmailBackendKind::Log
}

fn default_emailjs_api_url() -> String {
    EMAILJS_SEND_URL.to_owned()
}

fn default_cleanup_interval() -> u64 {
    3600
}
