#![allow(async_fn_in_trait)]

use egram_domain::email::Email;
use egram_domain::otp::OneTimeCode;

use crate::error::PortalError;

/// String key-value storage shared by the OTP and file mechanisms.
///
/// Implementations must make a successful `set` visible to the next `get` of the same key.
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PortalError>;

    /// Insert or overwrite. Fails with [`PortalError::QuotaExceeded`] when the backend is
    /// out of space; in that case nothing is written.
    async fn set(&self, key: &str, value: &str) -> Result<(), PortalError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), PortalError>;

    async fn keys(&self) -> Result<Vec<String>, PortalError>;
}

/// Delivers one-time codes to their recipients.
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        to: &Email,
        recipient_name: &str,
        code: &OneTimeCode,
    ) -> Result<(), PortalError>;
}
