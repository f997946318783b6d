pub mod email;
pub mod memory;
pub mod redis;

use egram_domain::email::Email;
use egram_domain::otp::OneTimeCode;

use crate::domain::repository::{EmailSender, KeyValueStore};
use crate::error::PortalError;

use self::email::{EmailJsSender, LogEmailSender};
use self::memory::MemoryKvStore;
use self::redis::RedisKvStore;

/// Storage backend selected at startup.
#[derive(Clone)]
pub enum KvBackend {
    Memory(MemoryKvStore),
    Redis(RedisKvStore),
}

impl KvBackend {
    /// Cheap liveness round trip to the backend; the in-memory store is always reachable.
    pub async fn ping(&self) -> Result<(), PortalError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Redis(store) => store.ping().await,
        }
    }
}

impl KeyValueStore for KvBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, PortalError> {
        match self {
            Self::Memory(store) => store.get(key).await,
            Self::Redis(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PortalError> {
        match self {
            Self::Memory(store) => store.set(key, value).await,
            Self::Redis(store) => store.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), PortalError> {
        match self {
            Self::Memory(store) => store.remove(key).await,
            Self::Redis(store) => store.remove(key).await,
        }
    }

    async fn keys(&self) -> Result<Vec<String>, PortalError> {
        match self {
            Self::Memory(store) => store.keys().await,
            Self::Redis(store) => store.keys().await,
        }
    }
}

/// Email delivery backend selected at startup.
#[derive(Clone)]
pub enum EmailBackend {
    EmailJs(EmailJsSender),
    Log(LogEmailSender),
}

impl EmailSender for EmailBackend {
    async fn send(
        &self,
        to: &Email,
        recipient_name: &str,
        code: &OneTimeCode,
    ) -> Result<(), PortalError> {
        match self {
            Self::EmailJs(sender) => sender.send(to, recipient_name, code).await,
            Self::Log(sender) => sender.send(to, recipient_name, code).await,
        }
    }
}
