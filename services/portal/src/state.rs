use crate::infra::{EmailBackend, KvBackend};

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: KvBackend,
    pub mailer: EmailBackend,
    /// Capacity reported by the usage endpoint.
    pub storage_quota_bytes: u64,
}

impl AppState {
    pub fn kv_store(&self) -> KvBackend {
        self.store.clone()
    }

    pub fn mailer(&self) -> EmailBackend {
        self.mailer.clone()
    }
}
