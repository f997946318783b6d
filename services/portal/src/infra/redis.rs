use anyhow::Context as _;
use deadpool_redis::Pool;
use deadpool_redis::redis::{AsyncCommands, RedisError, cmd};

use crate::domain::repository::KeyValueStore;
use crate::error::PortalError;

/// Redis-backed store. Every key is prefixed with `namespace` so several deployments can
/// share one Redis; `keys()` only reports keys inside the namespace, with the prefix removed.
#[derive(Clone)]
pub struct RedisKvStore {
    pub pool: Pool,
    pub namespace: String,
}

impl RedisKvStore {
    pub fn new(pool: Pool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Round trip to Redis, used by readiness checks.
    pub async fn ping(&self) -> Result<(), PortalError> {
        let mut conn = self.conn().await?;
        let _: String = cmd("PING")
            .query_async(&mut conn)
            .await
            .context("redis PING")?;
        Ok(())
    }

    fn strip_namespace<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.namespace.as_str())
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, PortalError> {
        self.pool
            .get()
            .await
            .map_err(|e| PortalError::Internal(e.into()))
    }
}

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// Redis answers `OOM` when `maxmemory` is reached and eviction cannot free space.
fn is_out_of_memory(e: &RedisError) -> bool {
    e.code() == Some("OOM")
}

/// Escape glob metacharacters so the namespace is matched literally by `KEYS`.
fn glob_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl KeyValueStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PortalError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(self.key(key))
            .await
            .context("redis GET")?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PortalError> {
        let mut conn = self.conn().await?;
        let result: Result<(), RedisError> = conn.set(self.key(key), value).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_out_of_memory(&e) => Err(PortalError::QuotaExceeded),
            Err(e) => Err(PortalError::Internal(
                anyhow::Error::from(e).context("redis SET"),
            )),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), PortalError> {
        let mut conn = self.conn().await?;
        let (): () = conn.del(self.key(key)).await.context("redis DEL")?;
        Ok(())
    }

    /// Walks the namespace with `SCAN` so a large keyspace never blocks the server.
    async fn keys(&self) -> Result<Vec<String>, PortalError> {
        let mut conn = self.conn().await?;
        let pattern = format!("{}*", glob_escape(&self.namespace));
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .context("redis SCAN")?;
            keys.extend(
                batch
                    .iter()
                    .filter_map(|k| self.strip_namespace(k))
                    .map(str::to_owned),
            );
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may report a key more than once.
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}
