use std::time::Duration;

use tracing::{info, warn};

use egram_core::config::Config;
use egram_core::tracing::init_tracing;

use egram_portal::config::{EmailBackendKind, PortalConfig, StorageBackendKind};
use egram_portal::infra::email::{EmailJsSender, LogEmailSender};
use egram_portal::infra::memory::MemoryKvStore;
use egram_portal::infra::redis::RedisKvStore;
use egram_portal::infra::{EmailBackend, KvBackend};
use egram_portal::router::build_router;
use egram_portal::state::AppState;
use egram_portal::usecase::file_store::CleanupFilesUseCase;

fn build_store(config: &PortalConfig) -> KvBackend {
    match config.storage_backend {
        StorageBackendKind::Memory => {
            KvBackend::Memory(MemoryKvStore::new(config.storage_quota_bytes))
        }
        StorageBackendKind::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .expect("REDIS_URL is required when STORAGE_BACKEND=redis");
            let pool = deadpool_redis::Config::from_url(url)
                .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                .expect("failed to create Redis pool");
            KvBackend::Redis(RedisKvStore::new(pool, config.redis_namespace.clone()))
        }
    }
}

fn build_mailer(config: &PortalConfig) -> EmailBackend {
    match config.email_backend {
        EmailBackendKind::Log => {
            warn!("EMAIL_BACKEND=log: one-time codes are written to the log, not emailed");
            EmailBackend::Log(LogEmailSender)
        }
        EmailBackendKind::EmailJs => {
            let required = |value: &Option<String>, name: &str| {
                value
                    .clone()
                    .unwrap_or_else(|| panic!("{name} is required when EMAIL_BACKEND=emailjs"))
            };
            EmailBackend::EmailJs(EmailJsSender {
                client: reqwest::Client::new(),
                api_url: config.emailjs_api_url.clone(),
                service_id: required(&config.emailjs_service_id, "EMAILJS_SERVICE_ID"),
                template_id: required(&config.emailjs_template_id, "EMAILJS_TEMPLATE_ID"),
                public_key: required(&config.emailjs_public_key, "EMAILJS_PUBLIC_KEY"),
            })
        }
    }
}

fn spawn_scheduled_cleanup(store: KvBackend, max_age_hours: u64, every: Duration) {
    tokio::spawn(async move {
        let usecase = CleanupFilesUseCase { store };
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = usecase.execute(max_age_hours).await {
                warn!(error = %e, "scheduled file cleanup failed");
            }
        }
    });
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = PortalConfig::from_env();

    let state = AppState {
        store: build_store(&config),
        mailer: build_mailer(&config),
        storage_quota_bytes: config.storage_quota_bytes,
    };

    if let Some(max_age_hours) = config.file_max_age_hours {
        let every = Duration::from_secs(config.cleanup_interval_secs.max(1));
        info!(max_age_hours, interval_secs = every.as_secs(), "scheduled file cleanup enabled");
        spawn_scheduled_cleanup(state.kv_store(), max_age_hours, every);
    }

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.portal_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("portal service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
