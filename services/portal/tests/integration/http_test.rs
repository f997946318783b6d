use axum::http::{StatusCode, header};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use egram_portal::domain::repository::KeyValueStore;
use egram_portal::infra::email::LogEmailSender;
use egram_portal::infra::memory::MemoryKvStore;
use egram_portal::infra::redis::RedisKvStore;
use egram_portal::infra::{EmailBackend, KvBackend};
use egram_portal::router::build_router;
use egram_portal::state::AppState;

use crate::helpers::{TEST_QUOTA_BYTES, memory_store, seed_file, seed_otp};

fn server() -> (TestServer, MemoryKvStore) {
    let store = memory_store();
    let state = AppState {
        store: KvBackend::Memory(store.clone()),
        mailer: EmailBackend::Log(LogEmailSender),
        storage_quota_bytes: TEST_QUOTA_BYTES,
    };
    let server = TestServer::new(build_router(state)).unwrap();
    (server, store)
}

#[tokio::test]
async fn should_answer_health_probes() {
    let (server, _) = server();
    server.get("/healthz").await.assert_status_ok();
    server.get("/readyz").await.assert_status_ok();
}

#[tokio::test]
async fn should_report_not_ready_when_redis_is_unreachable() {
    let pool = deadpool_redis::Config::from_url("redis://127.0.0.1:1")
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .unwrap();
    let state = AppState {
        store: KvBackend::Redis(RedisKvStore::new(pool, "egram:")),
        mailer: EmailBackend::Log(LogEmailSender),
        storage_quota_bytes: TEST_QUOTA_BYTES,
    };
    let server = TestServer::new(build_router(state)).unwrap();

    server.get("/healthz").await.assert_status_ok();
    server
        .get("/readyz")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn should_issue_code_and_report_remaining_time() {
    let (server, _) = server();

    let response = server
        .post("/otp")
        .json(&json!({ "email": "Sarpanch@Village.in", "name": "Ramesh" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["email"], "sarpanch@village.in");
    assert!(body["expires_at"].is_string());

    let response = server
        .get("/otp/remaining")
        .add_query_param("email", "sarpanch@village.in")
        .await;
    response.assert_status_ok();
    let remaining = response.json::<Value>()["remaining_seconds"].as_u64().unwrap();
    assert!((299..=300).contains(&remaining), "remaining = {remaining}");
}

#[tokio::test]
async fn should_reject_issue_without_name() {
    let (server, _) = server();
    let response = server.post("/otp").json(&json!({ "email": "a@b.com" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "MISSING_FIELD");
}

#[tokio::test]
async fn should_refuse_early_resend_with_retry_after() {
    let (server, _) = server();
    server
        .post("/otp")
        .json(&json!({ "email": "a@b.com", "name": "Asha" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/otp/resend")
        .json(&json!({ "email": "a@b.com", "name": "Asha" }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .header(header::RETRY_AFTER)
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 300);
    assert_eq!(response.json::<Value>()["kind"], "RESEND_TOO_SOON");
}

#[tokio::test]
async fn should_verify_code_once_over_http() {
    let (server, store) = server();
    seed_otp(&store, "a@b.com", "482913", Utc::now()).await;

    let wrong = server
        .post("/otp/verify")
        .json(&json!({ "email": "a@b.com", "code": "000000" }))
        .await;
    wrong.assert_status_ok();
    assert_eq!(wrong.json::<Value>(), json!({ "verified": false }));

    let right = server
        .post("/otp/verify")
        .json(&json!({ "email": "a@b.com", "code": "482913" }))
        .await;
    assert_eq!(right.json::<Value>(), json!({ "verified": true }));

    let again = server
        .post("/otp/verify")
        .json(&json!({ "email": "a@b.com", "code": "482913" }))
        .await;
    assert_eq!(again.json::<Value>(), json!({ "verified": false }));
}

#[tokio::test]
async fn should_upload_and_download_file() {
    let (server, _) = server();
    let contents = b"Gram Sabha minutes, 2024".to_vec();

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(contents.clone())
            .file_name("minutes.txt")
            .mime_type("text/plain"),
    );
    let response = server.post("/files").multipart(form).await;
    response.assert_status(StatusCode::CREATED);
    let info: Value = response.json();
    assert_eq!(info["name"], "minutes.txt");
    assert_eq!(info["type"], "text/plain");
    assert_eq!(info["size"], contents.len());
    let id = info["url"].as_str().unwrap().to_owned();

    let response = server.get(&format!("/files/{id}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "found");
    assert!(
        body["file"]["data"]
            .as_str()
            .unwrap()
            .starts_with("data:text/plain;base64,")
    );

    let response = server.get(&format!("/files/{id}/metadata")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["file"], info);

    let response = server.get(&format!("/files/{id}/exists")).await;
    assert_eq!(response.json::<Value>(), json!({ "exists": true }));

    let response = server.get(&format!("/files/{id}/download")).await;
    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "text/plain");
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"minutes.txt\"; filename*=UTF-8''minutes.txt"
    );
    assert_eq!(response.as_bytes().as_ref(), contents.as_slice());
}

#[tokio::test]
async fn should_reject_upload_without_file_field() {
    let (server, store) = server();
    let form = MultipartForm::new().add_text("note", "no file here");
    let response = server.post("/files").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "MISSING_FIELD");
    assert_eq!(store.used_bytes(), 0);
}

#[tokio::test]
async fn should_map_lookup_states_to_statuses() {
    let (server, store) = server();
    store
        .set("file_1700000000000_broken", "not json")
        .await
        .unwrap();

    let response = server.get("/files/undefined").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "status": "invalid_id" }));

    let response = server.get("/files/file_1700000000000_missing").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>(), json!({ "status": "not_found" }));

    let response = server.get("/files/file_1700000000000_broken").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>(), json!({ "status": "corrupted" }));

    let response = server
        .get("/files/file_1700000000000_broken/download")
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["kind"], "FILE_CORRUPTED");

    let response = server.get("/files/file_1700000000000_missing/exists").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "exists": false }));
}

#[tokio::test]
async fn should_clean_up_and_report_usage() {
    let (server, store) = server();
    let now = Utc::now();
    seed_file(&store, "file_1_old", "old.txt", now - Duration::hours(48)).await;
    seed_file(&store, "file_2_new", "new.txt", now).await;

    let response = server
        .post("/files/cleanup")
        .json(&json!({ "max_age_hours": 24 }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "removed": 1 }));

    let response = server.get("/files/usage").await;
    response.assert_status_ok();
    let usage: Value = response.json();
    assert_eq!(usage["files"], 1);
    assert_eq!(usage["limit"], TEST_QUOTA_BYTES);
    assert_eq!(
        usage["used"].as_u64().unwrap() + usage["available"].as_u64().unwrap(),
        TEST_QUOTA_BYTES
    );
}
