use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::domain::types::{FileLookup, NewFile, StoredFileInfo, UsageInfo};
use crate::error::PortalError;
use crate::state::AppState;
use crate::usecase::file_store::{
    CleanupFilesUseCase, DownloadFileUseCase, FileExistsUseCase, FileMetadataUseCase,
    FileUsageUseCase, RetrieveFileUseCase, StoreFileUseCase,
};

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

#[derive(Serialize)]
pub struct LookupResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<T>,
}

fn lookup_response<T: Serialize>(lookup: FileLookup<T>) -> (StatusCode, Json<LookupResponse<T>>) {
    let status = match &lookup {
        FileLookup::Found(_) => StatusCode::OK,
        FileLookup::NotFound => StatusCode::NOT_FOUND,
        FileLookup::InvalidId => StatusCode::BAD_REQUEST,
        FileLookup::Corrupted => StatusCode::UNPROCESSABLE_ENTITY,
    };
    let body = LookupResponse {
        status: lookup.status(),
        file: lookup.found(),
    };
    (status, Json(body))
}

// ── POST /files ───────────────────────────────────────────────────────────────

pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredFileInfo>), PortalError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PortalError::InvalidUpload(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| PortalError::InvalidUpload(e.body_text()))?;
        upload = Some(NewFile {
            name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }
    let file = upload.ok_or(PortalError::MissingField(FILE_FIELD))?;

    let usecase = StoreFileUseCase {
        store: state.kv_store(),
    };
    let info = usecase.execute(file).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

// ── GET /files/{id} ───────────────────────────────────────────────────────────

pub async fn get_file(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let usecase = RetrieveFileUseCase {
        store: state.kv_store(),
    };
    lookup_response(usecase.execute(&id).await).into_response()
}

// ── GET /files/{id}/metadata ──────────────────────────────────────────────────

pub async fn get_file_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let usecase = FileMetadataUseCase {
        store: state.kv_store(),
    };
    lookup_response(usecase.execute(&id).await).into_response()
}

// ── GET /files/{id}/exists ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

pub async fn file_exists(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ExistsResponse> {
    let usecase = FileExistsUseCase {
        store: state.kv_store(),
    };
    Json(ExistsResponse {
        exists: usecase.execute(&id).await,
    })
}

// ── GET /files/{id}/download ──────────────────────────────────────────────────

pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, PortalError> {
    let usecase = DownloadFileUseCase {
        store: state.kv_store(),
    };
    let file = usecase.execute(&id).await?;

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&file.name))
        .map_err(|e| PortalError::Internal(e.into()))?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987 UTF-8 name.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut encoded = String::with_capacity(name.len());
    for b in name.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{b:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

// ── GET /files/usage ──────────────────────────────────────────────────────────

pub async fn storage_usage(State(state): State<AppState>) -> Result<Json<UsageInfo>, PortalError> {
    let usecase = FileUsageUseCase {
        store: state.kv_store(),
        quota_bytes: state.storage_quota_bytes,
    };
    Ok(Json(usecase.execute().await?))
}

// ── POST /files/cleanup ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CleanupRequest {
    pub max_age_hours: u64,
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

pub async fn cleanup_files(
    State(state): State<AppState>,
    Json(body): Json<CleanupRequest>,
) -> Result<Json<CleanupResponse>, PortalError> {
    let usecase = CleanupFilesUseCase {
        store: state.kv_store(),
    };
    let removed = usecase.execute(body.max_age_hours).await?;
    Ok(Json(CleanupResponse { removed }))
}
