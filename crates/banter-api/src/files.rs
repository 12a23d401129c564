use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use banter_types::api::{FileUrlResponse, UploadResponse, UploadUrlResponse};

use crate::auth::{AppState, CurrentIdentity};
use crate::error::ApiError;

/// 50 MB upload limit for files
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// How long a minted upload URL stays valid.
const UPLOAD_TOKEN_TTL_MINUTES: i64 = 10;

/// Claims for an upload grant, scoped to a single fresh file id.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadClaims {
    /// The file id this grant is for
    pub sub: String,
    pub uploader: Option<String>,
    pub exp: usize,
}

/// POST /files/upload-url — mint a short-lived upload target.
pub async fn generate_upload_url(
    State(state): State<AppState>,
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let Some(identity) = identity else {
        return Err(ApiError::Auth(
            "Must be authenticated to upload files".into(),
        ));
    };

    let file_id = Uuid::new_v4();
    let expires_at = Utc::now() + chrono::Duration::minutes(UPLOAD_TOKEN_TTL_MINUTES);

    let claims = UploadClaims {
        sub: file_id.to_string(),
        uploader: Some(identity.subject),
        exp: expires_at.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(Json(UploadUrlResponse {
        file_id,
        upload_url: format!("{}/files/{}?token={}", state.public_base_url, file_id, token),
        expires_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UploadTokenQuery {
    pub token: String,
}

/// PUT /files/{file_id}?token= — accepts raw bytes under a valid grant,
/// saves to disk, records metadata.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<UploadTokenQuery>,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let claims = decode::<UploadClaims>(
        &query.token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Auth("Invalid or expired upload token".into()))?
    .claims;

    if claims.sub != file_id.to_string() {
        return Err(ApiError::Auth("Upload token is for a different file".into()));
    }
    if body.is_empty() {
        return Err(ApiError::Validation("Empty upload".into()));
    }
    if body.len() > MAX_FILE_SIZE {
        return Err(ApiError::Validation(
            "File too large. Maximum 50 MB.".into(),
        ));
    }

    let id = file_id.to_string();
    if state.db.get_file(&id)?.is_some() {
        return Err(ApiError::Conflict("File already uploaded".into()));
    }

    state.files.save(&id, &body).await?;
    state
        .db
        .insert_file(&id, claims.uploader.as_deref(), body.len() as i64, crate::now_ms())?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file_id,
            size: body.len() as u64,
        }),
    ))
}

/// GET /files/{file_id}/url — resolve a storage id to its durable URL.
/// Anyone holding an id may resolve it; ids are unguessable UUIDs.
pub async fn get_file_url(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<FileUrlResponse>, ApiError> {
    let url = state.db.get_file(&file_id)?.map(|f| file_url(&state, &f.id));
    Ok(Json(FileUrlResponse { url }))
}

/// GET /files/{file_id} — stream the stored bytes back.
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // The Uuid path type also keeps ids from traversing the store directory
    let id = file_id.to_string();

    if state.db.get_file(&id)?.is_none() {
        return Err(ApiError::NotFound("File not found".into()));
    }

    let file = state
        .files
        .open(&id)
        .await
        .map_err(|_| ApiError::NotFound("File not found".into()))?;
    let stream = ReaderStream::new(file);

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        axum::body::Body::from_stream(stream),
    ))
}

pub(crate) fn file_url(state: &AppState, file_id: &str) -> String {
    format!("{}/files/{}", state.public_base_url, file_id)
}
