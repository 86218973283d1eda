use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tokio::fs;
use tracing::{error, info};

use grobro_types::api::UploadResponse;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::Claims;

/// 10 MB upload limit for photos
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Header carrying the client's original file name on raw-body uploads.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Public upload storage on local disk.
///
/// Files live at `{dir}/{username}/{timestamp}-{name}` and are served under
/// `{public_url}/uploads/`.
pub struct Storage {
    dir: PathBuf,
    public_url: String,
}

impl Storage {
    pub async fn new(dir: PathBuf, public_url: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Key for a new upload: `{username}/{timestamp_ms}-{original_name}`.
    ///
    /// Only the final path component of `original_name` is kept and anything
    /// outside `[A-Za-z0-9._-]` becomes `_`.
    pub fn upload_key(username: &str, original_name: &str, timestamp_ms: i64) -> Result<String> {
        let base = Path::new(original_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let clean: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if clean.is_empty() || clean.chars().all(|c| c == '.') {
            bail!("Invalid file name '{}'", original_name);
        }
        if username.is_empty() || username.contains(&['/', '\\', '.'][..]) {
            bail!("Invalid upload owner '{}'", username);
        }

        Ok(format!("{}/{}-{}", username, timestamp_ms, clean))
    }

    /// Write `bytes` under `key` and return the public link.
    pub async fn save(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let path = self.dir.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;

        info!("Stored upload {} ({} bytes)", key, bytes.len());
        Ok(self.link_for(key))
    }

    pub fn link_for(&self, key: &str) -> String {
        format!("{}/uploads/{}", self.public_url, key)
    }
}

/// Validate a raw-body upload and store it for `claims.username`.
pub(crate) async fn store_upload(
    state: &AppState,
    claims: &Claims,
    headers: &HeaderMap,
    bytes: &Bytes,
) -> ApiResult<String> {
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("No file uploaded.".into()));
    }
    if bytes.len() > MAX_UPLOAD_SIZE {
        return Err(ApiError::PayloadTooLarge(MAX_UPLOAD_SIZE));
    }

    let original_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {} header.", FILE_NAME_HEADER)))?;

    let key = Storage::upload_key(
        &claims.username,
        original_name,
        chrono::Utc::now().timestamp_millis(),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.storage.save(&key, bytes).await.map_err(|e| {
        error!("Failed to store upload {}: {}", key, e);
        ApiError::Internal(e)
    })
}

/// POST /users/avatar: raw image body, `x-file-name` header. Returns the
/// public link, which the settings form then submits as `avatar_link`.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    bytes: Bytes,
) -> ApiResult<impl IntoResponse> {
    let link = store_upload(&state, &claims, &headers, &bytes).await?;

    Ok((StatusCode::CREATED, Json(UploadResponse { link })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_keeps_owner_and_timestamp() {
        let key = Storage::upload_key("mia", "my photo.png", 1536423725000).unwrap();
        assert_eq!(key, "mia/1536423725000-my_photo.png");
    }

    #[test]
    fn key_strips_directories() {
        let key = Storage::upload_key("mia", "../../etc/passwd", 1).unwrap();
        assert_eq!(key, "mia/1-passwd");
    }

    #[test]
    fn key_rejects_empty_names() {
        assert!(Storage::upload_key("mia", "", 1).is_err());
        assert!(Storage::upload_key("mia", "..", 1).is_err());
        assert!(Storage::upload_key("../mia", "a.png", 1).is_err());
    }

    #[tokio::test]
    async fn save_writes_file_and_links_it() {
        let dir = std::env::temp_dir().join(format!("grobro-storage-{}", uuid::Uuid::new_v4()));
        let storage = Storage::new(dir.clone(), "http://localhost:3000/").await.unwrap();

        let link = storage.save("mia/1-a.png", b"png-bytes").await.unwrap();
        assert_eq!(link, "http://localhost:3000/uploads/mia/1-a.png");
        assert_eq!(std::fs::read(dir.join("mia/1-a.png")).unwrap(), b"png-bytes");

        std::fs::remove_dir_all(dir).ok();
    }
}
