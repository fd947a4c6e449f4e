use std::path::Path;

use reqwest::multipart::{Form, Part};
use tracing::info;

use nexcord_types::api::UploadResponse;

use crate::{ApiClient, ApiError, decode};

/// 50 MB upload limit, enforced by the server as well.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Content type the server accepts for a file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

impl ApiClient {
    /// POST /api/v1/files/upload, multipart field `file`.
    pub async fn upload(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        let io_err = |source| ApiError::Io {
            path: path.display().to_string(),
            source,
        };

        let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
        if size > MAX_FILE_SIZE {
            return Err(ApiError::FileTooLarge {
                size,
                max: MAX_FILE_SIZE,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".into());

        let part = Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(content_type_for(path))?;

        let resp = self
            .http
            .post(self.url("/api/v1/files/upload"))
            .bearer_auth(self.session.token())
            .multipart(Form::new().part("file", part))
            .send()
            .await?;
        let uploaded: UploadResponse = decode(resp).await?;

        info!("Uploaded {} ({} bytes)", filename, size);
        Ok(uploaded)
    }
}
