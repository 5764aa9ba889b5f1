//! Media uploads for coupon photos and category icons.
//!
//! [`MediaUploader`] is the seam to whatever stores the files.
//! [`DiskUploader`] writes them into a local directory that the server
//! exposes under `/media`.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use axum::body::Bytes;
use uuid::Uuid;

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::error::HubError;

/// An uploaded file as received from a multipart field.
#[derive(Clone)]
pub struct MediaFile {
    /// Client-side file name, if any.
    pub file_name: Option<String>,
    /// Declared MIME type.
    pub content_type: String,
    /// File contents.
    pub bytes: Bytes,
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl MediaFile {
    /// Checks that the file is a non-empty image.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for empty files and non-image MIME
    /// types.
    pub fn ensure_image(&self) -> Result<(), HubError> {
        if !self.content_type.starts_with("image/") {
            return Err(HubError::Validation(format!(
                "only image uploads are accepted, got '{}'",
                self.content_type
            )));
        }
        if self.bytes.is_empty() {
            return Err(HubError::Validation("uploaded file is empty".to_string()));
        }
        Ok(())
    }

    /// File extension derived from the MIME type, falling back to the
    /// client file name.
    #[must_use]
    pub fn extension(&self) -> String {
        let from_mime = match self.content_type.as_str() {
            "image/png" => Some("png"),
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/gif" => Some("gif"),
            "image/webp" => Some("webp"),
            "image/svg+xml" => Some("svg"),
            _ => None,
        };
        if let Some(ext) = from_mime {
            return ext.to_string();
        }
        self.file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "img".to_string())
    }
}

/// Stores a file and returns its public URL.
#[async_trait]
pub trait MediaUploader: Send + Sync + fmt::Debug {
    /// Uploads `file`.
    ///
    /// # Errors
    ///
    /// [`HubError::Validation`] for non-image files, [`HubError::Dependency`]
    /// if the backing storage fails.
    async fn upload(&self, file: MediaFile) -> Result<String, HubError>;
}

/// Writes uploads to `dir`, served at `{public_base_url}/media/`.
#[derive(Debug, Clone)]
pub struct DiskUploader {
    dir: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl DiskUploader {
    /// Creates an uploader for `dir` with the default 20 MiB file limit.
    #[must_use]
    pub fn new(dir: PathBuf, public_base_url: String) -> Self {
        Self {
            dir,
            public_base_url,
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Sets the largest accepted file size.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl MediaUploader for DiskUploader {
    async fn upload(&self, file: MediaFile) -> Result<String, HubError> {
        file.ensure_image()?;
        if file.bytes.len() > self.max_bytes {
            return Err(HubError::Validation(format!(
                "uploaded file exceeds {} bytes",
                self.max_bytes
            )));
        }
        let name = format!("{}.{}", Uuid::new_v4(), file.extension());

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| HubError::Dependency(format!("media directory unavailable: {e}")))?;
        tokio::fs::write(self.dir.join(&name), &file.bytes)
            .await
            .map_err(|e| HubError::Dependency(format!("failed to store upload: {e}")))?;

        tracing::debug!(file = %name, bytes = file.bytes.len(), "media stored");
        Ok(format!("{}/media/{name}", self.public_base_url))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn file(content_type: &str, name: Option<&str>, bytes: &'static [u8]) -> MediaFile {
        MediaFile {
            file_name: name.map(str::to_string),
            content_type: content_type.to_string(),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn non_images_are_rejected() {
        assert!(matches!(
            file("application/pdf", Some("menu.pdf"), b"%PDF").ensure_image(),
            Err(HubError::Validation(_))
        ));
        assert!(file("image/png", None, b"").ensure_image().is_err());
    }

    #[test]
    fn extension_prefers_mime_type() {
        assert_eq!(file("image/jpeg", Some("a.png"), b"x").extension(), "jpg");
        assert_eq!(file("image/x-icon", Some("fav.ICO"), b"x").extension(), "ico");
        assert_eq!(file("image/x-icon", Some("../../etc"), b"x").extension(), "img");
    }

    #[tokio::test]
    async fn disk_uploader_writes_file() {
        let dir = std::env::temp_dir().join(format!("coupon-hub-media-{}", Uuid::new_v4()));
        let uploader = DiskUploader::new(dir.clone(), "http://localhost:3000".to_string());
        let Ok(url) = uploader.upload(file("image/png", Some("p.png"), b"\x89PNG")).await else {
            panic!("upload should succeed");
        };
        assert!(url.starts_with("http://localhost:3000/media/"));
        let Some(name) = url.rsplit('/').next() else {
            panic!("url has a file name");
        };
        let Ok(stored) = tokio::fs::read(dir.join(name)).await else {
            panic!("file should exist");
        };
        assert_eq!(stored, b"\x89PNG");
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn oversized_files_are_rejected() {
        let dir = std::env::temp_dir().join(format!("coupon-hub-media-{}", Uuid::new_v4()));
        let uploader =
            DiskUploader::new(dir.clone(), "http://localhost:3000".to_string()).with_max_bytes(4);
        let result = uploader.upload(file("image/png", Some("p.png"), b"\x89PNG!")).await;
        assert!(matches!(result, Err(HubError::Validation(_))));
        assert!(!tokio::fs::try_exists(&dir).await.unwrap_or(false));
    }
}
