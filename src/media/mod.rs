//! Image storage collaborator
//!
//! Images go to an external object store through an unsigned multipart
//! upload (`file` plus `upload_preset`). The store answers with a
//! `secure_url`, which becomes the post's `imageRef`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::types::{BoardError, Result};

/// External blob store for post images
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload an image and return its retrievable URL
    async fn upload(&self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<String>;
}

/// Unsigned-upload HTTP object store
pub struct HttpImageStore {
    client: Client,
    upload_url: String,
    preset: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl HttpImageStore {
    pub fn new(
        upload_url: impl Into<String>,
        preset: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BoardError::Config(format!("Failed to create upload client: {}", e)))?;

        Ok(Self {
            client,
            upload_url: upload_url.into(),
            preset: preset.into(),
        })
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(&self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<String> {
        if bytes.is_empty() {
            return Err(BoardError::BadRequest("Image body is empty".into()));
        }
        if !content_type.starts_with("image/") {
            return Err(BoardError::BadRequest(format!(
                "Unsupported content type: {}",
                content_type
            )));
        }

        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| BoardError::BadRequest(format!("Invalid content type: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.preset.clone());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BoardError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Image upload of {} rejected: HTTP {}", file_name, status);
            return Err(BoardError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| BoardError::Upload(format!("Malformed upload response: {}", e)))?;

        info!("Uploaded image {} ({} bytes)", file_name, size);
        Ok(uploaded.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_image_before_sending() {
        // Unroutable URL: validation must fail before any request is made
        let store = HttpImageStore::new("http://127.0.0.1:9/upload", "blog_preset", Duration::from_secs(1))
            .unwrap();

        let err = store
            .upload("notes.txt", "text/plain", b"hello".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::BadRequest(_)));

        let err = store.upload("a.png", "image/png", Vec::new()).await.unwrap_err();
        assert!(matches!(err, BoardError::BadRequest(_)));
    }
}
