//! Archive upload into the session container.

use async_trait::async_trait;
use reqwest::{Client, Url};
use service_core::error::AppError;

const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";
const BLOCK_BLOB: &str = "BlockBlob";
const STORAGE_VERSION_HEADER: &str = "x-ms-version";
const STORAGE_VERSION: &str = "2021-08-06";

#[async_trait]
pub trait BlobUploader: Send + Sync {
    /// Upload `content` as `file_name` into the container and return its read URL.
    async fn upload(
        &self,
        container_url: &Url,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Url, AppError>;
}

/// Blob URL for `file_name` inside the container, keeping the container SAS query.
pub fn blob_url(container_url: &Url, file_name: &str) -> Result<Url, AppError> {
    let mut url = container_url.clone();
    url.path_segments_mut()
        .map_err(|_| {
            AppError::Upload(anyhow::anyhow!(
                "Container URL {} cannot hold blobs",
                container_url
            ))
        })?
        .pop_if_empty()
        .push(file_name);
    Ok(url)
}

#[derive(Clone)]
pub struct HttpBlobUploader {
    client: Client,
}

impl HttpBlobUploader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobUploader for HttpBlobUploader {
    async fn upload(
        &self,
        container_url: &Url,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Url, AppError> {
        let url = blob_url(container_url, file_name)?;
        let size = content.len();

        let response = self
            .client
            .put(url.clone())
            .header(BLOB_TYPE_HEADER, BLOCK_BLOB)
            .header(STORAGE_VERSION_HEADER, STORAGE_VERSION)
            .body(content)
            .send()
            .await
            .map_err(|e| AppError::Upload(anyhow::anyhow!("Blob upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(file = %file_name, status = %status, "Blob upload rejected");
            return Err(AppError::Upload(anyhow::anyhow!(
                "Blob upload failed: {} - {}",
                status,
                body
            )));
        }

        tracing::info!(file = %file_name, size_bytes = size, "Archive uploaded");
        Ok(url)
    }
}
