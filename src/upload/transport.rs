//! Wire protocol for the chunk and finalize endpoints.
//!
//! - `POST <base>/chunk-upload/chunk`: multipart, one `file` part named `<name>.part<N>`,
//!   session metadata in the `Upload-Id` and `Chunk-Index` headers
//! - `POST <base>/chunk-upload/complete`: urlencoded `uploadId`, `totalChunks`, `fileName`,
//!   answered with an `AttachmentDto`

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::debug;

use super::types::AttachmentDto;
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};

pub const CHUNK_ENDPOINT: &str = "chunk-upload/chunk";
pub const COMPLETE_ENDPOINT: &str = "chunk-upload/complete";

pub const UPLOAD_ID_HEADER: &str = "Upload-Id";
pub const CHUNK_INDEX_HEADER: &str = "Chunk-Index";

/// Multipart field carrying the chunk bytes
pub const CHUNK_FIELD: &str = "file";

/// One chunk ready to send
#[derive(Debug, Clone)]
pub struct ChunkPart {
    pub upload_id: String,
    pub index: u64,
    pub part_name: String,
    pub data: Vec<u8>,
}

/// Body of the finalize call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub upload_id: String,
    pub total_chunks: u64,
    pub file_name: String,
}

/// Sends chunks and the finalize request for one server
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    async fn send_chunk(&self, chunk: ChunkPart) -> Result<()>;

    async fn complete(&self, request: &CompleteRequest) -> Result<AttachmentDto>;
}

#[derive(Debug, Clone)]
pub struct HttpChunkTransport {
    http: reqwest::Client,
    config: StorefrontConfig,
}

impl HttpChunkTransport {
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        config.base_url()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => request.header("Authorization", format!("Bearer {}", api_key)),
            None => request,
        }
    }
}

/// Turn a non-2xx response into `Transport`, keeping the body text for the message
async fn check_status(endpoint: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(StorefrontError::Transport {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ChunkTransport for HttpChunkTransport {
    async fn send_chunk(&self, chunk: ChunkPart) -> Result<()> {
        let url = self.config.endpoint(CHUNK_ENDPOINT)?;
        let bytes = chunk.data.len();

        let part = Part::bytes(chunk.data)
            .file_name(chunk.part_name)
            .mime_str("application/octet-stream")?;
        let form = Form::new().part(CHUNK_FIELD, part);

        let request = self
            .http
            .post(url)
            .header(UPLOAD_ID_HEADER, chunk.upload_id.as_str())
            .header(CHUNK_INDEX_HEADER, chunk.index.to_string())
            .multipart(form);

        let response = self.authorize(request).send().await?;
        check_status(CHUNK_ENDPOINT, response).await?;

        debug!(
            upload_id = %chunk.upload_id,
            index = chunk.index,
            bytes,
            "Chunk accepted"
        );
        Ok(())
    }

    async fn complete(&self, request: &CompleteRequest) -> Result<AttachmentDto> {
        let url = self.config.endpoint(COMPLETE_ENDPOINT)?;

        let builder = self.http.post(url).form(request);
        let response = self.authorize(builder).send().await?;
        let response = check_status(COMPLETE_ENDPOINT, response).await?;

        let body = response.text().await?;
        serde_json::from_str::<AttachmentDto>(&body).map_err(|e| {
            StorefrontError::ContractViolation(format!(
                "Finalize response for {} is not an attachment: {}",
                request.upload_id, e
            ))
        })
    }
}
