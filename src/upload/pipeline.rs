//! Sequential chunked upload of a single source.
//!
//! Chunks go out strictly in index order, one request at a time. Any failed request aborts
//! the upload with that request's error and no finalize call is made. There is no resume:
//! a retry is a fresh upload under a new upload id.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::hashing::{checksums_match, source_sha256};
use super::plan::{part_file_name, progress_percent, ChunkPlan};
use super::source::ChunkSource;
use super::transport::{ChunkPart, ChunkTransport, CompleteRequest, HttpChunkTransport};
use super::types::AttachmentDto;
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};

/// Progress value reported once the server confirms reassembly
pub const COMPLETE_PROGRESS: u8 = 100;

#[derive(Debug)]
pub struct ChunkedUploader<T: ChunkTransport> {
    transport: T,
    chunk_size: u64,
    verify_checksum: bool,
}

impl<T: ChunkTransport> ChunkedUploader<T> {
    pub fn new(transport: T, chunk_size: u64) -> Self {
        Self {
            transport,
            chunk_size,
            verify_checksum: false,
        }
    }

    /// Compare the server's `checksum` (when it sends one) to a local SHA256
    pub fn with_checksum_verification(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Upload `source` under `upload_id`, calling `on_progress` after each chunk and once
    /// with 100 after finalize succeeds
    pub async fn upload<F>(
        &self,
        source: &dyn ChunkSource,
        upload_id: &str,
        on_progress: F,
    ) -> Result<AttachmentDto>
    where
        F: FnMut(u8) + Send,
    {
        self.upload_with_cancel(source, upload_id, on_progress, &CancellationToken::new())
            .await
    }

    /// Same as [`upload`](Self::upload), stopping with `Cancelled` once `cancel` fires.
    /// A cancelled upload never reaches finalize unless cancellation lands mid-finalize.
    pub async fn upload_with_cancel<F>(
        &self,
        source: &dyn ChunkSource,
        upload_id: &str,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<AttachmentDto>
    where
        F: FnMut(u8) + Send,
    {
        let plan = ChunkPlan::new(source.size(), self.chunk_size)?;
        let file_name = source.file_name().to_string();

        info!(
            upload_id,
            file_name = %file_name,
            size = plan.size,
            total_chunks = plan.total_chunks,
            "Starting chunked upload"
        );

        let cancelled = |chunks_sent: u64| StorefrontError::Cancelled {
            upload_id: upload_id.to_string(),
            chunks_sent,
        };

        let mut uploaded: u64 = 0;

        for chunk in plan.chunks() {
            if cancel.is_cancelled() {
                return Err(cancelled(chunk.index));
            }

            let data = source.read_range(chunk.start, chunk.end).await?;
            let part = ChunkPart {
                upload_id: upload_id.to_string(),
                index: chunk.index,
                part_name: part_file_name(&file_name, chunk.index),
                data,
            };

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(chunk.index)),
                result = self.transport.send_chunk(part) => result,
            };

            if let Err(e) = sent {
                warn!(upload_id, index = chunk.index, error = %e, "Chunk upload failed");
                return Err(e);
            }

            uploaded += chunk.len();
            let percent = progress_percent(uploaded, plan.size);
            debug!(upload_id, index = chunk.index, percent, "Chunk uploaded");
            on_progress(percent);
        }

        if cancel.is_cancelled() {
            return Err(cancelled(plan.total_chunks));
        }

        let request = CompleteRequest {
            upload_id: upload_id.to_string(),
            total_chunks: plan.total_chunks,
            file_name: file_name.clone(),
        };

        let attachment = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(plan.total_chunks)),
            result = self.transport.complete(&request) => result,
        };

        let attachment = match attachment {
            Ok(attachment) => attachment,
            Err(e) => {
                warn!(upload_id, error = %e, "Finalize failed");
                return Err(e);
            }
        };

        if attachment.url.trim().is_empty() {
            return Err(StorefrontError::ContractViolation(format!(
                "Finalize for upload {} returned no url",
                upload_id
            )));
        }

        if self.verify_checksum {
            self.verify(source, upload_id, &attachment).await?;
        }

        on_progress(COMPLETE_PROGRESS);
        info!(upload_id, url = %attachment.url, "Upload complete");

        Ok(attachment)
    }

    async fn verify(
        &self,
        source: &dyn ChunkSource,
        upload_id: &str,
        attachment: &AttachmentDto,
    ) -> Result<()> {
        let Some(ref remote) = attachment.checksum else {
            debug!(upload_id, "Server sent no checksum, skipping verification");
            return Ok(());
        };

        let local = source_sha256(source, self.chunk_size).await?;
        if !checksums_match(&local, remote) {
            return Err(StorefrontError::ContractViolation(format!(
                "Checksum mismatch for upload {}: local {} remote {}",
                upload_id, local, remote
            )));
        }
        Ok(())
    }
}

impl ChunkedUploader<HttpChunkTransport> {
    /// Uploader for multi-image gallery batches (`galleryChunkSize`)
    pub fn for_gallery(config: &StorefrontConfig) -> Result<Self> {
        Self::from_config(config, config.gallery_chunk_size)
    }

    /// Uploader for single images and product variants (`imageChunkSize`)
    pub fn for_images(config: &StorefrontConfig) -> Result<Self> {
        Self::from_config(config, config.image_chunk_size)
    }

    fn from_config(config: &StorefrontConfig, chunk_size: u64) -> Result<Self> {
        let transport = HttpChunkTransport::new(config.clone())?;
        Ok(Self::new(transport, chunk_size).with_checksum_verification(config.verify_checksum))
    }
}
