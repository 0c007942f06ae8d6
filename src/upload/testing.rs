//! In-memory transport for pipeline and queue tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::transport::{ChunkPart, ChunkTransport, CompleteRequest};
use super::types::AttachmentDto;
use crate::error::{Result, StorefrontError};

#[derive(Default)]
struct Recorded {
    chunks: Vec<ChunkPart>,
    attempts: usize,
    completes: Vec<CompleteRequest>,
    fail_at: Option<(u64, u16)>,
}

/// Records every request; optionally rejects one chunk index or delays each chunk
#[derive(Clone)]
pub struct RecordingTransport {
    recorded: Arc<Mutex<Recorded>>,
    url: Option<String>,
    checksum: Option<String>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            recorded: Arc::new(Mutex::new(Recorded::default())),
            url: None,
            checksum: None,
            delay: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reject chunk `index` (of any upload) with `status` until cleared
    pub fn failing_at(self, index: u64, status: u16) -> Self {
        self.recorded.lock().unwrap().fail_at = Some((index, status));
        self
    }

    pub fn clear_failure(&self) {
        self.recorded.lock().unwrap().fail_at = None;
    }

    /// Fixed `url` in finalize responses instead of one derived from the file name
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_checksum(mut self, checksum: &str) -> Self {
        self.checksum = Some(checksum.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Accepted chunks, in arrival order
    pub fn chunks(&self) -> Vec<ChunkPart> {
        self.recorded.lock().unwrap().chunks.clone()
    }

    pub fn chunk_attempts(&self) -> usize {
        self.recorded.lock().unwrap().attempts
    }

    pub fn completes(&self) -> Vec<CompleteRequest> {
        self.recorded.lock().unwrap().completes.clone()
    }

    /// Highest number of chunk requests seen in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Counts a request as in flight until dropped, including when a cancelled
/// `select!` drops the request future mid-delay
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> (Self, usize) {
        let current = counter.fetch_add(1, Ordering::SeqCst) + 1;
        (Self(counter.clone()), current)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChunkTransport for RecordingTransport {
    async fn send_chunk(&self, chunk: ChunkPart) -> Result<()> {
        let (_guard, current) = InFlightGuard::enter(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut recorded = self.recorded.lock().unwrap();
        recorded.attempts += 1;
        match recorded.fail_at {
            Some((index, status)) if index == chunk.index => Err(StorefrontError::Transport {
                endpoint: "chunk-upload/chunk".to_string(),
                status,
                body: "rejected".to_string(),
            }),
            _ => {
                recorded.chunks.push(chunk);
                Ok(())
            }
        }
    }

    async fn complete(&self, request: &CompleteRequest) -> Result<AttachmentDto> {
        self.recorded
            .lock()
            .unwrap()
            .completes
            .push(request.clone());

        let url = self
            .url
            .clone()
            .unwrap_or_else(|| format!("https://cdn.example.com/{}", request.file_name));

        Ok(AttachmentDto {
            id: Some(serde_json::json!(request.upload_id)),
            file_name: request.file_name.clone(),
            content_type: "application/octet-stream".to_string(),
            size: 0,
            url,
            checksum: self.checksum.clone(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        })
    }
}
