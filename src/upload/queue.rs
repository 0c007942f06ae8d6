//! Concurrent multi-file uploads (gallery flow).
//!
//! Each item runs its own sequential chunk loop on a tokio task; a semaphore bounds how
//! many items transfer at once. Items move `Queued -> Uploading -> Done | Error` and every
//! transition is published on the event bus.

use chrono::Utc;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::pipeline::{ChunkedUploader, COMPLETE_PROGRESS};
use super::plan::total_chunks;
use super::source::{BytesSource, ChunkSource, FileSource};
use super::transport::{ChunkTransport, HttpChunkTransport};
use super::types::{AttachmentDto, UploadItem, UploadState, UploadStatus};
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};
use crate::events::{EventBus, UploadEventPayload};
use crate::validation::{validate_local_path, validate_upload_source};

type Entries = Arc<Mutex<IndexMap<String, QueueEntry>>>;

struct QueueEntry {
    item: UploadItem,
    source: Arc<dyn ChunkSource>,
    cancel: CancellationToken,
    // Set once a task owns this attempt, so an item never uploads twice in parallel
    scheduled: bool,
}

/// Everything a spawned task needs for one upload attempt
struct UploadJob {
    item_id: String,
    upload_id: String,
    source: Arc<dyn ChunkSource>,
    cancel: CancellationToken,
}

impl QueueEntry {
    fn schedule(&mut self) -> Option<UploadJob> {
        if self.item.state != UploadState::Queued || self.scheduled {
            return None;
        }
        self.scheduled = true;

        Some(UploadJob {
            item_id: self.item.id.clone(),
            upload_id: self.item.upload_id.clone(),
            source: Arc::clone(&self.source),
            cancel: self.cancel.clone(),
        })
    }
}

fn new_upload_id() -> String {
    Uuid::new_v4().to_string()
}

/// Apply `f` to the item if it still exists under the same upload id
fn with_item<R>(
    entries: &Mutex<IndexMap<String, QueueEntry>>,
    item_id: &str,
    upload_id: &str,
    f: impl FnOnce(&mut UploadItem) -> R,
) -> Option<R> {
    let mut entries = entries.lock().ok()?;
    let entry = entries.get_mut(item_id)?;
    if entry.item.upload_id != upload_id {
        return None;
    }
    Some(f(&mut entry.item))
}

pub struct UploadQueue<T: ChunkTransport + 'static> {
    entries: Entries,
    uploader: Arc<ChunkedUploader<T>>,
    semaphore: Arc<Semaphore>,
    events: EventBus,
    max_upload_size: u64,
}

impl<T: ChunkTransport + 'static> Clone for UploadQueue<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            uploader: Arc::clone(&self.uploader),
            semaphore: Arc::clone(&self.semaphore),
            events: self.events.clone(),
            max_upload_size: self.max_upload_size,
        }
    }
}

impl<T: ChunkTransport + 'static> std::fmt::Debug for UploadQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadQueue")
            .field("entries", &"<upload items>")
            .field("uploader", &"<uploader>")
            .field("semaphore", &self.semaphore)
            .field("events", &self.events)
            .field("max_upload_size", &self.max_upload_size)
            .finish()
    }
}

impl UploadQueue<HttpChunkTransport> {
    /// Queue for gallery uploads against the configured server
    pub fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let uploader = ChunkedUploader::for_gallery(config)?;
        Ok(Self::new(
            uploader,
            config.max_concurrent_uploads,
            config.max_upload_size,
        ))
    }
}

impl<T: ChunkTransport + 'static> UploadQueue<T> {
    pub fn new(uploader: ChunkedUploader<T>, max_concurrent: usize, max_upload_size: u64) -> Self {
        Self {
            entries: Arc::new(Mutex::new(IndexMap::new())),
            uploader: Arc::new(uploader),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            events: EventBus::default(),
            max_upload_size,
        }
    }

    /// Publish on a caller-owned bus instead of the queue's own
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn lock_entries(&self) -> Result<MutexGuard<'_, IndexMap<String, QueueEntry>>> {
        self.entries
            .lock()
            .map_err(|_| StorefrontError::LockPoisoned("upload queue".to_string()))
    }

    fn publish(&self, item_id: &str, upload_id: &str, payload: UploadEventPayload) {
        // No subscribers is normal for headless callers
        let _ = self.events.publish(item_id, upload_id, payload);
    }

    /// Validate and queue a source; returns the new item id
    pub fn enqueue(&self, source: Arc<dyn ChunkSource>) -> Result<String> {
        validate_upload_source(source.as_ref(), self.max_upload_size)?;

        let chunk_size = self.uploader.chunk_size();
        let item = UploadItem {
            id: Uuid::new_v4().to_string(),
            upload_id: new_upload_id(),
            file_name: source.file_name().to_string(),
            file_size: source.size(),
            chunk_size,
            total_chunks: total_chunks(source.size(), chunk_size),
            state: UploadState::Queued,
            progress: 0,
            queued_at: Utc::now(),
            attempts: 0,
            last_error: None,
            attachment: None,
        };

        let item_id = item.id.clone();
        let upload_id = item.upload_id.clone();
        let payload = UploadEventPayload::Queued {
            file_name: item.file_name.clone(),
            file_size: item.file_size,
        };

        self.lock_entries()?.insert(
            item_id.clone(),
            QueueEntry {
                item,
                source,
                cancel: CancellationToken::new(),
                scheduled: false,
            },
        );

        self.publish(&item_id, &upload_id, payload);
        Ok(item_id)
    }

    pub async fn enqueue_path(&self, path: &Path) -> Result<String> {
        let canonical = validate_local_path(path)?;
        let source = FileSource::open(&canonical).await?;
        self.enqueue(Arc::new(source))
    }

    pub fn enqueue_bytes(&self, file_name: &str, data: impl Into<Arc<[u8]>>) -> Result<String> {
        self.enqueue(Arc::new(BytesSource::new(file_name, data)))
    }

    /// Spawn the upload task for a queued item
    pub fn start(&self, item_id: &str) -> Result<JoinHandle<()>> {
        let job = {
            let mut entries = self.lock_entries()?;
            let entry = entries.get_mut(item_id).ok_or_else(|| {
                StorefrontError::Validation(format!("Unknown upload item: {}", item_id))
            })?;
            entry.schedule().ok_or_else(|| {
                StorefrontError::Validation(format!(
                    "Upload item {} is not waiting to start",
                    item_id
                ))
            })?
        };

        Ok(self.spawn_upload(job))
    }

    /// Spawn tasks for every queued item not already started, in queue order
    pub fn start_all(&self) -> Result<Vec<JoinHandle<()>>> {
        let jobs: Vec<UploadJob> = {
            let mut entries = self.lock_entries()?;
            entries.values_mut().filter_map(QueueEntry::schedule).collect()
        };

        Ok(jobs.into_iter().map(|job| self.spawn_upload(job)).collect())
    }

    /// Restart a failed item from chunk 0 under a new upload id
    pub fn retry(&self, item_id: &str) -> Result<JoinHandle<()>> {
        let (job, payload) = {
            let mut entries = self.lock_entries()?;
            let entry = entries.get_mut(item_id).ok_or_else(|| {
                StorefrontError::Validation(format!("Unknown upload item: {}", item_id))
            })?;

            if entry.item.state != UploadState::Error {
                return Err(StorefrontError::Validation(format!(
                    "Only failed uploads can be retried (item {} is {:?})",
                    item_id, entry.item.state
                )));
            }

            entry.item.upload_id = new_upload_id();
            entry.item.state = UploadState::Queued;
            entry.item.progress = 0;
            entry.item.last_error = None;
            entry.item.attempts += 1;
            entry.cancel = CancellationToken::new();
            entry.scheduled = false;

            let payload = UploadEventPayload::Queued {
                file_name: entry.item.file_name.clone(),
                file_size: entry.item.file_size,
            };
            let job = entry.schedule().ok_or_else(|| {
                StorefrontError::Other(format!("Upload item {} could not be rescheduled", item_id))
            })?;
            (job, payload)
        };

        info!(item_id, upload_id = %job.upload_id, "Retrying upload");
        self.publish(item_id, &job.upload_id, payload);
        Ok(self.spawn_upload(job))
    }

    /// Drop an item, cancelling its upload if one is in flight
    pub fn remove(&self, item_id: &str) -> Result<UploadItem> {
        let entry = self.lock_entries()?.shift_remove(item_id).ok_or_else(|| {
            StorefrontError::Validation(format!("Unknown upload item: {}", item_id))
        })?;

        entry.cancel.cancel();
        self.publish(item_id, &entry.item.upload_id, UploadEventPayload::Removed);
        Ok(entry.item)
    }

    pub fn get(&self, item_id: &str) -> Option<UploadItem> {
        self.entries
            .lock()
            .ok()?
            .get(item_id)
            .map(|entry| entry.item.clone())
    }

    /// Snapshot of all items in queue order
    pub fn items(&self) -> Vec<UploadItem> {
        if let Ok(entries) = self.entries.lock() {
            entries.values().map(|entry| entry.item.clone()).collect()
        } else {
            Vec::new()
        }
    }

    pub fn status(&self) -> UploadStatus {
        let mut status = UploadStatus::default();
        if let Ok(entries) = self.entries.lock() {
            for entry in entries.values() {
                match entry.item.state {
                    UploadState::Queued => status.queued += 1,
                    UploadState::Uploading => status.uploading += 1,
                    UploadState::Done => status.done += 1,
                    UploadState::Error => status.failed += 1,
                }
            }
        }
        status
    }

    /// Remove finished items and hand back their attachments in queue order
    pub fn take_completed(&self) -> Result<Vec<AttachmentDto>> {
        let mut entries = self.lock_entries()?;

        let done: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.item.state == UploadState::Done)
            .map(|(id, _)| id.clone())
            .collect();

        Ok(done
            .iter()
            .filter_map(|id| entries.shift_remove(id))
            .filter_map(|entry| entry.item.attachment)
            .collect())
    }

    fn spawn_upload(&self, job: UploadJob) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move { queue.run_upload(job).await })
    }

    async fn run_upload(self, job: UploadJob) {
        let Ok(_permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
            return;
        };

        // Removed while waiting for a slot
        if job.cancel.is_cancelled() {
            return;
        }

        let Some(total_chunks) = with_item(&self.entries, &job.item_id, &job.upload_id, |item| {
            item.state = UploadState::Uploading;
            item.progress = 0;
            item.total_chunks
        }) else {
            return;
        };
        self.publish(
            &job.item_id,
            &job.upload_id,
            UploadEventPayload::Started { total_chunks },
        );

        let on_progress = {
            let entries = Arc::clone(&self.entries);
            let events = self.events.clone();
            let item_id = job.item_id.clone();
            let upload_id = job.upload_id.clone();
            move |percent: u8| {
                with_item(&entries, &item_id, &upload_id, |item| item.progress = percent);
                let payload = UploadEventPayload::Progress { percent };
                let _ = events.publish(&item_id, &upload_id, payload);
            }
        };

        let result = self
            .uploader
            .upload_with_cancel(job.source.as_ref(), &job.upload_id, on_progress, &job.cancel)
            .await;

        match result {
            Ok(attachment) => {
                let url = attachment.url.clone();
                with_item(&self.entries, &job.item_id, &job.upload_id, |item| {
                    item.state = UploadState::Done;
                    item.progress = COMPLETE_PROGRESS;
                    item.attachment = Some(attachment);
                });
                self.publish(&job.item_id, &job.upload_id, UploadEventPayload::Completed { url });
            }
            Err(e) if e.is_cancelled() => {
                info!(item_id = %job.item_id, upload_id = %job.upload_id, "Upload cancelled");
            }
            Err(e) => {
                let error = e.to_string();
                warn!(item_id = %job.item_id, upload_id = %job.upload_id, error = %error, "Upload failed");
                with_item(&self.entries, &job.item_id, &job.upload_id, |item| {
                    item.state = UploadState::Error;
                    item.last_error = Some(error.clone());
                });
                self.publish(&job.item_id, &job.upload_id, UploadEventPayload::Failed { error });
            }
        }
    }
}
