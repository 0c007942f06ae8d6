use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sequence number for ordering events
pub type EventSequence = u64;

/// Upload lifecycle event for one queue item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEvent {
    pub sequence: EventSequence,
    pub timestamp: DateTime<Utc>,
    pub item_id: String,
    pub upload_id: String,
    pub payload: UploadEventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploadEventPayload {
    /// Item accepted into the queue (also after a retry, with the new upload id)
    Queued { file_name: String, file_size: u64 },

    /// Item acquired a transfer slot and started sending chunks
    Started { total_chunks: u64 },

    Progress { percent: u8 },

    /// Finalize succeeded
    Completed { url: String },

    Failed { error: String },

    /// Item discarded by the caller; any in-flight upload is cancelled
    Removed,
}

impl UploadEvent {
    pub fn payload_type(&self) -> &str {
        match &self.payload {
            UploadEventPayload::Queued { .. } => "queued",
            UploadEventPayload::Started { .. } => "started",
            UploadEventPayload::Progress { .. } => "progress",
            UploadEventPayload::Completed { .. } => "completed",
            UploadEventPayload::Failed { .. } => "failed",
            UploadEventPayload::Removed => "removed",
        }
    }

    /// Progress ticks are noisy and stay out of the component log
    pub fn is_progress(&self) -> bool {
        matches!(self.payload, UploadEventPayload::Progress { .. })
    }
}
