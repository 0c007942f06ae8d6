//! Type definitions for chunked uploads.
//!
//! Defines the per-file queue item, its lifecycle state, and the attachment
//! record the server returns after reassembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::types::null_as_empty;

/// Chunk size for multi-image gallery uploads (1 MiB)
pub const GALLERY_CHUNK_SIZE: u64 = 1024 * 1024;

/// Chunk size for single-image and variant uploads (2 MiB)
pub const IMAGE_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Queued,
    Uploading,
    Done,
    Error,
}

/// One file selected for upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadItem {
    /// Stable id used by the queue; survives retries
    pub id: String,
    /// Server-side session token; replaced on every retry
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u64,
    pub state: UploadState,
    pub progress: u8,
    pub queued_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub attachment: Option<AttachmentDto>,
}

/// Stored asset returned by the finalize call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content_type: String,
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: u64,
    /// Must be non-empty for the upload to count as successful
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created_at: String,
}

/// Byte count as a JS number: `null`, negatives and non-numbers read as 0,
/// floats are truncated
fn lenient_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let size = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    };
    Ok(size)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStatus {
    pub queued: usize,
    pub uploading: usize,
    pub done: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_from_server_json() {
        let json = r#"{
            "id": 17,
            "fileName": "photo.jpg",
            "contentType": "image/jpeg",
            "size": 2048,
            "url": "https://cdn.example.com/photo.jpg",
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;
        let attachment: AttachmentDto = serde_json::from_str(json).unwrap();

        assert_eq!(attachment.id, Some(serde_json::json!(17)));
        assert_eq!(attachment.file_name, "photo.jpg");
        assert_eq!(attachment.url, "https://cdn.example.com/photo.jpg");
        assert!(attachment.checksum.is_none());
    }

    #[test]
    fn test_missing_or_null_url_is_empty() {
        let missing: AttachmentDto = serde_json::from_str(r#"{"fileName":"a.png"}"#).unwrap();
        assert_eq!(missing.url, "");

        let null: AttachmentDto =
            serde_json::from_str(r#"{"fileName":"a.png","url":null}"#).unwrap();
        assert_eq!(null.url, "");
    }

    #[test]
    fn test_null_or_float_size_still_parses() {
        let null: AttachmentDto = serde_json::from_str(
            r#"{"fileName":"a.jpg","size":null,"url":"https://cdn.example.com/a.jpg","createdAt":"t"}"#,
        )
        .unwrap();
        assert_eq!(null.size, 0);
        assert_eq!(null.url, "https://cdn.example.com/a.jpg");

        let float: AttachmentDto = serde_json::from_str(
            r#"{"fileName":"a.jpg","size":12.0,"url":"https://cdn.example.com/a.jpg"}"#,
        )
        .unwrap();
        assert_eq!(float.size, 12);

        let negative: AttachmentDto =
            serde_json::from_str(r#"{"url":"https://cdn.example.com/a.jpg","size":-3}"#).unwrap();
        assert_eq!(negative.size, 0);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UploadState::Uploading).unwrap(),
            "\"uploading\""
        );
    }
}
