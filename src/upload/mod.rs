//! Chunked file upload: split a source into fixed-size parts, send them in order,
//! then ask the server to reassemble them.

pub mod hashing;
pub mod pipeline;
pub mod plan;
pub mod queue;
pub mod source;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use pipeline::ChunkedUploader;
pub use queue::UploadQueue;
pub use source::{BytesSource, ChunkSource, FileSource};
pub use transport::{ChunkPart, ChunkTransport, CompleteRequest, HttpChunkTransport};
pub use types::{
    AttachmentDto, UploadItem, UploadState, UploadStatus, GALLERY_CHUNK_SIZE, IMAGE_CHUNK_SIZE,
};
