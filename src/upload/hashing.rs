//! SHA256 hashing for checksum verification.
//!
//! Hashes are lowercase hex, computed chunk by chunk so large files never sit in memory whole.

use sha2::{Digest, Sha256};

use super::plan::ChunkPlan;
use super::source::ChunkSource;
use crate::error::Result;

/// SHA256 of the whole source, read `chunk_size` bytes at a time
pub async fn source_sha256(source: &dyn ChunkSource, chunk_size: u64) -> Result<String> {
    let plan = ChunkPlan::new(source.size(), chunk_size)?;
    let mut hasher = Sha256::new();

    for chunk in plan.chunks() {
        let bytes = source.read_range(chunk.start, chunk.end).await?;
        hasher.update(&bytes);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA256 of content in memory
pub fn content_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Compare two hex digests ignoring case and surrounding whitespace
pub fn checksums_match(local: &str, remote: &str) -> bool {
    local.trim().eq_ignore_ascii_case(remote.trim())
}
