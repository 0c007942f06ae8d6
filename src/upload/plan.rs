//! Chunk arithmetic shared by the pipeline and the queue.

use crate::error::{Result, StorefrontError};

/// Progress never reaches 100 until the finalize call succeeds
pub const MAX_PROGRESS_BEFORE_FINALIZE: u8 = 99;

/// `ceil(size / chunk_size)`; zero for an empty file
pub fn total_chunks(size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size)
}

/// Byte range `[start, end)` of chunk `index`; the last chunk may be short
pub fn chunk_range(index: u64, chunk_size: u64, size: u64) -> (u64, u64) {
    let start = index.saturating_mul(chunk_size).min(size);
    let end = start.saturating_add(chunk_size).min(size);
    (start, end)
}

/// Multipart file name for a chunk, e.g. `photo.jpg.part3`
pub fn part_file_name(file_name: &str, index: u64) -> String {
    format!("{}.part{}", file_name, index)
}

/// `min(99, floor(uploaded * 100 / size))`
pub fn progress_percent(uploaded: u64, size: u64) -> u8 {
    if size == 0 {
        return 0;
    }
    let percent = (uploaded as u128 * 100 / size as u128) as u64;
    percent.min(MAX_PROGRESS_BEFORE_FINALIZE as u64) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    pub index: u64,
    pub start: u64,
    pub end: u64,
}

impl ChunkSpec {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// How a source of `size` bytes splits into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub size: u64,
    pub chunk_size: u64,
    pub total_chunks: u64,
}

impl ChunkPlan {
    pub fn new(size: u64, chunk_size: u64) -> Result<Self> {
        if chunk_size == 0 {
            return Err(StorefrontError::Validation(
                "Chunk size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            size,
            chunk_size,
            total_chunks: total_chunks(size, chunk_size),
        })
    }

    pub fn chunks(&self) -> impl Iterator<Item = ChunkSpec> + '_ {
        (0..self.total_chunks).map(move |index| {
            let (start, end) = chunk_range(index, self.chunk_size, self.size);
            ChunkSpec { index, start, end }
        })
    }
}
