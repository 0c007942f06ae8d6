//! Byte sources the pipeline can slice into chunks.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{ErrorContext, Result, StorefrontError};

/// A finite, sliceable byte source with a display name
#[async_trait]
pub trait ChunkSource: Send + Sync {
    fn file_name(&self) -> &str;

    fn size(&self) -> u64;

    /// Read bytes `[start, end)`
    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>>;
}

fn check_range(start: u64, end: u64, size: u64) -> Result<usize> {
    if start > end || end > size {
        return Err(StorefrontError::Validation(format!(
            "Range {}..{} is outside source of {} bytes",
            start, end, size
        )));
    }
    usize::try_from(end - start)
        .map_err(|_| StorefrontError::Validation("Chunk too large for memory".to_string()))
}

/// File on disk, re-opened for each range read
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    file_name: String,
    size: u64,
}

impl FileSource {
    /// Stat `path`; the size is fixed at this point
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path)
            .await
            .context("Failed to read file metadata")?;

        if !metadata.is_file() {
            return Err(StorefrontError::Validation(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            path,
            file_name,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChunkSource for FileSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let len = check_range(start, end, self.size)?;

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(start)).await?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer).await?;
        Ok(buffer)
    }
}

/// In-memory buffer, e.g. an image already decoded by the caller
#[derive(Debug, Clone)]
pub struct BytesSource {
    file_name: String,
    data: Arc<[u8]>,
}

impl BytesSource {
    pub fn new(file_name: &str, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.to_string(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl ChunkSource for BytesSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        check_range(start, end, self.size())?;
        Ok(self.data[start as usize..end as usize].to_vec())
    }
}
