use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use super::RangeReader;
use crate::error::IoError;

/// Local filesystem implementation of [`RangeReader`].
///
/// The file size is captured once at construction. Reads are dispatched to
/// the blocking thread pool so they never stall the async scheduler, and each
/// read opens its own handle so concurrent reads don't contend on a shared
/// file cursor.
#[derive(Debug, Clone)]
pub struct FileRangeReader {
    path: PathBuf,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    /// Create a new FileRangeReader for the given path.
    ///
    /// Returns an error if the file does not exist or its metadata cannot be
    /// read.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(path.display().to_string()),
            _ => IoError::Fetch(e.to_string()),
        })?;

        let identifier = format!("file://{}", path.display());

        Ok(Self {
            path,
            size: metadata.len(),
            identifier,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RangeReader for FileRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        if offset + len as u64 > self.size {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }
        if len == 0 {
            return Ok(Bytes::new());
        }

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut file = std::fs::File::open(&path).map_err(|e| IoError::Fetch(e.to_string()))?;
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| IoError::Fetch(e.to_string()))?;
            let mut buf = vec![0u8; len];
            file.read_exact(&mut buf)
                .map_err(|e| IoError::Fetch(e.to_string()))?;
            Ok(Bytes::from(buf))
        })
        .await
        .map_err(|e| IoError::Connection(format!("blocking read task failed: {e}")))?
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
