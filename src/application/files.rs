//! File content delivery: resolve a file entity through the cache, open its
//! blob, and stream the bytes into an async sink.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::application::error::AppError;
use crate::cache::CacheInstances;
use crate::domain::entities::FileRecord;
use crate::domain::error::DomainError;
use crate::domain::types::Namespace;

const SOURCE: &str = "application::files";

/// Copy buffer for blob streaming; blobs larger than this are copied in
/// multiple passes with byte order preserved.
const STREAM_BUFFER_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob `{blob_ref}` not found")]
    NotFound { blob_ref: String },
    #[error("invalid blob reference `{blob_ref}`")]
    InvalidRef { blob_ref: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Byte stream for one blob.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Blob storage collaborator. Implementations must be safe to call
/// concurrently for different references.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn open_blob(&self, blob_ref: &str) -> Result<BlobReader, BlobError>;
}

pub struct FileContentBuilder {
    caches: Arc<CacheInstances>,
    blobs: Arc<dyn BlobStore>,
}

impl FileContentBuilder {
    pub fn new(caches: Arc<CacheInstances>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { caches, blobs }
    }

    /// Resolve a file entity by external key through the cache.
    pub async fn find(&self, external_key: &str) -> Result<Arc<FileRecord>, AppError> {
        if external_key.trim().is_empty() {
            return Err(DomainError::validation("external key must not be empty").into());
        }
        match self.caches.file(external_key).await? {
            Some(file) => Ok(file),
            None => Err(DomainError::not_found(Namespace::Files, external_key).into()),
        }
    }

    /// Open the blob stream behind a resolved file.
    pub async fn open_content(&self, file: &FileRecord) -> Result<BlobReader, AppError> {
        Ok(self.blobs.open_blob(&file.blob_ref).await?)
    }

    /// Stream the file's blob into `sink` with a fixed copy buffer, flushing
    /// before returning. Returns the number of bytes written.
    pub async fn write_content<W>(&self, file: &FileRecord, sink: &mut W) -> Result<u64, AppError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut reader = self.blobs.open_blob(&file.blob_ref).await?;
        let mut buffer = vec![0u8; STREAM_BUFFER_BYTES];
        let mut written: u64 = 0;

        loop {
            let read = reader
                .read(&mut buffer)
                .await
                .map_err(|source| AppError::io("reading blob stream", source))?;
            if read == 0 {
                break;
            }
            sink.write_all(&buffer[..read])
                .await
                .map_err(|source| AppError::io("writing blob stream", source))?;
            written += read as u64;
        }
        sink.flush()
            .await
            .map_err(|source| AppError::io("flushing blob stream", source))?;

        debug!(
            source = SOURCE,
            external_key = %file.external_key,
            blob_ref = %file.blob_ref,
            written,
            "streamed file content"
        );
        Ok(written)
    }
}
