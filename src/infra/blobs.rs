//! Filesystem-backed blob storage adapter.
//!
//! The blob store proper is a collaborator; this adapter serves embedders
//! that keep blobs on local disk, and the test suites.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::application::files::{BlobError, BlobReader, BlobStore};

use super::error::InfraError;

/// Blob store rooted at a directory; blob references are relative paths
/// below the root.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Initialise storage rooted at the provided directory, creating it if
    /// necessary.
    pub fn new(root: PathBuf) -> Result<Self, InfraError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Reject references that would escape the root.
    fn resolve(&self, blob_ref: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(blob_ref);
        let safe = !blob_ref.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(BlobError::InvalidRef {
                blob_ref: blob_ref.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn open_blob(&self, blob_ref: &str) -> Result<BlobReader, BlobError> {
        let path = self.resolve(blob_ref)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound {
                    blob_ref: blob_ref.to_string(),
                })
            }
            Err(error) => Err(BlobError::Io(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn traversal_references_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let store = FsBlobStore::new(dir.path().to_path_buf()).expect("store should init");

        for blob_ref in ["../escape", "/absolute", "", "a/../../b"] {
            let error = store.open_blob(blob_ref).await.err().unwrap();
            assert!(
                matches!(error, BlobError::InvalidRef { .. }),
                "`{blob_ref}` should be rejected"
            );
        }
    }

    #[test]
    fn init_under_a_file_surfaces_as_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let occupied = dir.path().join("occupied");
        std::fs::write(&occupied, b"x").expect("file should write");

        let error = FsBlobStore::new(occupied).expect_err("init under a file should fail");
        assert!(matches!(error, InfraError::Io(_)));
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let store = FsBlobStore::new(dir.path().to_path_buf()).expect("store should init");

        let error = store.open_blob("nope.bin").await.err().unwrap();
        assert!(matches!(error, BlobError::NotFound { .. }));
    }
}
