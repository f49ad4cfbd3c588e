//! Backing-store traits describing the persistence adapters the cache layer
//! reads through.
//!
//! `Ok(None)` means the key has no record (an expected miss that surfaces as
//! not-found); `Err` means the load itself failed. Every store must be safe
//! to call concurrently for different keys.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{FileRecord, PageRecord, ParameterRecord, ProjectRecord, UriRecord};

/// Failure loading from a backing store.
///
/// `Clone` because a single-flight load fans its result out to every caller
/// that joined the population.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("backing store error: {message}")]
    Backend { message: String },
    #[error("malformed record for external key `{external_key}`: {message}")]
    MalformedRecord {
        external_key: String,
        message: String,
    },
    #[error("backing store timeout")]
    Timeout,
}

impl StoreError {
    pub fn backend(message: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: message.to_string(),
        }
    }

    pub fn malformed(external_key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::MalformedRecord {
            external_key: external_key.into(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
pub trait PagesStore: Send + Sync {
    async fn load_by_external_key(&self, key: &str) -> Result<Option<PageRecord>, StoreError>;
}

#[async_trait]
pub trait FilesStore: Send + Sync {
    async fn load_by_external_key(&self, key: &str) -> Result<Option<FileRecord>, StoreError>;
}

#[async_trait]
pub trait ParametersStore: Send + Sync {
    async fn load_by_external_key(&self, key: &str) -> Result<Option<ParameterRecord>, StoreError>;

    /// Parameters declared by one page, in declaration order. An empty list
    /// is a successful load, not a miss.
    async fn load_for_page(&self, page_key: &str) -> Result<Vec<ParameterRecord>, StoreError>;
}

#[async_trait]
pub trait ProjectsStore: Send + Sync {
    async fn load_by_external_key(&self, key: &str) -> Result<Option<ProjectRecord>, StoreError>;
}

#[async_trait]
pub trait UrisStore: Send + Sync {
    async fn load_by_external_key(&self, key: &str) -> Result<Option<UriRecord>, StoreError>;
}

/// The five namespace stores handed to `CacheInstances` at construction.
#[derive(Clone)]
pub struct StoreSet {
    pub pages: Arc<dyn PagesStore>,
    pub files: Arc<dyn FilesStore>,
    pub parameters: Arc<dyn ParametersStore>,
    pub projects: Arc<dyn ProjectsStore>,
    pub uris: Arc<dyn UrisStore>,
}
