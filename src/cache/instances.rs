//! Explicitly constructed cache context: one read-through cache per
//! namespace, built at startup from the backing stores and dropped at
//! shutdown. There is no ambient singleton; components hold an
//! `Arc<CacheInstances>`.

use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::application::repos::{StoreError, StoreSet};
use crate::config::CacheSettings;
use crate::domain::entities::{FileRecord, PageRecord, ParameterRecord, ProjectRecord, UriRecord};
use crate::domain::types::Namespace;

use super::store::EntityCache;

const SOURCE: &str = "cache::instances";

pub struct CacheInstances {
    stores: StoreSet,
    pages: EntityCache<PageRecord>,
    files: EntityCache<FileRecord>,
    parameters: EntityCache<ParameterRecord>,
    /// Declared-parameter lists cached under the owning page's key.
    page_parameters: EntityCache<Vec<ParameterRecord>>,
    projects: EntityCache<ProjectRecord>,
    uris: EntityCache<UriRecord>,
}

impl CacheInstances {
    pub fn new(stores: StoreSet, settings: &CacheSettings) -> Self {
        Self {
            stores,
            pages: EntityCache::new(Namespace::Pages, settings.enable_pages),
            files: EntityCache::new(Namespace::Files, settings.enable_files),
            parameters: EntityCache::new(Namespace::Parameters, settings.enable_parameters),
            page_parameters: EntityCache::new(Namespace::Parameters, settings.enable_parameters),
            projects: EntityCache::new(Namespace::Projects, settings.enable_projects),
            uris: EntityCache::new(Namespace::Uris, settings.enable_uris),
        }
    }

    pub async fn page(&self, key: &str) -> Result<Option<Arc<PageRecord>>, StoreError> {
        let store = Arc::clone(&self.stores.pages);
        self.pages
            .get_or_load(key, move |key| {
                async move { store.load_by_external_key(&key).await }.boxed()
            })
            .await
    }

    pub async fn file(&self, key: &str) -> Result<Option<Arc<FileRecord>>, StoreError> {
        let store = Arc::clone(&self.stores.files);
        self.files
            .get_or_load(key, move |key| {
                async move { store.load_by_external_key(&key).await }.boxed()
            })
            .await
    }

    pub async fn parameter(&self, key: &str) -> Result<Option<Arc<ParameterRecord>>, StoreError> {
        let store = Arc::clone(&self.stores.parameters);
        self.parameters
            .get_or_load(key, move |key| {
                async move { store.load_by_external_key(&key).await }.boxed()
            })
            .await
    }

    /// Parameters declared by one page. An empty list is a valid, cacheable
    /// result; only load failures surface as errors.
    pub async fn parameters_for_page(
        &self,
        page_key: &str,
    ) -> Result<Arc<Vec<ParameterRecord>>, StoreError> {
        let store = Arc::clone(&self.stores.parameters);
        let loaded = self
            .page_parameters
            .get_or_load(page_key, move |key| {
                async move { store.load_for_page(&key).await.map(Some) }.boxed()
            })
            .await?;
        match loaded {
            Some(list) => Ok(list),
            None => Ok(Arc::new(Vec::new())),
        }
    }

    pub async fn project(&self, key: &str) -> Result<Option<Arc<ProjectRecord>>, StoreError> {
        let store = Arc::clone(&self.stores.projects);
        self.projects
            .get_or_load(key, move |key| {
                async move { store.load_by_external_key(&key).await }.boxed()
            })
            .await
    }

    pub async fn uri(&self, key: &str) -> Result<Option<Arc<UriRecord>>, StoreError> {
        let store = Arc::clone(&self.stores.uris);
        self.uris
            .get_or_load(key, move |key| {
                async move { store.load_by_external_key(&key).await }.boxed()
            })
            .await
    }

    /// Invalidation signal from the backing store's write path. Idempotent.
    ///
    /// Invalidating a page also drops its declared-parameter list, since the
    /// two are loaded and edited together. Invalidating a parameter drops
    /// every cached declared-parameter list: the parameter's own key does
    /// not identify the owning page, and rendering reads the lists, so a
    /// targeted drop would leave the updated value invisible to it.
    pub fn invalidate(&self, namespace: Namespace, key: &str) {
        debug!(source = SOURCE, namespace = namespace.as_str(), key, "cache invalidate");
        match namespace {
            Namespace::Pages => {
                self.pages.invalidate(key);
                self.page_parameters.invalidate(key);
            }
            Namespace::Files => self.files.invalidate(key),
            Namespace::Parameters => {
                self.parameters.invalidate(key);
                self.page_parameters.clear();
            }
            Namespace::Projects => self.projects.invalidate(key),
            Namespace::Uris => self.uris.invalidate(key),
        }
    }

    /// Drop the declared-parameter list cached for one page.
    pub fn invalidate_parameters_for_page(&self, page_key: &str) {
        self.page_parameters.invalidate(page_key);
    }

    /// Process-wide reset: drop every cached entry in every namespace.
    pub fn clear_all(&self) {
        debug!(source = SOURCE, "cache reset");
        self.pages.clear();
        self.files.clear();
        self.parameters.clear();
        self.page_parameters.clear();
        self.projects.clear();
        self.uris.clear();
    }

    /// Number of populated entries in one namespace (parameter lists count
    /// toward `Parameters`).
    pub fn len(&self, namespace: Namespace) -> usize {
        match namespace {
            Namespace::Pages => self.pages.len(),
            Namespace::Files => self.files.len(),
            Namespace::Parameters => self.parameters.len() + self.page_parameters.len(),
            Namespace::Projects => self.projects.len(),
            Namespace::Uris => self.uris.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Namespace::ALL.iter().all(|namespace| self.len(*namespace) == 0)
    }
}
