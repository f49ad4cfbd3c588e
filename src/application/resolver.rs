//! Entity resolution: `(namespace, external key)` → entity, through the
//! cache layer. Resolution sits on the hot path of every page and file
//! request; a miss populates the cache, a repeat hit never re-fetches.

use std::sync::Arc;

use tracing::debug;

use crate::application::error::AppError;
use crate::cache::CacheInstances;
use crate::domain::entities::Entity;
use crate::domain::error::DomainError;
use crate::domain::types::Namespace;

const SOURCE: &str = "application::resolver";

#[derive(Clone)]
pub struct EntityResolver {
    caches: Arc<CacheInstances>,
}

impl EntityResolver {
    pub fn new(caches: Arc<CacheInstances>) -> Self {
        Self { caches }
    }

    /// Resolve an external key within one namespace.
    ///
    /// Fails with a not-found error when the backing store has no record for
    /// the key (never cached), and with a backing-store error when the load
    /// itself fails. No side effects beyond populating the cache on a miss.
    pub async fn resolve(
        &self,
        namespace: Namespace,
        external_key: &str,
    ) -> Result<Entity, AppError> {
        if external_key.trim().is_empty() {
            return Err(DomainError::validation("external key must not be empty").into());
        }

        let resolved = match namespace {
            Namespace::Pages => self.caches.page(external_key).await?.map(Entity::Page),
            Namespace::Files => self.caches.file(external_key).await?.map(Entity::File),
            Namespace::Parameters => self
                .caches
                .parameter(external_key)
                .await?
                .map(Entity::Parameter),
            Namespace::Projects => self.caches.project(external_key).await?.map(Entity::Project),
            Namespace::Uris => self.caches.uri(external_key).await?.map(Entity::Uri),
        };

        match resolved {
            Some(entity) => Ok(entity),
            None => {
                debug!(
                    source = SOURCE,
                    namespace = namespace.as_str(),
                    external_key,
                    "resolution miss"
                );
                Err(DomainError::not_found(namespace, external_key).into())
            }
        }
    }
}
