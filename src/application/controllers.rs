//! Static page-controller registry.
//!
//! A page declares its controller by identifier; the registry maps that
//! identifier to a provider registered at startup. Unknown identifiers fail
//! fast instead of being instantiated dynamically.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::error::AppError;
use crate::application::model::{PageModel, RequestContext};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("unknown page controller `{identifier}`")]
    Unknown { identifier: String },
    #[error("page controller `{identifier}` is already registered")]
    Duplicate { identifier: String },
}

/// Contributes controller-specific data to a page model.
#[async_trait]
pub trait PageModelProvider: Send + Sync {
    async fn contribute(
        &self,
        ctx: &RequestContext,
        model: &mut PageModel,
    ) -> Result<(), AppError>;
}

/// Identifier → provider table, built once at startup and then read-only.
#[derive(Default)]
pub struct ControllerRegistry {
    providers: HashMap<String, Arc<dyn PageModelProvider>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        provider: Arc<dyn PageModelProvider>,
    ) -> Result<(), ControllerError> {
        let identifier = identifier.into();
        if self.providers.contains_key(&identifier) {
            return Err(ControllerError::Duplicate { identifier });
        }
        self.providers.insert(identifier, provider);
        Ok(())
    }

    pub fn resolve(&self, identifier: &str) -> Result<Arc<dyn PageModelProvider>, ControllerError> {
        self.providers
            .get(identifier)
            .cloned()
            .ok_or_else(|| ControllerError::Unknown {
                identifier: identifier.to_string(),
            })
    }

    pub fn is_registered(&self, identifier: &str) -> bool {
        self.providers.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopProvider;

    #[async_trait]
    impl PageModelProvider for NoopProvider {
        async fn contribute(
            &self,
            _ctx: &RequestContext,
            _model: &mut PageModel,
        ) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[test]
    fn resolve_unknown_identifier_fails_fast() {
        let registry = ControllerRegistry::new();
        let error = registry.resolve("NewsController").err().unwrap();
        assert!(matches!(error, ControllerError::Unknown { .. }));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ControllerRegistry::new();
        registry
            .register("news", Arc::new(NoopProvider))
            .expect("first registration should succeed");
        let error = registry
            .register("news", Arc::new(NoopProvider))
            .unwrap_err();
        assert!(matches!(error, ControllerError::Duplicate { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registered_identifier_resolves() {
        let mut registry = ControllerRegistry::new();
        registry
            .register("news", Arc::new(NoopProvider))
            .expect("registration should succeed");
        assert!(registry.is_registered("news"));
        assert!(registry.resolve("news").is_ok());
    }
}
