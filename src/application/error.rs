use thiserror::Error;

use crate::application::controllers::ControllerError;
use crate::application::files::BlobError;
use crate::application::pages::TemplateError;
use crate::application::repos::StoreError;
use crate::domain::error::DomainError;

/// How a failure should surface to the end user.
///
/// Resolution misses map to a not-found response; everything else is a
/// generic failure with the underlying cause logged, never shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    NotFound,
    BadRequest,
    Failure,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("backing store load failed: {0}")]
    BackingStore(#[from] StoreError),
    #[error("blob access failed: {0}")]
    Blob(#[from] BlobError),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    ControllerInstantiation(#[from] ControllerError),
}

impl AppError {
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub fn response_class(&self) -> ResponseClass {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) => ResponseClass::NotFound,
            AppError::Domain(DomainError::Validation { .. }) => ResponseClass::BadRequest,
            AppError::BackingStore(_)
            | AppError::Blob(_)
            | AppError::Io { .. }
            | AppError::Template(_)
            | AppError::ControllerInstantiation(_) => ResponseClass::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Namespace;

    #[test]
    fn not_found_maps_to_not_found_class() {
        let error = AppError::from(DomainError::not_found(Namespace::Pages, "home"));
        assert_eq!(error.response_class(), ResponseClass::NotFound);
    }

    #[test]
    fn load_failures_map_to_generic_failure() {
        let error = AppError::from(StoreError::backend("connection reset"));
        assert_eq!(error.response_class(), ResponseClass::Failure);

        let error = AppError::from(TemplateError::new("news", "missing include"));
        assert_eq!(error.response_class(), ResponseClass::Failure);
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let error = AppError::from(DomainError::validation("external key must not be empty"));
        assert_eq!(error.response_class(), ResponseClass::BadRequest);
    }
}
