use thiserror::Error;

use crate::domain::types::Namespace;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("no {namespace} entity for external key `{external_key}`")]
    NotFound {
        namespace: Namespace,
        external_key: String,
    },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn not_found(namespace: Namespace, external_key: impl Into<String>) -> Self {
        Self::NotFound {
            namespace,
            external_key: external_key.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
