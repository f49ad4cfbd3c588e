//! Domain entities mirrored from the backing stores.
//!
//! Records are immutable snapshots: the cache hands out shared `Arc`s and no
//! caller mutates a record in place. Updates go through the backing store's
//! write path followed by an explicit cache invalidation.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{Namespace, UriResourceType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    pub id: Uuid,
    pub external_key: String,
    pub name: String,
    /// When false the page is plain markup and `html_source` is served
    /// verbatim; when true the page renders through the template engine.
    pub is_template_source: bool,
    pub html_source: String,
    /// Template identifier handed to the engine; defaults to `name`.
    pub template_name: Option<String>,
    /// Registry identifier of the controller contributing model data.
    pub controller: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PageRecord {
    /// Template identifier used when rendering this page.
    pub fn template(&self) -> &str {
        self.template_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub external_key: String,
    pub name: String,
    /// Opaque reference handed to the blob store.
    pub blob_ref: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterRecord {
    pub id: Uuid,
    pub external_key: String,
    pub name: String,
    pub value: String,
    /// Opt-in gate: only parameters with this flag may be overridden by
    /// query-string values during model assembly.
    pub overwrite_from_url: bool,
    /// Set when the parameter is declared by a specific page; `None` for
    /// project-wide parameters.
    pub owner_page_key: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub external_key: String,
    pub name: String,
    pub default_language: String,
    pub supported_languages: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UriRecord {
    pub id: Uuid,
    pub external_key: String,
    pub uri_pattern: String,
    pub resource_type: UriResourceType,
    /// External key of the page or file this URI serves.
    pub resource_external_key: String,
    pub enabled: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A resolved entity from any namespace.
#[derive(Debug, Clone)]
pub enum Entity {
    Page(Arc<PageRecord>),
    File(Arc<FileRecord>),
    Parameter(Arc<ParameterRecord>),
    Project(Arc<ProjectRecord>),
    Uri(Arc<UriRecord>),
}

impl Entity {
    pub fn namespace(&self) -> Namespace {
        match self {
            Entity::Page(_) => Namespace::Pages,
            Entity::File(_) => Namespace::Files,
            Entity::Parameter(_) => Namespace::Parameters,
            Entity::Project(_) => Namespace::Projects,
            Entity::Uri(_) => Namespace::Uris,
        }
    }

    pub fn external_key(&self) -> &str {
        match self {
            Entity::Page(record) => &record.external_key,
            Entity::File(record) => &record.external_key,
            Entity::Parameter(record) => &record.external_key,
            Entity::Project(record) => &record.external_key,
            Entity::Uri(record) => &record.external_key,
        }
    }
}
