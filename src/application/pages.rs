//! Page content building.
//!
//! A non-template page is its stored markup, returned verbatim. A template
//! page builds a layered parameter model, lets its controller contribute,
//! and hands the model to the template engine. Render failures surface as
//! errors; partial output is never returned as success.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::application::controllers::ControllerRegistry;
use crate::application::error::AppError;
use crate::application::model::{ModelBuilder, PageModel, RequestContext};
use crate::cache::CacheInstances;
use crate::domain::entities::PageRecord;
use crate::domain::error::DomainError;
use crate::domain::types::Namespace;

const SOURCE: &str = "application::pages";

/// Propagated verbatim from the template engine collaborator.
#[derive(Debug, Error)]
#[error("template `{template}` failed to render: {message}")]
pub struct TemplateError {
    pub template: String,
    pub message: String,
}

impl TemplateError {
    pub fn new(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            message: message.into(),
        }
    }
}

/// Template engine collaborator; receives a fully assembled model.
#[async_trait]
pub trait TemplateEngine: Send + Sync {
    async fn render(&self, template: &str, model: &PageModel) -> Result<String, TemplateError>;
}

pub struct PageContentBuilder {
    caches: Arc<CacheInstances>,
    model_builder: Arc<dyn ModelBuilder>,
    controllers: Arc<ControllerRegistry>,
    engine: Arc<dyn TemplateEngine>,
}

impl PageContentBuilder {
    pub fn new(
        caches: Arc<CacheInstances>,
        model_builder: Arc<dyn ModelBuilder>,
        controllers: Arc<ControllerRegistry>,
        engine: Arc<dyn TemplateEngine>,
    ) -> Self {
        Self {
            caches,
            model_builder,
            controllers,
            engine,
        }
    }

    /// Resolve a page entity by external key through the cache.
    pub async fn find_page(&self, external_key: &str) -> Result<Arc<PageRecord>, AppError> {
        if external_key.trim().is_empty() {
            return Err(DomainError::validation("external key must not be empty").into());
        }
        match self.caches.page(external_key).await? {
            Some(page) => Ok(page),
            None => Err(DomainError::not_found(Namespace::Pages, external_key).into()),
        }
    }

    /// Build the final content for a resolved page.
    pub async fn build_content(
        &self,
        ctx: &RequestContext,
        page: &PageRecord,
    ) -> Result<String, AppError> {
        if !page.is_template_source {
            return Ok(page.html_source.clone());
        }

        let mut model = PageModel::new();
        self.model_builder.populate(ctx, page, &mut model).await?;

        if let Some(identifier) = page.controller.as_deref()
            && !identifier.is_empty()
        {
            let provider = self.controllers.resolve(identifier)?;
            provider.contribute(ctx, &mut model).await?;
        }

        let template = page.template();
        debug!(
            source = SOURCE,
            external_key = %page.external_key,
            template,
            "rendering template page"
        );
        let rendered = self.engine.render(template, &model).await?;
        Ok(rendered)
    }
}
