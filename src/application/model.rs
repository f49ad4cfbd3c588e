//! Layered page parameter model.
//!
//! A page's model is assembled in four steps with later layers winning:
//!
//! 1. parameters extracted from the matched URL path (`/news/{topic}`),
//! 2. parameters declared on the page itself,
//! 3. query-string values, applied only where the declared parameter opted
//!    in with `overwrite_from_url`,
//! 4. values contributed by the page's controller, nested under
//!    [`CONTROLLER_MODEL_KEY`].
//!
//! The opt-in gate lives inside [`PageModel`]; callers cannot bypass it by
//! calling the layers out of order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::application::error::AppError;
use crate::cache::CacheInstances;
use crate::domain::entities::{PageRecord, ParameterRecord};

/// Model key under which controller contributions are nested.
pub const CONTROLLER_MODEL_KEY: &str = "controller";

/// The slice of an incoming request that model assembly needs: matched path
/// parameters and parsed query pairs. Deliberately free of HTTP types.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageModel {
    values: Map<String, Value>,
    overridable: HashSet<String>,
}

impl PageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer 1: parameters produced by matching the URL path.
    pub fn apply_path_params(&mut self, params: &HashMap<String, String>) {
        for (name, value) in params {
            self.values
                .insert(name.clone(), Value::String(value.clone()));
        }
    }

    /// Layer 2: parameters declared on the page. Declaration also decides
    /// which names a query string may later override.
    pub fn apply_declared(&mut self, declared: &[ParameterRecord]) {
        for parameter in declared {
            self.values
                .insert(parameter.name.clone(), Value::String(parameter.value.clone()));
            if parameter.overwrite_from_url {
                self.overridable.insert(parameter.name.clone());
            } else {
                self.overridable.remove(&parameter.name);
            }
        }
    }

    /// Layer 3: query-string values, gated on the per-parameter opt-in flag.
    /// Unknown or non-overridable names are ignored.
    pub fn apply_query_overrides(&mut self, query: &HashMap<String, String>) {
        for (name, value) in query {
            if self.overridable.contains(name) {
                self.values
                    .insert(name.clone(), Value::String(value.clone()));
            }
        }
    }

    /// Layer 4: a controller-contributed value, nested under
    /// [`CONTROLLER_MODEL_KEY`].
    pub fn insert_controller_value(&mut self, name: impl Into<String>, value: Value) {
        let slot = self
            .values
            .entry(CONTROLLER_MODEL_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = slot {
            map.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

/// Assembles the layered model for a page. The page/file builders only see
/// this seam; embedders may substitute their own assembly.
#[async_trait]
pub trait ModelBuilder: Send + Sync {
    async fn populate(
        &self,
        ctx: &RequestContext,
        page: &PageRecord,
        model: &mut PageModel,
    ) -> Result<(), AppError>;
}

/// Default model builder: path parameters, then the page's declared
/// parameters from the cache, then opt-in query overrides. Controller
/// contributions are applied afterwards by the page builder.
pub struct LayeredModelBuilder {
    caches: Arc<CacheInstances>,
}

impl LayeredModelBuilder {
    pub fn new(caches: Arc<CacheInstances>) -> Self {
        Self { caches }
    }
}

#[async_trait]
impl ModelBuilder for LayeredModelBuilder {
    async fn populate(
        &self,
        ctx: &RequestContext,
        page: &PageRecord,
        model: &mut PageModel,
    ) -> Result<(), AppError> {
        model.apply_path_params(&ctx.path_params);
        let declared = self.caches.parameters_for_page(&page.external_key).await?;
        model.apply_declared(&declared);
        model.apply_query_overrides(&ctx.query_params);
        Ok(())
    }
}
