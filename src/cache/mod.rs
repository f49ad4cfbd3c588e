//! Mortar cache layer.
//!
//! Per-namespace read-through caches with strict per-key single-flight
//! population. Entities come back as shared immutable snapshots; staleness is
//! bounded by explicit invalidation from the write path (there is no
//! time-based expiry).
//!
//! Per-namespace behavior is controlled via `mortar.toml`:
//!
//! ```toml
//! [cache]
//! enable_pages = true
//! enable_files = true
//! # ... see config for all flags
//! ```

mod instances;
mod lock;
mod store;

pub use instances::CacheInstances;
pub use store::{EntityCache, LoadFuture};
