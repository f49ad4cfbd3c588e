//! Mortar: the in-process content-delivery core of a CMS.
//!
//! Mortar resolves external identifiers (URL slugs, file keys, parameter
//! names) to CMS entities through a read-through cache with strict per-key
//! single-flight population, and drives the two consumers of resolved
//! entities:
//!
//! - **File delivery**: buffered streaming of a resolved file's blob into an
//!   async sink.
//! - **Page building**: returning stored markup verbatim for plain pages, or
//!   assembling a layered parameter model (path segments → declared
//!   parameters → opt-in query overrides → controller contributions) and
//!   handing it to the template engine for template pages.
//!
//! The backing stores, blob store, template engine and page controllers are
//! collaborator traits; Mortar owns no wire protocol or on-disk format.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
