//! Application services over the cache layer: entity resolution, file
//! streaming, and page content building, with collaborator seams for the
//! blob store, template engine, model builder and controllers.

pub mod controllers;
pub mod error;
pub mod files;
pub mod model;
pub mod pages;
pub mod repos;
pub mod resolver;
