//! # sgov-registry — Registry Plumbing Around the Schema Engine
//!
//! Storage, distribution and startup checking for schemas produced by
//! `sgov-schema`. Nothing here participates in derivation or validation
//! itself; these are the collaborators a host service installs around the
//! engine.
//!
//! | Component | Role |
//! |---|---|
//! | [`SchemaRepository`] | storage seam; [`InMemorySchemaRepository`] backend |
//! | [`SchemaRefresher`] | periodically refreshed snapshot of a search |
//! | [`SchemaRetriever`] | lookups, cached per [`CacheConfig`] |
//! | [`StaticSchemaValidator`] | startup conformance check of schema-declared types |
//! | [`SchemaClient`] | approved-schema view plus conformance for a service |
//!
//! ## Crate Policy
//!
//! - Locks are `parking_lot` and never held across `.await`.
//! - Background work runs on the caller's tokio runtime; nothing here
//!   creates one.
//! - No `.unwrap()` outside tests.

pub mod client;
pub mod config;
pub mod error;
pub mod refresher;
pub mod repository;
pub mod retriever;
pub mod validator;

pub use client::SchemaClient;
pub use config::{CacheConfig, ConfigError};
pub use error::RegistryError;
pub use refresher::{SchemaRefresher, SchemaSupplier};
pub use repository::{InMemorySchemaRepository, SchemaRepository};
pub use retriever::{RequestContext, SchemaRetriever};
pub use validator::{SchemaConformance, StaticSchemaValidator};
