//! # sgov-core — Schema Model for the Governance Engine
//!
//! This crate defines the portable structural description ("schema") that
//! producers and consumers of a message agree on. It is pure data: no
//! introspection, no validation walk, no I/O. `sgov-schema` derives and
//! checks these trees; `sgov-registry` stores and distributes them.
//!
//! ## Key Design Principles
//!
//! 1. **Closed attribute sum type.** [`AttributeKind`] has one variant per
//!    [`DataType`]. Every consumer matches exhaustively, so a new data type
//!    forces the builder and validator to be updated.
//!
//! 2. **Identity by reference id.** [`SchemaReference`] and [`SchemaKey`]
//!    compare and hash by their upper-cased, delimiter-joined reference id.
//!    A reference is a pure value resolved by lookup, never an owned link.
//!
//! 3. **Qualifiers are a set keyed by kind.** At most one `PII`, one
//!    `ENCRYPTED` and one `SHORT_LIVED` per attribute, and `SHORT_LIVED`
//!    always carries a positive ttl.
//!
//! 4. **Guarded history.** [`SchemaDetails::add_history`] appends through a
//!    shared reference under an exclusive lock.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sgov-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - JSON wire names are camelCase; attributes and qualifiers are tagged by `type`.

pub mod attribute;
pub mod details;
pub mod error;
pub mod qualifier;
pub mod reference;
pub mod search;

// Re-export primary types for ergonomic imports.
pub use attribute::{AssignableClass, AttributeKind, DataType, SchemaAttribute};
pub use details::{
    AttributeTransformer, CreateSchemaRequest, SchemaDetails, SchemaEvent, SchemaHistory,
    SchemaHistoryItem, SchemaState, SchemaType, SchemaValidationType, TransformationTarget,
    UpdateSchemaRequest,
};
pub use error::ModelError;
pub use qualifier::{Qualifier, QualifierType, Qualifiers};
pub use reference::{SchemaKey, SchemaReference, KEY_DELIMITER};
pub use search::SearchRequest;
