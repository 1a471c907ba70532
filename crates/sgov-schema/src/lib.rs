//! # sgov-schema — Tree Builder and Structural Validator
//!
//! Connects the attribute model in `sgov-core` to a program's typed data
//! structures. Types are never reflected over directly; they are described
//! by a [`TypeIntrospector`], of which [`TypeCatalog`] is the in-process
//! implementation.
//!
//! - [`SchemaBuilder`] derives an attribute tree, plus parent and child
//!   references, from a schema-defined type.
//! - [`SchemaValidator`] checks a type against a registered
//!   [`SchemaDetails`](sgov_core::SchemaDetails) and reports every
//!   [`Violation`] found, together with the set of types that must be
//!   validated against their own schemas.
//!
//! ## Validation Modes
//!
//! | Mode | Structure rule |
//! |---|---|
//! | `STRICT` | attribute names equal field names |
//! | `MATCHING` | attribute names are a subset of field names |
//!
//! Names compare case-insensitively in both modes. Value checks (element
//! types, nested objects, type arguments) are identical.
//!
//! ## Crate Policy
//!
//! - Depends on `sgov-core` only among `sgov-*` crates.
//! - No I/O and no global state. A validation call owns its
//!   [`ValidationContext`] and shares nothing with concurrent calls.
//! - No `.unwrap()` outside tests. Build failures are [`BuildError`];
//!   validation findings are data, never errors.

pub mod bindings;
pub mod builder;
pub mod catalog;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod fields;
pub mod validate;

pub use bindings::TypeBindings;
pub use builder::SchemaBuilder;
pub use catalog::{Described, TypeCatalog};
pub use context::{ValidationContext, ValidationResponse, Violation, ViolationKind};
pub use descriptor::{
    AnnotatedType, ClassDescriptor, ClassKind, FieldDescriptor, Markers, PrimitiveKind,
    SchemaDefinition, TypeIntrospector, TypeRef, TypeShape, UnknownTypeError,
};
pub use error::BuildError;
pub use validate::{SchemaValidator, SubtypeResolver};
