//! # Build Errors
//!
//! Failures of the tree builder. Each one is terminal for the type being
//! built: the builder never fabricates a partial attribute for a field it
//! could not describe.

use thiserror::Error;

use crate::descriptor::{TypeRef, UnknownTypeError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A non-schema class sits below a schema-defined one in a supertype chain.
    #[error("schema definition missing on {missing} from path: {path}")]
    BrokenHierarchy {
        /// The class lacking a schema declaration.
        missing: TypeRef,
        /// Supertype chain walked so far, most derived first.
        path: String,
    },

    /// A reference-marked field points at a type without a schema declaration.
    #[error("referenced type {type_ref} has no schema definition")]
    MissingSchemaDefinition {
        /// The referenced type.
        type_ref: TypeRef,
    },

    /// A known subtype of a schema type carries no schema declaration.
    #[error("subtype {subtype} of {parent} is not schema defined")]
    SubtypeNotSchemaDefined {
        /// The undeclared subtype.
        subtype: TypeRef,
        /// The schema type it extends.
        parent: TypeRef,
    },

    /// A scalar field type has no data type mapping.
    #[error("unsupported primitive type: {type_ref}")]
    UnsupportedPrimitive {
        /// The scalar type.
        type_ref: TypeRef,
    },

    /// The introspector cannot describe a type the build needs.
    #[error(transparent)]
    UnknownType(#[from] UnknownTypeError),

    /// A type shape the attribute model cannot express.
    #[error("unsupported type {shape} for '{name}'")]
    UnsupportedType {
        /// Attribute or root name being built.
        name: String,
        /// Rendered shape.
        shape: String,
    },

    /// Inline nesting loops back to a type already being built.
    #[error("cyclic type graph without a reference link: {path}")]
    CyclicType {
        /// Types on the cycle, outermost first.
        path: String,
    },
}
