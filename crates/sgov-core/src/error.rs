//! # Error Types
//!
//! Errors raised while constructing or checking schema model values.
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.

use thiserror::Error;

use crate::details::SchemaState;

/// A schema model value violates one of its structural invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A qualifier carries an invalid payload (e.g. a zero ttl).
    #[error("invalid qualifier: {0}")]
    InvalidQualifier(String),

    /// An attribute tree node is malformed.
    #[error("invalid attribute '{name}': {reason}")]
    InvalidAttribute {
        /// Name of the offending attribute (empty if the name itself is missing).
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A data type name does not belong to the closed tag set.
    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    /// A schema state name is not recognized.
    #[error("unknown schema state: {0}")]
    UnknownSchemaState(String),

    /// The workflow does not allow moving a schema between these states.
    #[error("cannot move schema {reference_id} from {from} to {to}")]
    InvalidTransition {
        reference_id: String,
        from: SchemaState,
        to: SchemaState,
    },

    /// Only CREATED schemas accept updates.
    #[error("schema {reference_id} is {state} and can no longer be updated")]
    NotEditable {
        reference_id: String,
        state: SchemaState,
    },
}
