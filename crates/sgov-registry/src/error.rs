//! Registry errors.

use sgov_core::ModelError;
use sgov_schema::{BuildError, TypeRef, Violation};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    /// No schema stored under the reference id.
    #[error("schema not found: {reference_id}")]
    NotFound { reference_id: String },

    /// A schema with the same reference id already exists.
    #[error("schema already exists: {reference_id}")]
    AlreadyExists { reference_id: String },

    /// Another version of the same schema is still awaiting review.
    #[error("schema {reference_id} cannot be created while {pending} is still CREATED")]
    PendingVersion { reference_id: String, pending: String },

    /// A schema-declared type has no registered schema to validate against.
    #[error("no schema found with key {reference_id} for type {type_ref}")]
    NoSchemaFound {
        reference_id: String,
        type_ref: TypeRef,
    },

    /// One or more schema-declared types failed conformance checking.
    #[error("found {} invalid schema(s): {}", .violations.len(), summarize(.violations))]
    InvalidSchemas {
        /// Findings per schema reference id.
        violations: Vec<(String, Vec<Violation>)>,
    },

    /// `start()` was called outside a tokio runtime.
    #[error("no tokio runtime available to run the schema refresher")]
    RuntimeUnavailable,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

fn summarize(violations: &[(String, Vec<Violation>)]) -> String {
    violations
        .iter()
        .map(|(key, found)| format!("{key} ({} violation(s))", found.len()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgov_schema::ViolationKind;

    #[test]
    fn test_invalid_schemas_message() {
        let err = RegistryError::InvalidSchemas {
            violations: vec![
                (
                    "A::B::C::D::1".to_string(),
                    vec![Violation::new(ViolationKind::MissingField, "x")],
                ),
                ("E::F::G::H::2".to_string(), vec![]),
            ],
        };
        assert_eq!(
            err.to_string(),
            "found 2 invalid schema(s): A::B::C::D::1 (1 violation(s)), E::F::G::H::2 (0 violation(s))"
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = RegistryError::NotFound {
            reference_id: "X".to_string(),
        };
        assert_eq!(err.to_string(), "schema not found: X");
    }

    #[test]
    fn test_model_errors_pass_through() {
        let err = RegistryError::from(ModelError::UnknownSchemaState("ARCHIVED".to_string()));
        assert_eq!(err.to_string(), "unknown schema state: ARCHIVED");
    }
}
