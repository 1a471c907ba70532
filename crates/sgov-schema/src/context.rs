//! # Validation Context
//!
//! Per-invocation bookkeeping for one structural validation: a stack of
//! the types being walked, the accumulated violations, and the set of types
//! deferred for validation against their own schemas.
//!
//! A context is created by a single top-level `validate` call and consumed
//! into a [`ValidationResponse`] at the end. It is never shared between
//! calls.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::TypeRef;

/// Classification of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    /// The field's type does not belong to the attribute's class family.
    TypeMismatch,
    /// An attribute has no same-named field.
    MissingField,
    /// A typed container or generic object was expected but the field is raw.
    MissingTypeArguments,
    /// The field's type shape cannot be checked.
    UnsupportedType,
    /// Type-argument count differs from the schema's recorded arity.
    ArityMismatch,
    /// STRICT name sets differ.
    StrictStructure,
    /// MATCHING attributes not all present as fields.
    MatchingStructure,
    /// A type that must carry a schema declaration does not.
    MissingSchemaDefinition,
    /// The introspector cannot describe a type.
    UnknownType,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
    /// Dotted attribute path, `None` for top-level structure findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Nearest enclosing type being walked when the finding was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_type: Option<TypeRef>,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
            root_type: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_root_type(mut self, root_type: TypeRef) -> Self {
        self.root_type = Some(root_type);
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(root) = &self.root_type {
            write!(f, "[{root}] ")?;
        }
        match &self.path {
            Some(path) => write!(f, "{path}: {}", self.message),
            None => write!(f, "(root): {}", self.message),
        }
    }
}

/// Result of one validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub violations: Vec<Violation>,
    /// Types discovered during the walk that must be validated against
    /// their own schemas by the caller.
    pub classes_to_validate: BTreeSet<TypeRef>,
}

impl ValidationResponse {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ValidationContext {
    type_path: Vec<TypeRef>,
    violations: Vec<Violation>,
    classes_to_validate: BTreeSet<TypeRef>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, type_ref: TypeRef) {
        self.type_path.push(type_ref);
    }

    pub fn exit(&mut self) -> Option<TypeRef> {
        self.type_path.pop()
    }

    /// Innermost type on the stack, `None` when the stack is empty.
    pub fn root_type(&self) -> Option<&TypeRef> {
        self.type_path.last()
    }

    /// Record a violation attributed to the innermost type on the stack.
    pub fn add_violation(&mut self, kind: ViolationKind, message: impl Into<String>, path: Option<&str>) {
        self.violations.push(Violation {
            kind,
            message: message.into(),
            path: path.map(str::to_string),
            root_type: self.root_type().cloned(),
        });
    }

    /// Queue a type for validation against its own schema. Returns `false`
    /// if it was already queued.
    pub fn defer(&mut self, type_ref: TypeRef) -> bool {
        self.classes_to_validate.insert(type_ref)
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn classes_to_validate(&self) -> &BTreeSet<TypeRef> {
        &self.classes_to_validate
    }

    pub fn into_response(self) -> ValidationResponse {
        ValidationResponse {
            violations: self.violations,
            classes_to_validate: self.classes_to_validate,
        }
    }
}
