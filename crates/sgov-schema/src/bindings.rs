//! # Type-Variable Bindings
//!
//! An immutable map from generic parameter name to the [`AnnotatedType`]
//! bound to it. A fresh binding set is created at every parameterized
//! boundary (a parameterized field, a generic supertype) and passed down
//! the recursion by reference; nothing mutates a binding set in place.
//!
//! Arguments are bound as given. Callers resolve them in the enclosing
//! scope first, so a variable left unbound there is never captured by a
//! same-named parameter of the inner scope.

use std::collections::BTreeMap;

use crate::descriptor::{AnnotatedType, TypeShape};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBindings {
    bindings: BTreeMap<String, AnnotatedType>,
}

impl TypeBindings {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind `parameters` positionally to already-resolved `arguments`.
    /// Extra parameters or arguments are left unbound.
    pub fn bind(parameters: &[String], arguments: &[AnnotatedType]) -> Self {
        let bindings = parameters
            .iter()
            .zip(arguments)
            .map(|(p, a)| (p.clone(), a.clone()))
            .collect();
        Self { bindings }
    }

    pub fn get(&self, parameter: &str) -> Option<&AnnotatedType> {
        self.bindings.get(parameter)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Substitute bound variables throughout `ty`.
    ///
    /// A substituted variable keeps the markers written at the use site
    /// and gains those of the bound argument.
    pub fn resolve(&self, ty: &AnnotatedType) -> AnnotatedType {
        if self.bindings.is_empty() {
            return ty.clone();
        }
        match &ty.shape {
            TypeShape::Variable(name) => match self.bindings.get(name) {
                Some(bound) => AnnotatedType {
                    shape: bound.shape.clone(),
                    markers: ty.markers.merged(&bound.markers),
                },
                None => ty.clone(),
            },
            TypeShape::Parameterized { raw, arguments } => AnnotatedType {
                shape: TypeShape::Parameterized {
                    raw: raw.clone(),
                    arguments: arguments.iter().map(|a| self.resolve(a)).collect(),
                },
                markers: ty.markers.clone(),
            },
            TypeShape::Array(component) => AnnotatedType {
                shape: TypeShape::Array(Box::new(self.resolve(component))),
                markers: ty.markers.clone(),
            },
            TypeShape::Class(_) | TypeShape::Wildcard => ty.clone(),
        }
    }
}
