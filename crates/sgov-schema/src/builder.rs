//! # Tree Builder
//!
//! Derives a schema attribute tree from an introspected type.
//!
//! ## Field Selection
//!
//! A class whose supertype carries its own schema contributes only its own
//! fields; the parent's fields belong to the parent's schema. Otherwise the
//! whole inherited field set is flattened in. Before either, the supertype
//! chain is checked: a class without a schema declaration may not sit below
//! a schema-defined ancestor ([`BuildError::BrokenHierarchy`]).
//!
//! ## Dispatch
//!
//! | Field type | Attribute |
//! |---|---|
//! | reference-marked | `REFERENCE` to the target's schema |
//! | scalar / `String` | primitive tag |
//! | enum | `ENUM` with every literal |
//! | `[T; N]`, `Vec<T>` .. | `ARRAY` with built `element` |
//! | raw collection | `ARRAY`, element absent |
//! | `HashMap<K, V>` .. | `MAP` with built `key` and `value` |
//! | raw map | `MAP`, key and value absent |
//! | type variable | `TYPE` |
//! | generic struct with arguments | `PARAMETERIZED_OBJECT` |
//! | `Any` | opaque `OBJECT` |
//! | struct | `OBJECT` with nested attributes, built inline |
//!
//! Inline nesting that returns to a type already on the build stack is a
//! [`BuildError::CyclicType`]; only reference links may close a cycle.

use std::collections::BTreeSet;

use sgov_core::{AttributeKind, CreateSchemaRequest, Qualifiers, SchemaAttribute, SchemaReference};
use tracing::{debug, info};

use crate::descriptor::{
    AnnotatedType, ClassDescriptor, ClassKind, SchemaDefinition, TypeIntrospector, TypeRef,
    TypeShape,
};
use crate::error::BuildError;
use crate::fields::{schema_fields, supertype_of};

/// Attribute name given to a container's element.
pub const ELEMENT: &str = "element";
/// Attribute name given to a map's key.
pub const KEY: &str = "key";
/// Attribute name given to a map's value.
pub const VALUE: &str = "value";
/// Attribute name given to each bound type argument.
pub const TYPE_ARGUMENT: &str = "type";

/// Builds attribute trees and reference metadata from a [`TypeIntrospector`].
///
/// Stateless apart from the borrowed introspector; concurrent builds of
/// distinct types are independent.
pub struct SchemaBuilder<'a, I: ?Sized> {
    introspector: &'a I,
}

impl<'a, I: TypeIntrospector + ?Sized> SchemaBuilder<'a, I> {
    pub fn new(introspector: &'a I) -> Self {
        Self { introspector }
    }

    /// Root attribute set describing `type_ref`.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`]; the first failing field aborts the build.
    pub fn build_schema_attributes(
        &self,
        type_ref: &TypeRef,
    ) -> Result<Vec<SchemaAttribute>, BuildError> {
        let class = self.introspector.require(type_ref)?;
        if class.kind != ClassKind::Struct {
            return Err(BuildError::UnsupportedType {
                name: type_ref.to_string(),
                shape: format!("{:?}", class.kind),
            });
        }
        let mut stack = vec![type_ref.clone()];
        let attributes = self.build_fields(class, &mut stack)?;
        debug!(type_ref = %type_ref, attributes = attributes.len(), "built schema attributes");
        Ok(attributes)
    }

    /// Identity of the type's own schema, if it declares one.
    pub fn build_schema_reference(&self, type_ref: &TypeRef) -> Option<SchemaReference> {
        self.introspector
            .describe(type_ref)
            .and_then(|c| c.definition.as_ref())
            .map(SchemaDefinition::reference)
    }

    /// Identity of the nearest schema-declared ancestor.
    ///
    /// With a valid hierarchy that ancestor can only be the immediate
    /// supertype, so the chain is checked before the lookup.
    pub fn parent_reference(
        &self,
        type_ref: &TypeRef,
    ) -> Result<Option<SchemaReference>, BuildError> {
        let class = self.introspector.require(type_ref)?;
        self.check_hierarchy(class)?;
        Ok(supertype_of(self.introspector, class)?
            .and_then(|p| p.definition.as_ref())
            .map(SchemaDefinition::reference))
    }

    /// Identities of every known immediate subtype.
    ///
    /// # Errors
    ///
    /// [`BuildError::SubtypeNotSchemaDefined`] for the first subtype without
    /// a schema declaration.
    pub fn child_references(&self, type_ref: &TypeRef) -> Result<Vec<SchemaReference>, BuildError> {
        self.introspector
            .immediate_subtypes(type_ref)
            .into_iter()
            .map(|subtype| {
                let class = self.introspector.require(&subtype)?;
                class
                    .definition
                    .as_ref()
                    .map(SchemaDefinition::reference)
                    .ok_or_else(|| BuildError::SubtypeNotSchemaDefined {
                        subtype,
                        parent: type_ref.clone(),
                    })
            })
            .collect()
    }

    /// Registration payload for a schema-declared type; `None` when the
    /// type declares no schema.
    pub fn build_schema_request(
        &self,
        type_ref: &TypeRef,
    ) -> Result<Option<CreateSchemaRequest>, BuildError> {
        let class = self.introspector.require(type_ref)?;
        let Some(definition) = &class.definition else {
            return Ok(None);
        };
        let request = CreateSchemaRequest {
            schema_key: definition.schema_key(),
            description: definition.description.clone(),
            schema_type: definition.schema_type,
            validation_type: definition.validation,
            parent_reference: self.parent_reference(type_ref)?,
            child_references: self.child_references(type_ref)?,
            attributes: self.build_schema_attributes(type_ref)?,
            transformation_targets: Vec::new(),
            tags: BTreeSet::new(),
        };
        info!(schema = %request.schema_key, "built schema request");
        Ok(Some(request))
    }

    // -- Hierarchy ------------------------------------------------------------

    fn check_hierarchy(&self, class: &ClassDescriptor) -> Result<(), BuildError> {
        let mut path = vec![class.name.to_string()];
        let mut visited = BTreeSet::from([class.name.clone()]);
        let mut gap: Option<TypeRef> = None;
        let mut current = supertype_of(self.introspector, class)?;

        while let Some(parent) = current {
            if !visited.insert(parent.name.clone()) {
                break;
            }
            path.push(parent.name.to_string());
            if parent.is_schema_defined() {
                if let Some(missing) = gap {
                    return Err(BuildError::BrokenHierarchy {
                        missing,
                        path: path.join(" -> "),
                    });
                }
            } else if gap.is_none() {
                gap = Some(parent.name.clone());
            }
            current = supertype_of(self.introspector, parent)?;
        }
        Ok(())
    }

    // -- Attributes -----------------------------------------------------------

    fn build_fields(
        &self,
        class: &ClassDescriptor,
        stack: &mut Vec<TypeRef>,
    ) -> Result<Vec<SchemaAttribute>, BuildError> {
        self.check_hierarchy(class)?;
        schema_fields(self.introspector, class)?
            .iter()
            .map(|field| self.build_attribute(&field.name, &field.ty, stack))
            .collect()
    }

    fn build_attribute(
        &self,
        name: &str,
        ty: &AnnotatedType,
        stack: &mut Vec<TypeRef>,
    ) -> Result<SchemaAttribute, BuildError> {
        let optional = ty.markers.optional;
        let mut qualifiers = ty.markers.qualifiers.clone();

        let kind = if ty.markers.reference {
            self.reference_kind(name, ty)?
        } else {
            match &ty.shape {
                TypeShape::Variable(_) => AttributeKind::Type,
                TypeShape::Wildcard => {
                    return Err(BuildError::UnsupportedType {
                        name: name.to_string(),
                        shape: ty.to_string(),
                    })
                }
                TypeShape::Array(component) => {
                    AttributeKind::array(Some(self.build_attribute(ELEMENT, component, stack)?))
                }
                TypeShape::Class(type_ref) => {
                    let class = self.introspector.require(type_ref)?;
                    qualifiers.merge(&class.qualifiers);
                    self.class_kind(class, stack)?
                }
                TypeShape::Parameterized { raw, arguments } => {
                    let class = self.introspector.require(raw)?;
                    qualifiers.merge(&class.qualifiers);
                    self.parameterized_kind(name, optional, &qualifiers, class, arguments, stack)?
                }
            }
        };

        Ok(SchemaAttribute {
            name: name.to_string(),
            optional,
            qualifiers,
            kind,
        })
    }

    fn reference_kind(&self, name: &str, ty: &AnnotatedType) -> Result<AttributeKind, BuildError> {
        let target = ty.raw_type().ok_or_else(|| BuildError::UnsupportedType {
            name: name.to_string(),
            shape: ty.to_string(),
        })?;
        let class = self.introspector.require(target)?;
        let definition =
            class
                .definition
                .as_ref()
                .ok_or_else(|| BuildError::MissingSchemaDefinition {
                    type_ref: target.clone(),
                })?;
        Ok(AttributeKind::Reference {
            reference: definition.reference(),
        })
    }

    fn class_kind(
        &self,
        class: &ClassDescriptor,
        stack: &mut Vec<TypeRef>,
    ) -> Result<AttributeKind, BuildError> {
        match &class.kind {
            ClassKind::Primitive(p) => p
                .data_type()
                .and_then(AttributeKind::primitive)
                .ok_or_else(|| BuildError::UnsupportedPrimitive {
                    type_ref: class.name.clone(),
                }),
            ClassKind::String => Ok(AttributeKind::String),
            ClassKind::Enum { values } => Ok(AttributeKind::Enum {
                values: values.clone(),
            }),
            ClassKind::Collection => Ok(AttributeKind::array(None)),
            ClassKind::Map => Ok(AttributeKind::map(None, None)),
            ClassKind::Any => Ok(AttributeKind::object(None)),
            ClassKind::Struct => Ok(AttributeKind::object(Some(self.nested(class, stack)?))),
        }
    }

    fn parameterized_kind(
        &self,
        name: &str,
        optional: bool,
        qualifiers: &Qualifiers,
        class: &ClassDescriptor,
        arguments: &[AnnotatedType],
        stack: &mut Vec<TypeRef>,
    ) -> Result<AttributeKind, BuildError> {
        match &class.kind {
            ClassKind::Collection => {
                let element = arguments
                    .first()
                    .map(|a| self.build_attribute(ELEMENT, a, stack))
                    .transpose()?;
                Ok(AttributeKind::array(element))
            }
            ClassKind::Map => {
                let key = arguments
                    .first()
                    .map(|a| self.build_attribute(KEY, a, stack))
                    .transpose()?;
                let value = arguments
                    .get(1)
                    .map(|a| self.build_attribute(VALUE, a, stack))
                    .transpose()?;
                Ok(AttributeKind::map(key, value))
            }
            ClassKind::Struct => {
                let raw = SchemaAttribute {
                    name: name.to_string(),
                    optional,
                    qualifiers: qualifiers.clone(),
                    kind: AttributeKind::object(Some(self.nested(class, stack)?)),
                };
                let type_attributes = arguments
                    .iter()
                    .map(|a| self.build_attribute(TYPE_ARGUMENT, a, stack))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AttributeKind::parameterized(raw, type_attributes))
            }
            other => Err(BuildError::UnsupportedType {
                name: name.to_string(),
                shape: format!("{other:?} with type arguments"),
            }),
        }
    }

    fn nested(
        &self,
        class: &ClassDescriptor,
        stack: &mut Vec<TypeRef>,
    ) -> Result<Vec<SchemaAttribute>, BuildError> {
        if stack.contains(&class.name) {
            let mut path: Vec<String> = stack.iter().map(ToString::to_string).collect();
            path.push(class.name.to_string());
            return Err(BuildError::CyclicType {
                path: path.join(" -> "),
            });
        }
        stack.push(class.name.clone());
        let result = self.build_fields(class, stack);
        stack.pop();
        result
    }
}
