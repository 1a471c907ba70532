//! # Structural Validator
//!
//! Compares a registered attribute tree against an introspected type and
//! reports every disagreement as a [`Violation`]. The walk never stops at
//! the first finding; sibling attributes are always checked.
//!
//! ## Structure Check
//!
//! At every object level the attribute names are compared with the field
//! names, case-insensitively:
//!
//! - **STRICT**: the sets must be equal. Any difference is one aggregate
//!   violation naming what is missing on each side.
//! - **MATCHING**: every attribute needs a field. Extra fields pass.
//!
//! Each attribute without a field additionally yields a `MissingField`.
//!
//! ## Deferral
//!
//! REFERENCE attributes, known subtypes of a polymorphic schema, and the
//! supertype of a schema with a parent link are never walked inline. They
//! are returned in [`ValidationResponse::classes_to_validate`] for the
//! caller to check against their own schemas. This is what keeps
//! validation of cyclic type graphs finite.
//!
//! ## Generics
//!
//! Type variables are resolved through an immutable [`TypeBindings`] map,
//! rebuilt at every parameterized boundary. Each field type is resolved
//! once, in the scope that declares it. A variable still unbound after
//! resolution only matches a TYPE attribute.

use std::collections::BTreeSet;

use sgov_core::{AttributeKind, SchemaAttribute, SchemaDetails, SchemaValidationType};
use tracing::debug;

use crate::bindings::TypeBindings;
use crate::context::{ValidationContext, ValidationResponse, ViolationKind};
use crate::descriptor::{
    AnnotatedType, ClassDescriptor, ClassKind, FieldDescriptor, TypeIntrospector, TypeRef,
    TypeShape,
};
use crate::fields::{all_fields, schema_fields};

/// Discovers the known immediate subtypes of a type.
pub type SubtypeResolver<'r> = dyn Fn(&TypeRef) -> Vec<TypeRef> + 'r;

fn join_path(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}.{name}"),
        None => name.to_string(),
    }
}

fn mismatch(attribute: &SchemaAttribute, provided: impl std::fmt::Display) -> String {
    format!(
        "type mismatch, expected: {}, provided: {provided}",
        attribute.data_type()
    )
}

fn upper_names<'s>(names: impl Iterator<Item = &'s str>) -> BTreeSet<String> {
    names.map(str::to_ascii_uppercase).collect()
}

fn list(names: &[&String]) -> String {
    names
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct SchemaValidator<'a, I: ?Sized> {
    introspector: &'a I,
}

impl<'a, I: TypeIntrospector + ?Sized> SchemaValidator<'a, I> {
    pub fn new(introspector: &'a I) -> Self {
        Self { introspector }
    }

    /// Validate `root` against a registered schema.
    ///
    /// `subtype_resolver` is consulted only when the schema lists child
    /// references; every resolved subtype is deferred, not walked.
    pub fn validate(
        &self,
        details: &SchemaDetails,
        root: &TypeRef,
        subtype_resolver: Option<&SubtypeResolver<'_>>,
    ) -> ValidationResponse {
        let mut ctx = ValidationContext::new();
        let Some(class) = self.introspector.describe(root) else {
            ctx.add_violation(
                ViolationKind::UnknownType,
                format!("type {root} is not known to the introspector"),
                None,
            );
            return ctx.into_response();
        };

        if !details.child_references.is_empty() {
            if let Some(resolve) = subtype_resolver {
                for subtype in resolve(root) {
                    self.defer_schema_type(&mut ctx, subtype, None);
                }
            }
        }

        let fields = if let Some(parent_reference) = &details.parent_reference {
            match class.supertype.as_ref().and_then(AnnotatedType::raw_type) {
                Some(parent) => self.defer_schema_type(&mut ctx, parent.clone(), None),
                None => ctx.add_violation(
                    ViolationKind::MissingSchemaDefinition,
                    format!("missing schema definition on parent of {root}, schema extends {parent_reference}"),
                    None,
                ),
            }
            Ok(class.fields.clone())
        } else {
            all_fields(self.introspector, class)
        };

        match fields {
            Ok(fields) => self.validate_fields(
                &mut ctx,
                details.validation_type,
                &details.attributes,
                class,
                &fields,
                &TypeBindings::empty(),
                None,
            ),
            Err(e) => ctx.add_violation(ViolationKind::UnknownType, e.to_string(), None),
        }

        let response = ctx.into_response();
        debug!(
            schema = %details.schema_key,
            type_ref = %root,
            violations = response.violations.len(),
            deferred = response.classes_to_validate.len(),
            "validated type against schema"
        );
        response
    }

    /// Validate `type_ref` against a bare attribute set.
    pub fn validate_attributes(
        &self,
        validation_type: SchemaValidationType,
        attributes: &[SchemaAttribute],
        type_ref: &TypeRef,
    ) -> ValidationResponse {
        let mut ctx = ValidationContext::new();
        match self.introspector.describe(type_ref) {
            Some(class) => self.validate_struct(
                &mut ctx,
                validation_type,
                attributes,
                class,
                &TypeBindings::empty(),
                None,
            ),
            None => ctx.add_violation(
                ViolationKind::UnknownType,
                format!("type {type_ref} is not known to the introspector"),
                None,
            ),
        }
        ctx.into_response()
    }

    /// Whether a value of `type_ref` could populate `attribute`, judged on
    /// the top-level class only.
    pub fn is_assignable(&self, type_ref: &TypeRef, attribute: &SchemaAttribute) -> bool {
        self.introspector
            .describe(type_ref)
            .is_some_and(|class| matches_class(class, attribute))
    }

    // -- Object levels --------------------------------------------------------

    fn validate_struct(
        &self,
        ctx: &mut ValidationContext,
        validation_type: SchemaValidationType,
        attributes: &[SchemaAttribute],
        class: &ClassDescriptor,
        bindings: &TypeBindings,
        prefix: Option<&str>,
    ) {
        match schema_fields(self.introspector, class) {
            Ok(fields) => self.validate_fields(
                ctx,
                validation_type,
                attributes,
                class,
                &fields,
                bindings,
                prefix,
            ),
            Err(e) => ctx.add_violation(ViolationKind::UnknownType, e.to_string(), prefix),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn validate_fields(
        &self,
        ctx: &mut ValidationContext,
        validation_type: SchemaValidationType,
        attributes: &[SchemaAttribute],
        class: &ClassDescriptor,
        fields: &[FieldDescriptor],
        bindings: &TypeBindings,
        prefix: Option<&str>,
    ) {
        ctx.enter(class.name.clone());
        check_structure(ctx, validation_type, attributes, fields, prefix);

        for attribute in attributes {
            let path = join_path(prefix, &attribute.name);
            match fields.iter().find(|f| attribute.matches_name(&f.name)) {
                Some(field) => {
                    self.validate_type(ctx, validation_type, attribute, &field.ty, bindings, &path)
                }
                None => ctx.add_violation(
                    ViolationKind::MissingField,
                    format!("missing field for attribute {}", attribute.name),
                    Some(&path),
                ),
            }
        }
        ctx.exit();
    }

    // -- Per-attribute dispatch -----------------------------------------------

    fn validate_type(
        &self,
        ctx: &mut ValidationContext,
        validation_type: SchemaValidationType,
        attribute: &SchemaAttribute,
        ty: &AnnotatedType,
        bindings: &TypeBindings,
        path: &str,
    ) {
        self.validate_resolved(ctx, validation_type, attribute, &bindings.resolve(ty), path);
    }

    /// Dispatch on a type already substituted in its enclosing scope. Its
    /// components and arguments are never resolved again.
    fn validate_resolved(
        &self,
        ctx: &mut ValidationContext,
        validation_type: SchemaValidationType,
        attribute: &SchemaAttribute,
        ty: &AnnotatedType,
        path: &str,
    ) {
        if attribute.kind == AttributeKind::Type {
            return;
        }
        match &ty.shape {
            TypeShape::Class(type_ref) => {
                self.validate_class(ctx, validation_type, attribute, type_ref, path)
            }
            TypeShape::Parameterized { raw, arguments } => {
                self.validate_parameterized(ctx, validation_type, attribute, raw, arguments, path)
            }
            TypeShape::Variable(name) => ctx.add_violation(
                ViolationKind::TypeMismatch,
                mismatch(attribute, format!("type variable {name}")),
                Some(path),
            ),
            TypeShape::Array(component) => match &attribute.kind {
                AttributeKind::Array { element_attribute } => {
                    if let Some(element) = element_attribute {
                        self.validate_resolved(ctx, validation_type, element, component, path);
                    }
                }
                AttributeKind::Object {
                    nested_attributes: None,
                } => {}
                _ => ctx.add_violation(ViolationKind::TypeMismatch, mismatch(attribute, ty), Some(path)),
            },
            TypeShape::Wildcard => ctx.add_violation(
                ViolationKind::UnsupportedType,
                format!("unsupported type {ty} for attribute {}", attribute.name),
                Some(path),
            ),
        }
    }

    fn validate_class(
        &self,
        ctx: &mut ValidationContext,
        validation_type: SchemaValidationType,
        attribute: &SchemaAttribute,
        type_ref: &TypeRef,
        path: &str,
    ) {
        let Some(class) = self.introspector.describe(type_ref) else {
            ctx.add_violation(
                ViolationKind::UnknownType,
                format!("type {type_ref} is not known to the introspector"),
                Some(path),
            );
            return;
        };
        if !matches_class(class, attribute) {
            ctx.add_violation(ViolationKind::TypeMismatch, mismatch(attribute, type_ref), Some(path));
            return;
        }

        match &attribute.kind {
            AttributeKind::Array {
                element_attribute: Some(_),
            } => ctx.add_violation(
                ViolationKind::MissingTypeArguments,
                format!("missing type arguments on {type_ref}, expected an element type"),
                Some(path),
            ),
            AttributeKind::Map {
                key_attribute,
                value_attribute,
            } if key_attribute.is_some() || value_attribute.is_some() => ctx.add_violation(
                ViolationKind::MissingTypeArguments,
                format!("missing type arguments on {type_ref}, expected key and value types"),
                Some(path),
            ),
            AttributeKind::Object {
                nested_attributes: Some(nested),
            } => self.validate_struct(
                ctx,
                validation_type,
                nested,
                class,
                &TypeBindings::empty(),
                Some(path),
            ),
            AttributeKind::ParameterizedObject { .. } => ctx.add_violation(
                ViolationKind::MissingTypeArguments,
                format!("missing type arguments on {type_ref}, expected a parameterized type"),
                Some(path),
            ),
            AttributeKind::Reference { .. } => {
                self.defer_schema_type(ctx, type_ref.clone(), Some(path))
            }
            _ => {}
        }
    }

    fn validate_parameterized(
        &self,
        ctx: &mut ValidationContext,
        validation_type: SchemaValidationType,
        attribute: &SchemaAttribute,
        raw: &TypeRef,
        arguments: &[AnnotatedType],
        path: &str,
    ) {
        let Some(class) = self.introspector.describe(raw) else {
            ctx.add_violation(
                ViolationKind::UnknownType,
                format!("type {raw} is not known to the introspector"),
                Some(path),
            );
            return;
        };
        let provided = || {
            AnnotatedType::parameterized(raw.clone(), arguments.to_vec()).to_string()
        };

        match &attribute.kind {
            AttributeKind::Array { element_attribute } => {
                if class.kind != ClassKind::Collection {
                    ctx.add_violation(ViolationKind::TypeMismatch, mismatch(attribute, provided()), Some(path));
                    return;
                }
                if let (Some(element), Some(argument)) = (element_attribute, arguments.first()) {
                    self.validate_resolved(ctx, validation_type, element, argument, path);
                }
            }
            AttributeKind::Map {
                key_attribute,
                value_attribute,
            } => {
                if class.kind != ClassKind::Map {
                    ctx.add_violation(ViolationKind::TypeMismatch, mismatch(attribute, provided()), Some(path));
                    return;
                }
                if let (Some(key), Some(argument)) = (key_attribute, arguments.first()) {
                    self.validate_resolved(ctx, validation_type, key, argument, path);
                }
                if let (Some(value), Some(argument)) = (value_attribute, arguments.get(1)) {
                    self.validate_resolved(ctx, validation_type, value, argument, path);
                }
            }
            AttributeKind::Object { nested_attributes } => {
                let Some(nested) = nested_attributes else {
                    return;
                };
                if class.kind != ClassKind::Struct {
                    ctx.add_violation(ViolationKind::TypeMismatch, mismatch(attribute, provided()), Some(path));
                    return;
                }
                let scoped = TypeBindings::bind(&class.type_parameters, arguments);
                self.validate_struct(ctx, validation_type, nested, class, &scoped, Some(path));
            }
            AttributeKind::ParameterizedObject {
                raw_type_attribute,
                type_attributes,
            } => {
                if class.kind != ClassKind::Struct {
                    ctx.add_violation(ViolationKind::TypeMismatch, mismatch(attribute, provided()), Some(path));
                    return;
                }
                if type_attributes.len() != arguments.len() {
                    ctx.add_violation(
                        ViolationKind::ArityMismatch,
                        format!(
                            "type argument count mismatch on {raw}, expected: {}, provided: {}",
                            type_attributes.len(),
                            arguments.len()
                        ),
                        Some(path),
                    );
                }
                let scoped = TypeBindings::bind(&class.type_parameters, arguments);
                if let AttributeKind::Object {
                    nested_attributes: Some(nested),
                } = &raw_type_attribute.kind
                {
                    self.validate_struct(ctx, validation_type, nested, class, &scoped, Some(path));
                }
                for (i, (type_attribute, argument)) in
                    type_attributes.iter().zip(arguments).enumerate()
                {
                    let arg_path = format!("{path}<{i}>");
                    self.validate_resolved(ctx, validation_type, type_attribute, argument, &arg_path);
                }
            }
            AttributeKind::Reference { .. } => self.defer_schema_type(ctx, raw.clone(), Some(path)),
            AttributeKind::Type => {}
            AttributeKind::Boolean
            | AttributeKind::Byte
            | AttributeKind::Char
            | AttributeKind::Short
            | AttributeKind::Integer
            | AttributeKind::Long
            | AttributeKind::Float
            | AttributeKind::Double
            | AttributeKind::String
            | AttributeKind::Enum { .. } => {
                ctx.add_violation(ViolationKind::TypeMismatch, mismatch(attribute, provided()), Some(path))
            }
        }
    }

    fn defer_schema_type(&self, ctx: &mut ValidationContext, type_ref: TypeRef, path: Option<&str>) {
        match self.introspector.describe(&type_ref) {
            Some(class) if class.is_schema_defined() => {
                ctx.defer(type_ref);
            }
            Some(_) => ctx.add_violation(
                ViolationKind::MissingSchemaDefinition,
                format!("missing schema definition on {type_ref}"),
                path,
            ),
            None => ctx.add_violation(
                ViolationKind::UnknownType,
                format!("type {type_ref} is not known to the introspector"),
                path,
            ),
        }
    }
}

/// Top-level class compatibility of an attribute.
fn matches_class(class: &ClassDescriptor, attribute: &SchemaAttribute) -> bool {
    match &attribute.kind {
        AttributeKind::Object {
            nested_attributes: Some(_),
        }
        | AttributeKind::ParameterizedObject { .. } => class.kind == ClassKind::Struct,
        kind => class
            .kind
            .is_assignable_to(kind.data_type().assignable_class()),
    }
}

fn check_structure(
    ctx: &mut ValidationContext,
    validation_type: SchemaValidationType,
    attributes: &[SchemaAttribute],
    fields: &[FieldDescriptor],
    prefix: Option<&str>,
) {
    let field_names = upper_names(fields.iter().map(|f| f.name.as_str()));
    let attribute_names = upper_names(attributes.iter().map(|a| a.name.as_str()));
    let missing: Vec<&String> = attribute_names.difference(&field_names).collect();

    match validation_type {
        SchemaValidationType::Strict => {
            let extra: Vec<&String> = field_names.difference(&attribute_names).collect();
            if !missing.is_empty() || !extra.is_empty() {
                ctx.add_violation(
                    ViolationKind::StrictStructure,
                    format!(
                        "strict schema mismatch, attributes not found on type: [{}], fields not in schema: [{}]",
                        list(&missing),
                        list(&extra)
                    ),
                    prefix,
                );
            }
        }
        SchemaValidationType::Matching => {
            if !missing.is_empty() {
                ctx.add_violation(
                    ViolationKind::MatchingStructure,
                    format!("schema attributes not found on type: [{}]", list(&missing)),
                    prefix,
                );
            }
        }
    }
}
