//! Field enumeration over a class and its supertype chain.
//!
//! Inherited fields are appended after the class's own fields, most derived
//! first, with generic supertype arguments substituted. A field shadowed by
//! a more derived one of the same name (case-insensitive) is dropped.

use std::collections::{BTreeSet, HashSet};

use crate::bindings::TypeBindings;
use crate::descriptor::{
    ClassDescriptor, ClassKind, FieldDescriptor, TypeIntrospector, TypeShape, UnknownTypeError,
};

/// The declared supertype's descriptor, or `None` for the implicit root.
pub fn supertype_of<'i, I>(
    introspector: &'i I,
    class: &ClassDescriptor,
) -> Result<Option<&'i ClassDescriptor>, UnknownTypeError>
where
    I: TypeIntrospector + ?Sized,
{
    let Some(raw) = class.supertype.as_ref().and_then(|s| s.raw_type()) else {
        return Ok(None);
    };
    let parent = introspector.require(raw)?;
    Ok((parent.kind != ClassKind::Any).then_some(parent))
}

/// Own fields followed by every inherited field.
pub fn all_fields<I>(
    introspector: &I,
    class: &ClassDescriptor,
) -> Result<Vec<FieldDescriptor>, UnknownTypeError>
where
    I: TypeIntrospector + ?Sized,
{
    let mut fields = class.fields.clone();
    let mut seen: HashSet<String> = fields.iter().map(|f| f.name.to_ascii_uppercase()).collect();
    let mut visited = BTreeSet::from([class.name.clone()]);
    let mut bindings = TypeBindings::empty();
    let mut next = class.supertype.clone();

    while let Some(declared) = next {
        let supertype = bindings.resolve(&declared);
        let Some(raw) = supertype.raw_type() else {
            break;
        };
        if !visited.insert(raw.clone()) {
            break;
        }
        let parent = introspector.require(raw)?;
        if parent.kind == ClassKind::Any {
            break;
        }
        let arguments: &[_] = match &supertype.shape {
            TypeShape::Parameterized { arguments, .. } => arguments.as_slice(),
            _ => &[],
        };
        bindings = TypeBindings::bind(&parent.type_parameters, arguments);
        for field in &parent.fields {
            if seen.insert(field.name.to_ascii_uppercase()) {
                fields.push(FieldDescriptor::new(field.name.clone(), bindings.resolve(&field.ty)));
            }
        }
        next = parent.supertype.clone();
    }
    Ok(fields)
}

/// Fields a schema for `class` describes: own fields when the supertype
/// carries its own schema, otherwise the flattened inherited set.
pub fn schema_fields<I>(
    introspector: &I,
    class: &ClassDescriptor,
) -> Result<Vec<FieldDescriptor>, UnknownTypeError>
where
    I: TypeIntrospector + ?Sized,
{
    match supertype_of(introspector, class)? {
        Some(parent) if parent.is_schema_defined() => Ok(class.fields.clone()),
        _ => all_fields(introspector, class),
    }
}
