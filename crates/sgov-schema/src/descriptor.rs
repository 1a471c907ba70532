//! # Type Descriptors
//!
//! Language-neutral description of a program's typed data structures, as
//! seen by the tree builder and the structural validator. A descriptor is
//! supplied by an introspection adapter ([`TypeIntrospector`]); the engine
//! never reflects over live values.
//!
//! ## Shapes
//!
//! A field's declared type is an [`AnnotatedType`]: a [`TypeShape`] plus
//! type-use [`Markers`] (qualifiers, optionality, reference link).
//!
//! | Shape | Example |
//! |---|---|
//! | `Class` | `i32`, `String`, `Address` |
//! | `Parameterized` | `Vec<String>`, `Envelope<Payment>` |
//! | `Variable` | `T` inside `Envelope<T>` |
//! | `Array` | `[u8; 32]` |
//! | `Wildcard` | an unknown argument; never buildable |

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sgov_core::{
    AssignableClass, DataType, Qualifier, Qualifiers, SchemaKey, SchemaReference, SchemaType,
    SchemaValidationType,
};
use thiserror::Error;

use crate::catalog::Described;

/// Name of a type known to an introspector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TypeRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The introspector has no descriptor for a type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("type '{0}' is not known to the introspector")]
pub struct UnknownTypeError(pub TypeRef);

// -- Annotated types ----------------------------------------------------------

/// Type-use annotations attached to a field's declared type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    pub qualifiers: Qualifiers,
    pub optional: bool,
    /// The value is validated against the target type's own schema
    /// instead of inline.
    pub reference: bool,
}

impl Markers {
    /// Union of two marker sets; `self` wins on qualifier kind conflicts.
    pub fn merged(&self, other: &Markers) -> Markers {
        let mut qualifiers = self.qualifiers.clone();
        qualifiers.merge(&other.qualifiers);
        Markers {
            qualifiers,
            optional: self.optional || other.optional,
            reference: self.reference || other.reference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    Class(TypeRef),
    Parameterized {
        raw: TypeRef,
        arguments: Vec<AnnotatedType>,
    },
    Variable(String),
    Array(Box<AnnotatedType>),
    Wildcard,
}

/// A declared type together with its type-use markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedType {
    pub shape: TypeShape,
    pub markers: Markers,
}

impl AnnotatedType {
    pub fn new(shape: TypeShape) -> Self {
        Self {
            shape,
            markers: Markers::default(),
        }
    }

    pub fn class(name: impl Into<TypeRef>) -> Self {
        Self::new(TypeShape::Class(name.into()))
    }

    pub fn parameterized(raw: impl Into<TypeRef>, arguments: Vec<AnnotatedType>) -> Self {
        Self::new(TypeShape::Parameterized {
            raw: raw.into(),
            arguments,
        })
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(TypeShape::Variable(name.into()))
    }

    pub fn array(component: AnnotatedType) -> Self {
        Self::new(TypeShape::Array(Box::new(component)))
    }

    pub fn wildcard() -> Self {
        Self::new(TypeShape::Wildcard)
    }

    pub fn optional(mut self) -> Self {
        self.markers.optional = true;
        self
    }

    pub fn reference(mut self) -> Self {
        self.markers.reference = true;
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.markers.qualifiers.insert(qualifier);
        self
    }

    /// The class named by a `Class` or `Parameterized` shape.
    pub fn raw_type(&self) -> Option<&TypeRef> {
        match &self.shape {
            TypeShape::Class(t) | TypeShape::Parameterized { raw: t, .. } => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for AnnotatedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            TypeShape::Class(t) => write!(f, "{t}"),
            TypeShape::Parameterized { raw, arguments } => {
                write!(f, "{raw}<")?;
                for (i, a) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(">")
            }
            TypeShape::Variable(name) => f.write_str(name),
            TypeShape::Array(component) => write!(f, "[{component}]"),
            TypeShape::Wildcard => f.write_str("?"),
        }
    }
}

// -- Class descriptors --------------------------------------------------------

/// Scalar kinds an introspector can report.
///
/// Only `Bool`, `I8`/`U8`, `Char`, `I16`, `I32`, `I64`, `F32` and `F64`
/// have a [`DataType`] mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    U8,
    Char,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    I128,
    U128,
    Isize,
    Usize,
    F32,
    F64,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 16] = [
        Self::Bool,
        Self::I8,
        Self::U8,
        Self::Char,
        Self::I16,
        Self::U16,
        Self::I32,
        Self::U32,
        Self::I64,
        Self::U64,
        Self::I128,
        Self::U128,
        Self::Isize,
        Self::Usize,
        Self::F32,
        Self::F64,
    ];

    /// Rust spelling of the scalar, used as its catalog name.
    pub fn rust_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::Char => "char",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::I128 => "i128",
            Self::U128 => "u128",
            Self::Isize => "isize",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Bool => Some(DataType::Boolean),
            Self::I8 | Self::U8 => Some(DataType::Byte),
            Self::Char => Some(DataType::Char),
            Self::I16 => Some(DataType::Short),
            Self::I32 => Some(DataType::Integer),
            Self::I64 => Some(DataType::Long),
            Self::F32 => Some(DataType::Float),
            Self::F64 => Some(DataType::Double),
            _ => None,
        }
    }
}

/// What a class is, for assignability purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    Primitive(PrimitiveKind),
    String,
    Enum { values: BTreeSet<String> },
    /// Sequence or set container with one type parameter.
    Collection,
    /// Key/value container with two type parameters.
    Map,
    /// The implicit root type; holds anything.
    Any,
    /// A user structure with named fields.
    Struct,
}

impl ClassKind {
    /// Whether a class of this kind satisfies the given family.
    pub fn is_assignable_to(&self, class: AssignableClass) -> bool {
        use PrimitiveKind as P;
        match class {
            AssignableClass::Any => true,
            AssignableClass::Boolean => matches!(self, Self::Primitive(P::Bool)),
            AssignableClass::Byte => matches!(self, Self::Primitive(P::I8 | P::U8)),
            AssignableClass::Character => matches!(self, Self::Primitive(P::Char)),
            AssignableClass::Short => matches!(self, Self::Primitive(P::I16)),
            AssignableClass::Integer => matches!(self, Self::Primitive(P::I32)),
            AssignableClass::Long => matches!(self, Self::Primitive(P::I64)),
            AssignableClass::Float => matches!(self, Self::Primitive(P::F32)),
            AssignableClass::Double => matches!(self, Self::Primitive(P::F64)),
            AssignableClass::String => matches!(self, Self::String),
            AssignableClass::Enum => matches!(self, Self::Enum { .. }),
            AssignableClass::Collection => matches!(self, Self::Collection),
            AssignableClass::Map => matches!(self, Self::Map),
        }
    }
}

/// Schema declaration attached to a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefinition {
    pub org_id: String,
    pub namespace: String,
    pub tenant_id: String,
    pub name: String,
    pub version: u64,
    pub r#type: String,
    pub description: String,
    pub schema_type: SchemaType,
    pub validation: SchemaValidationType,
}

impl SchemaDefinition {
    /// Version 1, JSON payloads, MATCHING validation.
    pub fn new(
        org_id: impl Into<String>,
        namespace: impl Into<String>,
        tenant_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            namespace: namespace.into(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            version: 1,
            r#type: String::new(),
            description: String::new(),
            schema_type: SchemaType::default(),
            validation: SchemaValidationType::default(),
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn with_validation(mut self, validation: SchemaValidationType) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn reference(&self) -> SchemaReference {
        SchemaReference::new(
            self.org_id.clone(),
            self.namespace.clone(),
            self.tenant_id.clone(),
            self.name.clone(),
        )
        .with_type(self.r#type.clone())
    }

    pub fn schema_key(&self) -> SchemaKey {
        SchemaKey::new(
            self.org_id.clone(),
            self.namespace.clone(),
            self.tenant_id.clone(),
            self.name.clone(),
            self.version,
        )
        .with_type(self.r#type.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: AnnotatedType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: AnnotatedType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Everything the engine needs to know about one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub name: TypeRef,
    pub kind: ClassKind,
    /// Declared generic parameter names, in order.
    pub type_parameters: Vec<String>,
    /// Own declared fields, in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Declared supertype; `None` means the implicit root.
    pub supertype: Option<AnnotatedType>,
    pub is_abstract: bool,
    pub definition: Option<SchemaDefinition>,
    /// Class-level qualifiers, applied wherever the class is used.
    pub qualifiers: Qualifiers,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<TypeRef>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            type_parameters: Vec::new(),
            fields: Vec::new(),
            supertype: None,
            is_abstract: false,
            definition: None,
            qualifiers: Qualifiers::new(),
        }
    }

    pub fn structure(name: impl Into<TypeRef>) -> Self {
        Self::new(name, ClassKind::Struct)
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(kind.rust_name(), ClassKind::Primitive(kind))
    }

    pub fn enumeration<I, S>(name: impl Into<TypeRef>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            ClassKind::Enum {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn collection(name: impl Into<TypeRef>) -> Self {
        Self::new(name, ClassKind::Collection).with_type_parameters(["T"])
    }

    pub fn map(name: impl Into<TypeRef>) -> Self {
        Self::new(name, ClassKind::Map).with_type_parameters(["K", "V"])
    }

    pub fn with_type_parameters<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_parameters = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: AnnotatedType) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty));
        self
    }

    /// Add a field whose type is taken from a Rust type's [`Described`] impl.
    pub fn with_described_field<T: Described>(self, name: impl Into<String>) -> Self {
        self.with_field(name, T::annotated_type())
    }

    pub fn extends(mut self, supertype: AnnotatedType) -> Self {
        self.supertype = Some(supertype);
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_definition(mut self, definition: SchemaDefinition) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }

    pub fn is_schema_defined(&self) -> bool {
        self.definition.is_some()
    }
}

// -- Introspection ------------------------------------------------------------

/// Capability the engine calls to learn about types.
pub trait TypeIntrospector {
    /// Descriptor for a type, or `None` if the type is unknown.
    fn describe(&self, type_ref: &TypeRef) -> Option<&ClassDescriptor>;

    /// Currently known types whose declared supertype is `type_ref`.
    fn immediate_subtypes(&self, type_ref: &TypeRef) -> Vec<TypeRef>;

    /// Every known type carrying a schema declaration.
    fn schema_defined_types(&self) -> Vec<TypeRef>;

    /// [`describe`](Self::describe), failing with [`UnknownTypeError`].
    fn require(&self, type_ref: &TypeRef) -> Result<&ClassDescriptor, UnknownTypeError> {
        self.describe(type_ref)
            .ok_or_else(|| UnknownTypeError(type_ref.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Address;

    impl Described for Address {
        fn annotated_type() -> AnnotatedType {
            AnnotatedType::class("Address")
        }
    }

    #[test]
    fn test_described_fields() {
        let person = ClassDescriptor::structure("Person")
            .with_described_field::<Option<String>>("nickname")
            .with_described_field::<Vec<Address>>("addresses")
            .with_described_field::<HashMap<String, i64>>("scores");
        let shown: Vec<String> = person.fields.iter().map(|f| f.ty.to_string()).collect();
        assert_eq!(shown, vec!["String", "Vec<Address>", "HashMap<String, i64>"]);
        assert!(person.fields[0].ty.markers.optional);
    }

    #[test]
    fn test_primitive_mapping() {
        assert_eq!(PrimitiveKind::I32.data_type(), Some(DataType::Integer));
        assert_eq!(PrimitiveKind::U8.data_type(), Some(DataType::Byte));
        assert_eq!(PrimitiveKind::U32.data_type(), None);
        assert_eq!(PrimitiveKind::Usize.data_type(), None);
    }

    #[test]
    fn test_every_mapped_primitive_is_assignable_to_its_family() {
        for p in PrimitiveKind::ALL {
            if let Some(dt) = p.data_type() {
                assert!(ClassKind::Primitive(p).is_assignable_to(dt.assignable_class()));
            }
        }
    }

    #[test]
    fn test_families_are_exact() {
        let int = ClassKind::Primitive(PrimitiveKind::I32);
        assert!(int.is_assignable_to(AssignableClass::Integer));
        assert!(!int.is_assignable_to(AssignableClass::Long));
        assert!(int.is_assignable_to(AssignableClass::Any));
        assert!(!ClassKind::Any.is_assignable_to(AssignableClass::String));
    }

    #[test]
    fn test_markers_merge() {
        let a = Markers {
            qualifiers: Qualifiers::new().with(Qualifier::Pii),
            optional: false,
            reference: false,
        };
        let b = Markers {
            qualifiers: Qualifiers::new().with(Qualifier::Encrypted),
            optional: true,
            reference: false,
        };
        let m = a.merged(&b);
        assert_eq!(m.qualifiers.len(), 2);
        assert!(m.optional);
        assert!(!m.reference);
    }

    #[test]
    fn test_definition_identity() {
        let def = SchemaDefinition::new("acme", "payments", "t1", "Account").with_version(4);
        assert_eq!(def.reference().reference_id(), "ACME::PAYMENTS::T1::ACCOUNT");
        assert_eq!(def.schema_key().reference_id(), "ACME::PAYMENTS::T1::ACCOUNT::4");
    }

    #[test]
    fn test_display_shapes() {
        let ty = AnnotatedType::parameterized(
            "HashMap",
            vec![AnnotatedType::class("String"), AnnotatedType::variable("T")],
        );
        assert_eq!(ty.to_string(), "HashMap<String, T>");
        assert_eq!(AnnotatedType::array(AnnotatedType::class("u8")).to_string(), "[u8]");
    }
}
