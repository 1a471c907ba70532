//! # Type Catalog
//!
//! [`TypeCatalog`] is the in-memory [`TypeIntrospector`]: an explicit
//! registry of [`ClassDescriptor`]s, pre-loaded with the built-in scalar,
//! string and std container types. Adapters register user structures into
//! it, usually declaring fields from [`Described`] impls through
//! [`ClassDescriptor::with_described_field`].
//!
//! ## Built-ins
//!
//! | Name | Kind |
//! |---|---|
//! | `bool`, `i8` .. `f64`, `char` | primitive |
//! | `String` | string |
//! | `Any` | implicit root |
//! | `Vec`, `VecDeque`, `HashSet`, `BTreeSet` | collection `<T>` |
//! | `HashMap`, `BTreeMap` | map `<K, V>` |

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::descriptor::{
    AnnotatedType, ClassDescriptor, ClassKind, PrimitiveKind, TypeIntrospector, TypeRef,
};

/// Catalog name of the implicit root type.
pub const ANY: &str = "Any";

const COLLECTIONS: [&str; 4] = ["Vec", "VecDeque", "HashSet", "BTreeSet"];
const MAPS: [&str; 2] = ["HashMap", "BTreeMap"];

#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: BTreeMap<TypeRef, ClassDescriptor>,
}

impl TypeCatalog {
    /// A catalog holding only the built-in types.
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        for p in PrimitiveKind::ALL {
            catalog.register(ClassDescriptor::primitive(p));
        }
        catalog.register(ClassDescriptor::new("String", ClassKind::String));
        catalog.register(ClassDescriptor::new(ANY, ClassKind::Any));
        for name in COLLECTIONS {
            catalog.register(ClassDescriptor::collection(name));
        }
        for name in MAPS {
            catalog.register(ClassDescriptor::map(name));
        }
        catalog
    }

    /// A catalog with no types at all, not even built-ins.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a descriptor, replacing any previous one with the same name.
    pub fn register(&mut self, descriptor: ClassDescriptor) -> &mut Self {
        self.types.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, descriptor: ClassDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn contains(&self, type_ref: &TypeRef) -> bool {
        self.types.contains_key(type_ref)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Subtype lookup as a closure, for passing to the validator.
    pub fn subtype_resolver(&self) -> impl Fn(&TypeRef) -> Vec<TypeRef> + '_ {
        move |t| self.immediate_subtypes(t)
    }
}

impl TypeIntrospector for TypeCatalog {
    fn describe(&self, type_ref: &TypeRef) -> Option<&ClassDescriptor> {
        self.types.get(type_ref)
    }

    fn immediate_subtypes(&self, type_ref: &TypeRef) -> Vec<TypeRef> {
        self.types
            .values()
            .filter(|d| {
                d.supertype
                    .as_ref()
                    .and_then(AnnotatedType::raw_type)
                    .is_some_and(|s| s == type_ref)
            })
            .map(|d| d.name.clone())
            .collect()
    }

    fn schema_defined_types(&self) -> Vec<TypeRef> {
        self.types
            .values()
            .filter(|d| d.is_schema_defined())
            .map(|d| d.name.clone())
            .collect()
    }
}

// -- Described ----------------------------------------------------------------

/// Static description of a Rust type as a field type.
///
/// User structures implement this to name themselves in a catalog;
/// `Option<T>` marks the field optional and `Box<T>` is transparent.
pub trait Described {
    fn annotated_type() -> AnnotatedType;
}

macro_rules! described_class {
    ($($t:ty => $name:expr),* $(,)?) => {
        $(
            impl Described for $t {
                fn annotated_type() -> AnnotatedType {
                    AnnotatedType::class($name)
                }
            }
        )*
    };
}

described_class! {
    bool => "bool", i8 => "i8", u8 => "u8", char => "char",
    i16 => "i16", u16 => "u16", i32 => "i32", u32 => "u32",
    i64 => "i64", u64 => "u64", i128 => "i128", u128 => "u128",
    isize => "isize", usize => "usize", f32 => "f32", f64 => "f64",
    String => "String",
}

impl<T: Described> Described for Option<T> {
    fn annotated_type() -> AnnotatedType {
        T::annotated_type().optional()
    }
}

impl<T: Described> Described for Box<T> {
    fn annotated_type() -> AnnotatedType {
        T::annotated_type()
    }
}

impl<T: Described, const N: usize> Described for [T; N] {
    fn annotated_type() -> AnnotatedType {
        AnnotatedType::array(T::annotated_type())
    }
}

macro_rules! described_collection {
    ($($c:ident),*) => {
        $(
            impl<T: Described> Described for $c<T> {
                fn annotated_type() -> AnnotatedType {
                    AnnotatedType::parameterized(stringify!($c), vec![T::annotated_type()])
                }
            }
        )*
    };
}

described_collection!(Vec, VecDeque, HashSet, BTreeSet);

impl<K: Described, V: Described> Described for HashMap<K, V> {
    fn annotated_type() -> AnnotatedType {
        AnnotatedType::parameterized("HashMap", vec![K::annotated_type(), V::annotated_type()])
    }
}

impl<K: Described, V: Described> Described for BTreeMap<K, V> {
    fn annotated_type() -> AnnotatedType {
        AnnotatedType::parameterized("BTreeMap", vec![K::annotated_type(), V::annotated_type()])
    }
}
