//! # Attribute Tree
//!
//! A schema's shape is a tree of [`SchemaAttribute`] nodes. Each node has a
//! name, an optionality flag, a qualifier set, and a kind-specific payload
//! ([`AttributeKind`]), one variant per [`DataType`].
//!
//! ## Wire Format
//!
//! Each node is a JSON object tagged by `type`:
//!
//! ```json
//! {"name": "tags", "optional": false, "qualifiers": [],
//!  "type": "ARRAY", "elementAttribute": {"name": "element", "optional": false,
//!                                        "qualifiers": [], "type": "STRING"}}
//! ```
//!
//! ## Absent Payloads
//!
//! An absent `elementAttribute`, `keyAttribute`, `valueAttribute` or
//! `nestedAttributes` means the container is intentionally untyped. Absence
//! never rejects a candidate type.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::qualifier::Qualifiers;
use crate::reference::SchemaReference;

// -- DataType -----------------------------------------------------------------

/// The closed tag set of attribute kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Boolean,
    Byte,
    Char,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Enum,
    Array,
    Map,
    Object,
    ParameterizedObject,
    Reference,
    /// Unbound generic placeholder.
    Type,
}

impl DataType {
    /// Every data type, in declaration order.
    pub const ALL: [DataType; 16] = [
        Self::Boolean,
        Self::Byte,
        Self::Char,
        Self::Short,
        Self::Integer,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::String,
        Self::Enum,
        Self::Array,
        Self::Map,
        Self::Object,
        Self::ParameterizedObject,
        Self::Reference,
        Self::Type,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Byte => "BYTE",
            Self::Char => "CHAR",
            Self::Short => "SHORT",
            Self::Integer => "INTEGER",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::String => "STRING",
            Self::Enum => "ENUM",
            Self::Array => "ARRAY",
            Self::Map => "MAP",
            Self::Object => "OBJECT",
            Self::ParameterizedObject => "PARAMETERIZED_OBJECT",
            Self::Reference => "REFERENCE",
            Self::Type => "TYPE",
        }
    }

    /// The class family a concrete type must belong to for this tag.
    pub fn assignable_class(&self) -> AssignableClass {
        match self {
            Self::Boolean => AssignableClass::Boolean,
            Self::Byte => AssignableClass::Byte,
            Self::Char => AssignableClass::Character,
            Self::Short => AssignableClass::Short,
            Self::Integer => AssignableClass::Integer,
            Self::Long => AssignableClass::Long,
            Self::Float => AssignableClass::Float,
            Self::Double => AssignableClass::Double,
            Self::String => AssignableClass::String,
            Self::Enum => AssignableClass::Enum,
            Self::Array => AssignableClass::Collection,
            Self::Map => AssignableClass::Map,
            Self::Object | Self::ParameterizedObject | Self::Reference | Self::Type => {
                AssignableClass::Any
            }
        }
    }

    /// True for the scalar tags BOOLEAN through STRING.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Byte
                | Self::Char
                | Self::Short
                | Self::Integer
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::String
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|dt| dt.as_str() == s)
            .copied()
            .ok_or_else(|| ModelError::UnknownDataType(s.to_string()))
    }
}

/// Assignability family of a data type.
///
/// Families are exact: an `i32`-like class satisfies `Integer` but not `Long`.
/// `Any` is satisfied by every class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignableClass {
    Boolean,
    Byte,
    Character,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Enum,
    Collection,
    Map,
    Any,
}

// -- SchemaAttribute ----------------------------------------------------------

/// One node of a schema's attribute tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAttribute {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub qualifiers: Qualifiers,
    #[serde(flatten)]
    pub kind: AttributeKind,
}

/// Kind-specific payload of an attribute, tagged by its [`DataType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeKind {
    Boolean,
    Byte,
    Char,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Enum {
        values: BTreeSet<String>,
    },
    #[serde(rename_all = "camelCase")]
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element_attribute: Option<Box<SchemaAttribute>>,
    },
    #[serde(rename_all = "camelCase")]
    Map {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_attribute: Option<Box<SchemaAttribute>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_attribute: Option<Box<SchemaAttribute>>,
    },
    #[serde(rename_all = "camelCase")]
    Object {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nested_attributes: Option<Vec<SchemaAttribute>>,
    },
    #[serde(rename_all = "camelCase")]
    ParameterizedObject {
        raw_type_attribute: Box<SchemaAttribute>,
        type_attributes: Vec<SchemaAttribute>,
    },
    Reference {
        reference: SchemaReference,
    },
    Type,
}

impl AttributeKind {
    /// Payload-free kind for a scalar data type, `None` for the others.
    pub fn primitive(data_type: DataType) -> Option<Self> {
        Some(match data_type {
            DataType::Boolean => Self::Boolean,
            DataType::Byte => Self::Byte,
            DataType::Char => Self::Char,
            DataType::Short => Self::Short,
            DataType::Integer => Self::Integer,
            DataType::Long => Self::Long,
            DataType::Float => Self::Float,
            DataType::Double => Self::Double,
            DataType::String => Self::String,
            _ => return None,
        })
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn array(element: Option<SchemaAttribute>) -> Self {
        Self::Array {
            element_attribute: element.map(Box::new),
        }
    }

    pub fn map(key: Option<SchemaAttribute>, value: Option<SchemaAttribute>) -> Self {
        Self::Map {
            key_attribute: key.map(Box::new),
            value_attribute: value.map(Box::new),
        }
    }

    pub fn object(nested: Option<Vec<SchemaAttribute>>) -> Self {
        Self::Object {
            nested_attributes: nested,
        }
    }

    pub fn parameterized(raw: SchemaAttribute, type_attributes: Vec<SchemaAttribute>) -> Self {
        Self::ParameterizedObject {
            raw_type_attribute: Box::new(raw),
            type_attributes,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean => DataType::Boolean,
            Self::Byte => DataType::Byte,
            Self::Char => DataType::Char,
            Self::Short => DataType::Short,
            Self::Integer => DataType::Integer,
            Self::Long => DataType::Long,
            Self::Float => DataType::Float,
            Self::Double => DataType::Double,
            Self::String => DataType::String,
            Self::Enum { .. } => DataType::Enum,
            Self::Array { .. } => DataType::Array,
            Self::Map { .. } => DataType::Map,
            Self::Object { .. } => DataType::Object,
            Self::ParameterizedObject { .. } => DataType::ParameterizedObject,
            Self::Reference { .. } => DataType::Reference,
            Self::Type => DataType::Type,
        }
    }
}

impl SchemaAttribute {
    /// A required, unqualified attribute.
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            optional: false,
            qualifiers: Qualifiers::new(),
            kind,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn data_type(&self) -> DataType {
        self.kind.data_type()
    }

    /// Structural name match, ASCII case-insensitive.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Check the tree rooted at this node for structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidAttribute`] for an empty name, a
    /// parameterized object whose raw attribute is not an OBJECT, or
    /// duplicate nested names; [`ModelError::InvalidQualifier`] for a
    /// malformed qualifier anywhere in the tree.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.is_empty() {
            return Err(ModelError::InvalidAttribute {
                name: String::new(),
                reason: format!("{} attribute has an empty name", self.data_type()),
            });
        }
        self.qualifiers.validate()?;
        match &self.kind {
            AttributeKind::Array { element_attribute } => {
                if let Some(e) = element_attribute {
                    e.validate()?;
                }
            }
            AttributeKind::Map {
                key_attribute,
                value_attribute,
            } => {
                for a in [key_attribute, value_attribute].into_iter().flatten() {
                    a.validate()?;
                }
            }
            AttributeKind::Object {
                nested_attributes: Some(nested),
            } => validate_attribute_set(nested)?,
            AttributeKind::ParameterizedObject {
                raw_type_attribute,
                type_attributes,
            } => {
                if raw_type_attribute.data_type() != DataType::Object {
                    return Err(ModelError::InvalidAttribute {
                        name: self.name.clone(),
                        reason: format!(
                            "raw type attribute must be OBJECT, found {}",
                            raw_type_attribute.data_type()
                        ),
                    });
                }
                raw_type_attribute.validate()?;
                for a in type_attributes {
                    a.validate()?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Check a sibling attribute collection: every node valid, names unique
/// under case-insensitive comparison.
pub fn validate_attribute_set(attributes: &[SchemaAttribute]) -> Result<(), ModelError> {
    let mut seen = HashSet::new();
    for attr in attributes {
        attr.validate()?;
        if !seen.insert(attr.name.to_ascii_uppercase()) {
            return Err(ModelError::InvalidAttribute {
                name: attr.name.clone(),
                reason: "duplicate attribute name".to_string(),
            });
        }
    }
    Ok(())
}

impl fmt::Display for SchemaAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.data_type(), self.name)?;
        if self.optional {
            f.write_str(", optional")?;
        }
        if !self.qualifiers.is_empty() {
            write!(f, ", {}", self.qualifiers)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::Qualifier;
    use serde_json::json;

    fn string(name: &str) -> SchemaAttribute {
        SchemaAttribute::new(name, AttributeKind::String)
    }

    #[test]
    fn test_data_type_names_round_trip() {
        for dt in DataType::ALL {
            assert_eq!(dt.as_str().parse::<DataType>().unwrap(), dt);
            let json = serde_json::to_value(dt).unwrap();
            assert_eq!(json, json!(dt.as_str()));
        }
        assert!("VOID".parse::<DataType>().is_err());
    }

    #[test]
    fn test_assignable_classes() {
        assert_eq!(DataType::Integer.assignable_class(), AssignableClass::Integer);
        assert_eq!(DataType::Long.assignable_class(), AssignableClass::Long);
        assert_eq!(DataType::Array.assignable_class(), AssignableClass::Collection);
        assert_eq!(DataType::Type.assignable_class(), AssignableClass::Any);
    }

    #[test]
    fn test_kind_matches_data_type() {
        for dt in DataType::ALL.iter().filter(|d| d.is_primitive()) {
            assert_eq!(AttributeKind::primitive(*dt).unwrap().data_type(), *dt);
        }
        assert!(AttributeKind::primitive(DataType::Object).is_none());
    }

    #[test]
    fn test_primitive_wire_format() {
        let attr = SchemaAttribute::new("accountNumber", AttributeKind::String)
            .with_qualifiers(Qualifiers::new().with(Qualifier::Pii));
        let json = serde_json::to_value(&attr).unwrap();
        assert_eq!(
            json,
            json!({
                "name": "accountNumber",
                "optional": false,
                "qualifiers": [{"type": "PII"}],
                "type": "STRING"
            })
        );
    }

    #[test]
    fn test_nested_wire_format_round_trip() {
        let attr = SchemaAttribute::new(
            "wrapper",
            AttributeKind::parameterized(
                SchemaAttribute::new(
                    "wrapper",
                    AttributeKind::object(Some(vec![SchemaAttribute::new(
                        "value",
                        AttributeKind::Type,
                    )])),
                ),
                vec![SchemaAttribute::new(
                    "type",
                    AttributeKind::map(Some(string("key")), None),
                )],
            ),
        )
        .optional(true);

        let json = serde_json::to_value(&attr).unwrap();
        assert_eq!(json["type"], "PARAMETERIZED_OBJECT");
        assert_eq!(json["rawTypeAttribute"]["type"], "OBJECT");
        assert_eq!(json["typeAttributes"][0]["keyAttribute"]["type"], "STRING");
        assert!(json["typeAttributes"][0].get("valueAttribute").is_none());

        let back: SchemaAttribute = serde_json::from_value(json).unwrap();
        assert_eq!(back, attr);
    }

    #[test]
    fn test_absent_payloads_deserialize() {
        let attr: SchemaAttribute =
            serde_json::from_value(json!({"name": "items", "type": "ARRAY"})).unwrap();
        assert_eq!(attr.kind, AttributeKind::array(None));
        assert!(!attr.optional);
        assert!(attr.qualifiers.is_empty());
    }

    #[test]
    fn test_enum_values() {
        let attr: SchemaAttribute = serde_json::from_value(json!({
            "name": "level", "type": "ENUM", "values": ["TWO", "ONE"]
        }))
        .unwrap();
        assert_eq!(attr.kind, AttributeKind::enumeration(["ONE", "TWO"]));
    }

    #[test]
    fn test_matches_name_case_insensitive() {
        assert!(string("accountNumber").matches_name("ACCOUNTNUMBER"));
        assert!(!string("accountNumber").matches_name("account"));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        assert!(string("").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_object_raw_type() {
        let attr = SchemaAttribute::new(
            "w",
            AttributeKind::parameterized(string("w"), vec![]),
        );
        assert!(matches!(
            attr.validate(),
            Err(ModelError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let attrs = vec![string("id"), string("ID")];
        assert!(validate_attribute_set(&attrs).is_err());
        let nested = SchemaAttribute::new("o", AttributeKind::object(Some(attrs)));
        assert!(nested.validate().is_err());
    }

    #[test]
    fn test_display() {
        let attr = string("name").optional(true);
        assert_eq!(attr.to_string(), "STRING(name, optional)");
    }
}
