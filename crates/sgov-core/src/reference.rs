//! # Schema Identity
//!
//! [`SchemaReference`] points at a schema by organization, namespace,
//! tenant and name. [`SchemaKey`] adds the version and is the externally
//! visible identity of a registered schema.
//!
//! Both compare, order and hash by their reference id: the identity fields
//! joined with [`KEY_DELIMITER`] and upper-cased. The `type` field travels
//! with the value but is not part of identity.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Separator used when joining identity fields into a reference id.
pub const KEY_DELIMITER: &str = "::";

fn join_upper(parts: &[&str]) -> String {
    parts.join(KEY_DELIMITER).to_uppercase()
}

/// Identity pointer to another schema.
///
/// Used for inheritance links (parent/child) and for explicit field-level
/// cross-schema links. Carries no handle to the referenced schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReference {
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub r#type: String,
}

impl SchemaReference {
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
            r#type: String::new(),
        }
    }

    pub fn with_type(mut self, r#type: impl Into<String>) -> Self {
        self.r#type = r#type.into();
        self
    }

    /// `ORG::NAMESPACE::TENANT::NAME`, upper-cased.
    pub fn reference_id(&self) -> String {
        join_upper(&[&self.org_id, &self.namespace, &self.tenant_id, &self.name])
    }
}

impl PartialEq for SchemaReference {
    fn eq(&self, other: &Self) -> bool {
        self.reference_id() == other.reference_id()
    }
}

impl Eq for SchemaReference {}

impl Hash for SchemaReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reference_id().hash(state);
    }
}

impl PartialOrd for SchemaReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.reference_id().cmp(&other.reference_id())
    }
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference_id())
    }
}

/// Versioned identity of a registered schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaKey {
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub tenant_id: String,
    pub schema_name: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub r#type: String,
}

impl SchemaKey {
    pub fn new(
        org_id: impl Into<String>,
        namespace: impl Into<String>,
        tenant_id: impl Into<String>,
        schema_name: impl Into<String>,
        version: u64,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            namespace: namespace.into(),
            tenant_id: tenant_id.into(),
            schema_name: schema_name.into(),
            version,
            r#type: String::new(),
        }
    }

    pub fn with_type(mut self, r#type: impl Into<String>) -> Self {
        self.r#type = r#type.into();
        self
    }

    /// `ORG::NAMESPACE::TENANT::NAME::VERSION`, upper-cased.
    pub fn reference_id(&self) -> String {
        let version = self.version.to_string();
        join_upper(&[
            &self.org_id,
            &self.namespace,
            &self.tenant_id,
            &self.schema_name,
            &version,
        ])
    }

    /// Version-less identity; equal to the matching reference's id.
    pub fn reference_tag(&self) -> String {
        join_upper(&[&self.org_id, &self.namespace, &self.tenant_id, &self.schema_name])
    }

    pub fn to_reference(&self) -> SchemaReference {
        SchemaReference::new(
            self.org_id.clone(),
            self.namespace.clone(),
            self.tenant_id.clone(),
            self.schema_name.clone(),
        )
        .with_type(self.r#type.clone())
    }
}

impl PartialEq for SchemaKey {
    fn eq(&self, other: &Self) -> bool {
        self.reference_id() == other.reference_id()
    }
}

impl Eq for SchemaKey {}

impl Hash for SchemaKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reference_id().hash(state);
    }
}

impl PartialOrd for SchemaKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.reference_id().cmp(&other.reference_id())
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reference_id_joined_and_upper_cased() {
        let r = SchemaReference::new("acme", "payments", "t1", "Account");
        assert_eq!(r.reference_id(), "ACME::PAYMENTS::T1::ACCOUNT");
    }

    #[test]
    fn test_reference_equality_ignores_case_and_type() {
        let a = SchemaReference::new("acme", "payments", "t1", "Account").with_type("json");
        let b = SchemaReference::new("ACME", "Payments", "T1", "account");
        assert_eq!(a, b);
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_key_includes_version() {
        let v1 = SchemaKey::new("acme", "payments", "t1", "Account", 1);
        let v2 = SchemaKey::new("acme", "payments", "t1", "Account", 2);
        assert_ne!(v1, v2);
        assert_eq!(v1.reference_id(), "ACME::PAYMENTS::T1::ACCOUNT::1");
        assert_eq!(v1.reference_tag(), v2.reference_tag());
        assert_eq!(v1.reference_tag(), v1.to_reference().reference_id());
    }

    #[test]
    fn test_empty_fields_still_join() {
        let r = SchemaReference::new("", "ns", "", "x");
        assert_eq!(r.reference_id(), "::NS::::X");
    }

    #[test]
    fn test_wire_names() {
        let key = SchemaKey::new("acme", "payments", "t1", "Account", 3).with_type("event");
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["orgId"], "acme");
        assert_eq!(json["schemaName"], "Account");
        assert_eq!(json["type"], "event");
        let back: SchemaKey = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);
        assert_eq!(back.r#type, "event");
    }
}
