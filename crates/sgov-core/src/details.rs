//! # Registered Schema Details
//!
//! [`SchemaDetails`] is the full registered schema: identity, lifecycle
//! state, validation mode, inheritance links, the root attribute set,
//! transformation targets, history and tags.
//!
//! The registration workflow creates details from a [`CreateSchemaRequest`],
//! revises them with an [`UpdateSchemaRequest`] while they are still
//! CREATED, and finally approves or rejects them. The governance core only
//! reads them. [`SchemaDetails::add_history`] appends under an exclusive
//! lock so concurrent writers holding shared references never lose entries.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::attribute::{validate_attribute_set, SchemaAttribute};
use crate::error::ModelError;
use crate::reference::{SchemaKey, SchemaReference};

// -- Enumerations -------------------------------------------------------------

/// Lifecycle state of a registered schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaState {
    Created,
    Approved,
    Rejected,
}

impl SchemaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for SchemaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaState {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATED" => Ok(Self::Created),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(ModelError::UnknownSchemaState(s.to_string())),
        }
    }
}

/// Payload encoding the schema governs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaType {
    #[default]
    Json,
    Avro,
    Protobuf,
}

/// How strictly a type's field set must match the attribute set.
///
/// - `Strict`: the name sets must be equal.
/// - `Matching`: every attribute needs a field; extra fields are allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaValidationType {
    Strict,
    #[default]
    Matching,
}

impl fmt::Display for SchemaValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "STRICT",
            Self::Matching => "MATCHING",
        })
    }
}

/// Workflow event recorded in a schema's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaEvent {
    CreateSchema,
    UpdateSchema,
    ApproveSchema,
    RejectSchema,
}

// -- History ------------------------------------------------------------------

/// One entry of a schema's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaHistoryItem {
    pub version: u64,
    pub updated_by: String,
    pub event: SchemaEvent,
    pub timestamp: DateTime<Utc>,
}

impl SchemaHistoryItem {
    /// A history item stamped with the current UTC time.
    pub fn new(version: u64, updated_by: impl Into<String>, event: SchemaEvent) -> Self {
        Self {
            version,
            updated_by: updated_by.into(),
            event,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only history guarded by a mutex.
///
/// Serializes as a plain JSON array of [`SchemaHistoryItem`].
#[derive(Debug, Default)]
pub struct SchemaHistory(Mutex<Vec<SchemaHistoryItem>>);

impl SchemaHistory {
    pub fn push(&self, item: SchemaHistoryItem) {
        self.0.lock().push(item);
    }

    /// Copy of the current entries, in append order.
    pub fn snapshot(&self) -> Vec<SchemaHistoryItem> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn latest(&self) -> Option<SchemaHistoryItem> {
        self.0.lock().last().cloned()
    }
}

impl Clone for SchemaHistory {
    fn clone(&self) -> Self {
        Self(Mutex::new(self.snapshot()))
    }
}

impl PartialEq for SchemaHistory {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot() == other.snapshot()
    }
}

impl From<Vec<SchemaHistoryItem>> for SchemaHistory {
    fn from(items: Vec<SchemaHistoryItem>) -> Self {
        Self(Mutex::new(items))
    }
}

impl Serialize for SchemaHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaHistory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<SchemaHistoryItem>::deserialize(deserializer).map(Self::from)
    }
}

// -- Transformation targets ---------------------------------------------------

/// A named transformation rule. Rule expressions are opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeTransformer {
    pub name: String,
    pub rule: String,
}

/// A downstream schema this schema can be transformed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationTarget {
    pub schema_key: SchemaKey,
    #[serde(default)]
    pub transformers: Vec<AttributeTransformer>,
}

// -- SchemaDetails ------------------------------------------------------------

/// A registered schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDetails {
    pub schema_key: SchemaKey,
    #[serde(default)]
    pub description: String,
    pub schema_state: SchemaState,
    #[serde(default)]
    pub schema_type: SchemaType,
    #[serde(default)]
    pub validation_type: SchemaValidationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_reference: Option<SchemaReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_references: Vec<SchemaReference>,
    pub attributes: Vec<SchemaAttribute>,
    #[serde(default)]
    pub transformation_targets: Vec<TransformationTarget>,
    #[serde(default)]
    pub histories: SchemaHistory,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl SchemaDetails {
    pub fn reference_id(&self) -> String {
        self.schema_key.reference_id()
    }

    pub fn reference_tag(&self) -> String {
        self.schema_key.reference_tag()
    }

    /// Append a history entry. Safe through a shared reference.
    pub fn add_history(&self, item: SchemaHistoryItem) {
        self.histories.push(item);
    }

    /// Approve or reject a CREATED schema, recording the matching event.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidTransition`] unless this schema is CREATED and
    /// `state` is APPROVED or REJECTED.
    pub fn transition(&mut self, state: SchemaState, updated_by: &str) -> Result<(), ModelError> {
        let event = match (self.schema_state, state) {
            (SchemaState::Created, SchemaState::Approved) => SchemaEvent::ApproveSchema,
            (SchemaState::Created, SchemaState::Rejected) => SchemaEvent::RejectSchema,
            (from, to) => {
                return Err(ModelError::InvalidTransition {
                    reference_id: self.reference_id(),
                    from,
                    to,
                })
            }
        };
        self.schema_state = state;
        self.add_history(SchemaHistoryItem::new(
            self.schema_key.version,
            updated_by,
            event,
        ));
        Ok(())
    }

    /// Replace the editable parts of a CREATED schema.
    ///
    /// Identity, state, inheritance links and tags are kept. An
    /// `UpdateSchema` history item is appended.
    ///
    /// # Errors
    ///
    /// [`ModelError::NotEditable`] once the schema left CREATED, or a
    /// [`ModelError`] for a malformed attribute set.
    pub fn apply_update(&mut self, request: UpdateSchemaRequest, updated_by: &str) -> Result<(), ModelError> {
        if self.schema_state != SchemaState::Created {
            return Err(ModelError::NotEditable {
                reference_id: self.reference_id(),
                state: self.schema_state,
            });
        }
        validate_attribute_set(&request.attributes)?;
        self.description = request.description;
        self.schema_type = request.schema_type;
        self.validation_type = request.validation_type;
        self.attributes = request.attributes;
        self.transformation_targets = request.transformation_targets;
        self.add_history(SchemaHistoryItem::new(
            self.schema_key.version,
            updated_by,
            SchemaEvent::UpdateSchema,
        ));
        Ok(())
    }
}

// -- CreateSchemaRequest ------------------------------------------------------

/// Registration payload, typically produced by the tree builder from a
/// schema-declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchemaRequest {
    pub schema_key: SchemaKey,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schema_type: SchemaType,
    #[serde(default)]
    pub validation_type: SchemaValidationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_reference: Option<SchemaReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_references: Vec<SchemaReference>,
    pub attributes: Vec<SchemaAttribute>,
    #[serde(default)]
    pub transformation_targets: Vec<TransformationTarget>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl CreateSchemaRequest {
    /// Turn the request into CREATED details with one `CreateSchema` history item.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the attribute set is malformed.
    pub fn into_details(self, updated_by: &str) -> Result<SchemaDetails, ModelError> {
        validate_attribute_set(&self.attributes)?;
        let details = SchemaDetails {
            description: self.description,
            schema_state: SchemaState::Created,
            schema_type: self.schema_type,
            validation_type: self.validation_type,
            parent_reference: self.parent_reference,
            child_references: self.child_references,
            attributes: self.attributes,
            transformation_targets: self.transformation_targets,
            histories: SchemaHistory::default(),
            tags: self.tags,
            schema_key: self.schema_key,
        };
        details.add_history(SchemaHistoryItem::new(
            details.schema_key.version,
            updated_by,
            SchemaEvent::CreateSchema,
        ));
        Ok(details)
    }
}

// -- UpdateSchemaRequest ------------------------------------------------------

/// Revision of a CREATED schema, addressed by its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchemaRequest {
    pub schema_key: SchemaKey,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schema_type: SchemaType,
    #[serde(default)]
    pub validation_type: SchemaValidationType,
    pub attributes: Vec<SchemaAttribute>,
    #[serde(default)]
    pub transformation_targets: Vec<TransformationTarget>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeKind;
    use std::sync::Arc;
    use std::thread;

    fn request() -> CreateSchemaRequest {
        CreateSchemaRequest {
            schema_key: SchemaKey::new("acme", "payments", "t1", "Account", 1),
            description: "account payload".to_string(),
            schema_type: SchemaType::Json,
            validation_type: SchemaValidationType::default(),
            parent_reference: None,
            child_references: vec![],
            attributes: vec![SchemaAttribute::new("id", AttributeKind::Integer)],
            transformation_targets: vec![],
            tags: BTreeSet::new(),
        }
    }

    #[test]
    fn test_validation_type_defaults_to_matching() {
        assert_eq!(SchemaValidationType::default(), SchemaValidationType::Matching);
    }

    #[test]
    fn test_into_details_records_creation() {
        let details = request().into_details("alice").unwrap();
        assert_eq!(details.schema_state, SchemaState::Created);
        assert_eq!(details.histories.len(), 1);
        let item = details.histories.latest().unwrap();
        assert_eq!(item.event, SchemaEvent::CreateSchema);
        assert_eq!(item.updated_by, "alice");
        assert_eq!(details.reference_id(), "ACME::PAYMENTS::T1::ACCOUNT::1");
        assert_eq!(details.reference_tag(), "ACME::PAYMENTS::T1::ACCOUNT");
    }

    #[test]
    fn test_into_details_rejects_duplicate_attributes() {
        let mut req = request();
        req.attributes
            .push(SchemaAttribute::new("Id", AttributeKind::Long));
        assert!(req.into_details("alice").is_err());
    }

    #[test]
    fn test_transition_appends_history() {
        let mut details = request().into_details("alice").unwrap();
        details.transition(SchemaState::Approved, "bob").unwrap();
        assert_eq!(details.schema_state, SchemaState::Approved);
        let events: Vec<_> = details.histories.snapshot().iter().map(|h| h.event).collect();
        assert_eq!(events, vec![SchemaEvent::CreateSchema, SchemaEvent::ApproveSchema]);
    }

    #[test]
    fn test_transition_only_from_created() {
        let mut details = request().into_details("alice").unwrap();
        assert!(matches!(
            details.transition(SchemaState::Created, "bob"),
            Err(ModelError::InvalidTransition { .. })
        ));
        details.transition(SchemaState::Rejected, "bob").unwrap();
        assert!(matches!(
            details.transition(SchemaState::Approved, "bob"),
            Err(ModelError::InvalidTransition {
                from: SchemaState::Rejected,
                to: SchemaState::Approved,
                ..
            })
        ));
        assert_eq!(details.histories.len(), 2);
    }

    fn update() -> UpdateSchemaRequest {
        UpdateSchemaRequest {
            schema_key: request().schema_key,
            description: "revised".to_string(),
            schema_type: SchemaType::Avro,
            validation_type: SchemaValidationType::Strict,
            attributes: vec![
                SchemaAttribute::new("id", AttributeKind::Long),
                SchemaAttribute::new("name", AttributeKind::String),
            ],
            transformation_targets: vec![],
        }
    }

    #[test]
    fn test_apply_update_replaces_editable_parts() {
        let mut details = request().into_details("alice").unwrap();
        details.tags.insert("core".to_string());
        details.apply_update(update(), "carol").unwrap();
        assert_eq!(details.description, "revised");
        assert_eq!(details.schema_type, SchemaType::Avro);
        assert_eq!(details.validation_type, SchemaValidationType::Strict);
        assert_eq!(details.attributes.len(), 2);
        assert_eq!(details.schema_state, SchemaState::Created);
        assert!(details.tags.contains("core"));
        let latest = details.histories.latest().unwrap();
        assert_eq!(latest.event, SchemaEvent::UpdateSchema);
        assert_eq!(latest.updated_by, "carol");
    }

    #[test]
    fn test_apply_update_rejected_after_approval() {
        let mut details = request().into_details("alice").unwrap();
        details.transition(SchemaState::Approved, "bob").unwrap();
        assert!(matches!(
            details.apply_update(update(), "carol"),
            Err(ModelError::NotEditable { state: SchemaState::Approved, .. })
        ));
        assert_eq!(details.attributes.len(), 1);
    }

    #[test]
    fn test_apply_update_validates_attributes() {
        let mut details = request().into_details("alice").unwrap();
        let mut bad = update();
        bad.attributes.push(SchemaAttribute::new("ID", AttributeKind::Integer));
        assert!(details.apply_update(bad, "carol").is_err());
        assert_eq!(details.description, "account payload");
    }

    #[test]
    fn test_concurrent_add_history_loses_nothing() {
        let details = Arc::new(request().into_details("alice").unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let d = Arc::clone(&details);
                thread::spawn(move || {
                    for _ in 0..50 {
                        d.add_history(SchemaHistoryItem::new(
                            1,
                            format!("writer-{i}"),
                            SchemaEvent::UpdateSchema,
                        ));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(details.histories.len(), 1 + 8 * 50);
    }

    #[test]
    fn test_details_json_round_trip() {
        let details = request().into_details("alice").unwrap();
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["schemaState"], "CREATED");
        assert_eq!(json["validationType"], "MATCHING");
        assert_eq!(json["histories"][0]["event"], "CREATE_SCHEMA");
        assert!(json.get("parentReference").is_none());
        let back: SchemaDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back, details);
    }

    #[test]
    fn test_state_from_str() {
        assert_eq!("approved".parse::<SchemaState>().unwrap(), SchemaState::Approved);
        assert!("archived".parse::<SchemaState>().is_err());
    }
}
