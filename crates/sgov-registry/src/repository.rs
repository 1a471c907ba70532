//! # Schema Repository
//!
//! Storage seam for registered schemas. The registry only needs four
//! operations from a backend; the workflow (registration from a builder
//! request, revisions, approval and rejection) is expressed on top of them.
//!
//! ## Workflow rules
//!
//! - At most one version per reference tag may be CREATED at a time.
//! - Only CREATED schemas accept an [`UpdateSchemaRequest`].
//! - Approval and rejection are one-way moves out of CREATED.
//!
//! [`InMemorySchemaRepository`] is the in-process backend: a cloneable
//! handle over `Arc<RwLock<HashMap>>` keyed by reference id. The lock is
//! `parking_lot` and is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sgov_core::{
    CreateSchemaRequest, SchemaDetails, SchemaKey, SchemaState, SearchRequest, UpdateSchemaRequest,
};
use tracing::debug;

use crate::error::RegistryError;

/// Backend storing [`SchemaDetails`] by [`SchemaKey`].
pub trait SchemaRepository: Send + Sync {
    /// Store a new schema.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyExists`] if the key is taken.
    fn create(&self, details: SchemaDetails) -> Result<(), RegistryError>;

    /// Replace a stored schema.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if the key is not stored.
    fn update(&self, details: SchemaDetails) -> Result<(), RegistryError>;

    fn get(&self, key: &SchemaKey) -> Result<Option<SchemaDetails>, RegistryError>;

    /// Every stored schema admitted by `request`.
    fn get_schemas(&self, request: &SearchRequest) -> Result<Vec<SchemaDetails>, RegistryError>;

    /// Store a builder-produced request as a CREATED schema.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::AlreadyExists`] if the exact key is taken.
    /// - [`RegistryError::PendingVersion`] if another version with the same
    ///   reference tag is still CREATED.
    fn register(
        &self,
        request: CreateSchemaRequest,
        updated_by: &str,
    ) -> Result<SchemaDetails, RegistryError> {
        let details = request.into_details(updated_by)?;
        if self.get(&details.schema_key)?.is_some() {
            return Err(RegistryError::AlreadyExists {
                reference_id: details.reference_id(),
            });
        }
        let tag = details.reference_tag();
        let pending = SearchRequest::default().with_state(SchemaState::Created);
        if let Some(existing) = self
            .get_schemas(&pending)?
            .into_iter()
            .find(|d| d.reference_tag() == tag)
        {
            return Err(RegistryError::PendingVersion {
                reference_id: details.reference_id(),
                pending: existing.reference_id(),
            });
        }
        self.create(details.clone())?;
        Ok(details)
    }

    /// Revise a CREATED schema in place.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] for an unknown key; a
    /// [`RegistryError::Model`] if the schema left CREATED or the new
    /// attribute set is malformed.
    fn update_schema(
        &self,
        request: UpdateSchemaRequest,
        updated_by: &str,
    ) -> Result<SchemaDetails, RegistryError> {
        let mut details = self.get(&request.schema_key)?.ok_or_else(|| RegistryError::NotFound {
            reference_id: request.schema_key.reference_id(),
        })?;
        details.apply_update(request, updated_by)?;
        self.update(details.clone())?;
        Ok(details)
    }

    /// Approve or reject a stored schema, recording the matching history event.
    fn transition(
        &self,
        key: &SchemaKey,
        state: SchemaState,
        updated_by: &str,
    ) -> Result<SchemaDetails, RegistryError> {
        let mut details = self.get(key)?.ok_or_else(|| RegistryError::NotFound {
            reference_id: key.reference_id(),
        })?;
        details.transition(state, updated_by)?;
        self.update(details.clone())?;
        Ok(details)
    }
}

// -- In-Memory Repository -----------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaRepository {
    data: Arc<RwLock<HashMap<String, SchemaDetails>>>,
}

impl InMemorySchemaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SchemaRepository for InMemorySchemaRepository {
    fn create(&self, details: SchemaDetails) -> Result<(), RegistryError> {
        let reference_id = details.reference_id();
        let mut guard = self.data.write();
        if guard.contains_key(&reference_id) {
            return Err(RegistryError::AlreadyExists { reference_id });
        }
        debug!(schema = %reference_id, "stored schema");
        guard.insert(reference_id, details);
        Ok(())
    }

    fn update(&self, details: SchemaDetails) -> Result<(), RegistryError> {
        let reference_id = details.reference_id();
        let mut guard = self.data.write();
        match guard.get_mut(&reference_id) {
            Some(entry) => {
                *entry = details;
                debug!(schema = %reference_id, "updated schema");
                Ok(())
            }
            None => Err(RegistryError::NotFound { reference_id }),
        }
    }

    fn get(&self, key: &SchemaKey) -> Result<Option<SchemaDetails>, RegistryError> {
        Ok(self.data.read().get(&key.reference_id()).cloned())
    }

    fn get_schemas(&self, request: &SearchRequest) -> Result<Vec<SchemaDetails>, RegistryError> {
        let mut found: Vec<_> = self
            .data
            .read()
            .values()
            .filter(|d| request.matches(d))
            .cloned()
            .collect();
        found.sort_by_key(SchemaDetails::reference_id);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgov_core::{AttributeKind, ModelError, SchemaAttribute, SchemaEvent};

    fn request(name: &str, version: u64) -> CreateSchemaRequest {
        CreateSchemaRequest {
            schema_key: SchemaKey::new("acme", "payments", "t1", name, version),
            description: String::new(),
            schema_type: Default::default(),
            validation_type: Default::default(),
            parent_reference: None,
            child_references: vec![],
            attributes: vec![SchemaAttribute::new("id", AttributeKind::Long)],
            transformation_targets: vec![],
            tags: Default::default(),
        }
    }

    #[test]
    fn test_register_and_get() {
        let repo = InMemorySchemaRepository::new();
        let stored = repo.register(request("Payment", 1), "alice").unwrap();
        assert_eq!(stored.schema_state, SchemaState::Created);

        // Lookup is case-insensitive through the reference id.
        let key = SchemaKey::new("ACME", "Payments", "T1", "payment", 1);
        let found = repo.get(&key).unwrap().unwrap();
        assert_eq!(found.schema_key, stored.schema_key);
        assert!(repo.get(&SchemaKey::new("acme", "payments", "t1", "Payment", 2)).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let repo = InMemorySchemaRepository::new();
        repo.register(request("Payment", 1), "alice").unwrap();
        assert!(matches!(
            repo.register(request("Payment", 1), "bob"),
            Err(RegistryError::AlreadyExists { .. })
        ));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_update_requires_existing() {
        let repo = InMemorySchemaRepository::new();
        let details = request("Payment", 1).into_details("alice").unwrap();
        assert!(matches!(
            repo.update(details),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_transition_records_history() {
        let repo = InMemorySchemaRepository::new();
        let stored = repo.register(request("Payment", 1), "alice").unwrap();
        let approved = repo
            .transition(&stored.schema_key, SchemaState::Approved, "bob")
            .unwrap();
        assert_eq!(approved.schema_state, SchemaState::Approved);
        assert_eq!(approved.histories.len(), 2);
        assert_eq!(
            approved.histories.latest().map(|h| h.event),
            Some(SchemaEvent::ApproveSchema)
        );
        let reread = repo.get(&stored.schema_key).unwrap().unwrap();
        assert_eq!(reread.schema_state, SchemaState::Approved);
    }

    #[test]
    fn test_get_schemas_filters() {
        let repo = InMemorySchemaRepository::new();
        repo.register(request("Payment", 1), "alice").unwrap();
        repo.register(request("Refund", 1), "alice").unwrap();
        repo.transition(
            &SchemaKey::new("acme", "payments", "t1", "Refund", 1),
            SchemaState::Approved,
            "bob",
        )
        .unwrap();

        assert_eq!(repo.get_schemas(&SearchRequest::default()).unwrap().len(), 2);
        let approved = repo.get_schemas(&SearchRequest::approved()).unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].schema_key.schema_name, "Refund");
        let by_name = repo
            .get_schemas(&SearchRequest::default().with_schema_name("payment"))
            .unwrap();
        assert_eq!(by_name.len(), 1);
    }

    #[test]
    fn test_clones_share_storage() {
        let repo = InMemorySchemaRepository::new();
        let handle = repo.clone();
        handle.register(request("Payment", 1), "alice").unwrap();
        assert_eq!(repo.len(), 1);
    }

    fn update(name: &str, version: u64) -> UpdateSchemaRequest {
        UpdateSchemaRequest {
            schema_key: SchemaKey::new("acme", "payments", "t1", name, version),
            description: "with amount".to_string(),
            schema_type: Default::default(),
            validation_type: Default::default(),
            attributes: vec![
                SchemaAttribute::new("id", AttributeKind::Long),
                SchemaAttribute::new("amount", AttributeKind::Double),
            ],
            transformation_targets: vec![],
        }
    }

    #[test]
    fn test_new_version_blocked_while_previous_is_created() {
        let repo = InMemorySchemaRepository::new();
        repo.register(request("Payment", 1), "alice").unwrap();
        match repo.register(request("Payment", 2), "alice") {
            Err(RegistryError::PendingVersion { pending, .. }) => {
                assert_eq!(pending, "ACME::PAYMENTS::T1::PAYMENT::1");
            }
            other => panic!("expected pending version, got {other:?}"),
        }
        // Other schemas in the namespace are unaffected.
        repo.register(request("Refund", 1), "alice").unwrap();

        repo.transition(
            &SchemaKey::new("acme", "payments", "t1", "Payment", 1),
            SchemaState::Approved,
            "bob",
        )
        .unwrap();
        repo.register(request("Payment", 2), "alice").unwrap();
        assert_eq!(repo.len(), 3);
    }

    #[test]
    fn test_update_schema_while_created() {
        let repo = InMemorySchemaRepository::new();
        repo.register(request("Payment", 1), "alice").unwrap();
        let updated = repo.update_schema(update("Payment", 1), "carol").unwrap();
        assert_eq!(updated.attributes.len(), 2);
        assert_eq!(
            updated.histories.latest().map(|h| h.event),
            Some(SchemaEvent::UpdateSchema)
        );
        let reread = repo.get(&updated.schema_key).unwrap().unwrap();
        assert_eq!(reread.description, "with amount");
        assert_eq!(reread.histories.len(), 2);
    }

    #[test]
    fn test_update_schema_after_approval_rejected() {
        let repo = InMemorySchemaRepository::new();
        let stored = repo.register(request("Payment", 1), "alice").unwrap();
        repo.transition(&stored.schema_key, SchemaState::Approved, "bob").unwrap();
        assert!(matches!(
            repo.update_schema(update("Payment", 1), "carol"),
            Err(RegistryError::Model(ModelError::NotEditable { .. }))
        ));
        assert!(matches!(
            repo.update_schema(update("Refund", 1), "carol"),
            Err(RegistryError::NotFound { .. })
        ));
        let reread = repo.get(&stored.schema_key).unwrap().unwrap();
        assert_eq!(reread.attributes.len(), 1);
    }

    #[test]
    fn test_transition_out_of_final_state_rejected() {
        let repo = InMemorySchemaRepository::new();
        let stored = repo.register(request("Payment", 1), "alice").unwrap();
        repo.transition(&stored.schema_key, SchemaState::Rejected, "bob").unwrap();
        assert!(matches!(
            repo.transition(&stored.schema_key, SchemaState::Approved, "bob"),
            Err(RegistryError::Model(ModelError::InvalidTransition { .. }))
        ));
    }
}
