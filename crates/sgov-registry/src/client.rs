//! # Schema Client
//!
//! What a producing or consuming service embeds: a refresher-backed view of
//! the APPROVED schemas it cares about, plus optional startup conformance
//! checking of its own schema-declared types.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sgov_core::{SchemaDetails, SchemaKey, SchemaState, SearchRequest};
use tracing::info;

use crate::error::RegistryError;
use crate::refresher::SchemaRefresher;
use crate::repository::SchemaRepository;
use crate::validator::SchemaConformance;

pub struct SchemaClient {
    refresher: Arc<SchemaRefresher>,
    validator: Option<Arc<dyn SchemaConformance>>,
}

impl SchemaClient {
    /// A client over the schemas matching `request`. The state filter is
    /// always narrowed to APPROVED.
    pub fn new(
        repository: Arc<dyn SchemaRepository>,
        mut request: SearchRequest,
        refresh_interval: Duration,
    ) -> Self {
        request.states = [SchemaState::Approved].into();
        Self {
            refresher: Arc::new(SchemaRefresher::new(repository, request, refresh_interval)),
            validator: None,
        }
    }

    /// Attach a conformance checker run by [`start`](Self::start).
    pub fn with_validator(mut self, validator: Arc<dyn SchemaConformance>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// The refresher backing this client, usable as a schema supplier.
    pub fn refresher(&self) -> &Arc<SchemaRefresher> {
        &self.refresher
    }

    /// Load the schema snapshot, check conformance, then keep the snapshot
    /// refreshed in the background.
    ///
    /// # Errors
    ///
    /// Repository failures from the initial load, any conformance failure,
    /// or [`RegistryError::RuntimeUnavailable`].
    pub fn start(&self) -> Result<(), RegistryError> {
        let loaded = self.refresher.refresh()?;
        info!(schemas = loaded, "loaded approved schemas");
        if let Some(validator) = &self.validator {
            validator.start()?;
        }
        self.refresher.start()
    }

    pub fn stop(&self) {
        self.refresher.stop();
        if let Some(validator) = &self.validator {
            validator.stop();
        }
    }

    pub fn schema_details(&self) -> Arc<Vec<SchemaDetails>> {
        self.refresher.data()
    }

    /// Snapshot entries whose reference id matches one of `keys`.
    pub fn schema_details_for(&self, keys: &[SchemaKey]) -> Vec<SchemaDetails> {
        let wanted: HashSet<String> = keys.iter().map(SchemaKey::reference_id).collect();
        self.refresher
            .data()
            .iter()
            .filter(|d| wanted.contains(&d.reference_id()))
            .cloned()
            .collect()
    }

    /// Conformance verdict for `key`; always `true` without a validator.
    pub fn valid(&self, key: &SchemaKey) -> bool {
        self.validator.as_ref().map_or(true, |v| v.valid(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemorySchemaRepository;
    use sgov_core::{AttributeKind, CreateSchemaRequest, SchemaAttribute};

    fn request(name: &str) -> CreateSchemaRequest {
        CreateSchemaRequest {
            schema_key: SchemaKey::new("acme", "payments", "t1", name, 1),
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

    fn seeded() -> InMemorySchemaRepository {
        let repo = InMemorySchemaRepository::new();
        for name in ["Payment", "Refund"] {
            let stored = repo.register(request(name), "alice").unwrap();
            repo.transition(&stored.schema_key, SchemaState::Approved, "bob").unwrap();
        }
        repo.register(request("Draft"), "alice").unwrap();
        repo
    }

    #[tokio::test]
    async fn test_client_sees_only_approved() {
        let client = SchemaClient::new(
            Arc::new(seeded()),
            SearchRequest::default().with_state(SchemaState::Created),
            Duration::from_secs(30),
        );
        client.start().unwrap();
        assert_eq!(client.schema_details().len(), 2);
        client.stop();
    }

    #[tokio::test]
    async fn test_schema_details_for_keys() {
        let client = SchemaClient::new(
            Arc::new(seeded()),
            SearchRequest::default(),
            Duration::from_secs(30),
        );
        client.start().unwrap();
        let keys = [
            SchemaKey::new("ACME", "PAYMENTS", "T1", "refund", 1),
            SchemaKey::new("acme", "payments", "t1", "Draft", 1),
        ];
        let found = client.schema_details_for(&keys);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].schema_key.schema_name, "Refund");
        client.stop();
    }

    #[test]
    fn test_valid_without_validator() {
        let client = SchemaClient::new(
            Arc::new(InMemorySchemaRepository::new()),
            SearchRequest::default(),
            Duration::from_secs(30),
        );
        assert!(client.valid(&SchemaKey::new("a", "b", "c", "d", 1)));
    }
}
