//! Integration test: build schemas from a catalog, register and approve
//! them, then start a client whose conformance check runs against the
//! approved snapshot.

use std::sync::Arc;
use std::time::Duration;

use sgov_core::{SchemaDetails, SchemaState, SearchRequest};
use sgov_registry::{
    InMemorySchemaRepository, RegistryError, SchemaClient, SchemaConformance, SchemaRepository,
    StaticSchemaValidator,
};
use sgov_schema::{AnnotatedType, ClassDescriptor, SchemaBuilder, SchemaDefinition, TypeCatalog, TypeRef};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sgov_registry=debug,sgov_schema=debug")
        .with_test_writer()
        .try_init();
}

fn def(name: &str) -> SchemaDefinition {
    SchemaDefinition::new("acme", "payments", "tenant-1", name)
}

fn catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(
            ClassDescriptor::structure("Instrument")
                .abstract_type()
                .with_definition(def("Instrument"))
                .with_field("amount", AnnotatedType::class("i64")),
        )
        .with(
            ClassDescriptor::structure("Card")
                .extends(AnnotatedType::class("Instrument"))
                .with_definition(def("Card"))
                .with_field("pan", AnnotatedType::class("String")),
        )
        .with(
            ClassDescriptor::structure("Payment")
                .with_definition(def("Payment"))
                .with_field("id", AnnotatedType::class("i64"))
                .with_field("instrument", AnnotatedType::class("Instrument").reference()),
        )
}

/// Register every schema-declared type and approve it.
fn publish(repo: &InMemorySchemaRepository, catalog: &TypeCatalog) {
    let builder = SchemaBuilder::new(catalog);
    for name in ["Instrument", "Card", "Payment"] {
        let request = builder
            .build_schema_request(&TypeRef::new(name))
            .unwrap()
            .unwrap();
        // Schemas travel as JSON between the builder and the registry.
        let json = serde_json::to_string(&request.into_details("ci").unwrap()).unwrap();
        let details: SchemaDetails = serde_json::from_str(&json).unwrap();
        let key = details.schema_key.clone();
        repo.create(details).unwrap();
        repo.transition(&key, SchemaState::Approved, "reviewer").unwrap();
    }
}

fn client(repo: &InMemorySchemaRepository, catalog: TypeCatalog) -> (SchemaClient, Arc<dyn SchemaConformance>) {
    let client = SchemaClient::new(
        Arc::new(repo.clone()),
        SearchRequest::default().with_namespace("payments"),
        Duration::from_millis(20),
    );
    let validator: Arc<dyn SchemaConformance> = Arc::new(StaticSchemaValidator::new(
        catalog,
        client.refresher().clone(),
    ));
    (client.with_validator(Arc::clone(&validator)), validator)
}

#[tokio::test]
async fn test_published_types_pass_startup_check() {
    init_tracing();
    let repo = InMemorySchemaRepository::new();
    publish(&repo, &catalog());

    let (client, validator) = client(&repo, catalog());
    client.start().unwrap();

    assert_eq!(client.schema_details().len(), 3);
    for name in ["Instrument", "Card", "Payment"] {
        let key = def(name).schema_key();
        assert!(client.valid(&key), "{name} should be valid");
        assert_eq!(validator.type_for(&key), Some(TypeRef::new(name)));
    }
    client.stop();
}

#[tokio::test]
async fn test_drifted_subtype_fails_startup_check() {
    init_tracing();
    let repo = InMemorySchemaRepository::new();
    publish(&repo, &catalog());

    let drifted = catalog().with(
        ClassDescriptor::structure("Card")
            .extends(AnnotatedType::class("Instrument"))
            .with_definition(def("Card"))
            .with_field("pan", AnnotatedType::class("i64")),
    );
    let (client, _) = client(&repo, drifted);
    match client.start() {
        Err(RegistryError::InvalidSchemas { violations }) => {
            let keys: Vec<_> = violations.iter().map(|(k, _)| k.as_str()).collect();
            assert_eq!(keys, vec![def("Card").schema_key().reference_id().as_str()]);
        }
        other => panic!("expected invalid schemas, got {other:?}"),
    }
    assert!(!client.valid(&def("Card").schema_key()));
    assert!(client.valid(&def("Payment").schema_key()));
}

#[tokio::test]
async fn test_unapproved_schema_is_not_found() {
    init_tracing();
    let repo = InMemorySchemaRepository::new();
    let catalog = catalog();
    let builder = SchemaBuilder::new(&catalog);
    for name in ["Instrument", "Card", "Payment"] {
        let request = builder.build_schema_request(&TypeRef::new(name)).unwrap().unwrap();
        repo.register(request, "ci").unwrap();
    }
    repo.transition(&def("Payment").schema_key(), SchemaState::Approved, "reviewer")
        .unwrap();

    let (client, _) = client(&repo, catalog.clone());
    assert!(matches!(
        client.start(),
        Err(RegistryError::NoSchemaFound { .. })
    ));
}

#[tokio::test]
async fn test_client_snapshot_follows_approvals() {
    init_tracing();
    let repo = InMemorySchemaRepository::new();
    let client = SchemaClient::new(
        Arc::new(repo.clone()),
        SearchRequest::default(),
        Duration::from_millis(10),
    );
    client.start().unwrap();
    assert!(client.schema_details().is_empty());

    publish(&repo, &catalog());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.schema_details().len(), 3);
    client.stop();
}
