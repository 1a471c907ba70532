//! # Static Schema Validator
//!
//! Startup conformance check: every schema-declared type known to an
//! introspector is validated against its registered schema before the
//! host accepts traffic.
//!
//! ## Walk
//!
//! Types are processed from a worklist seeded with all schema-declared
//! types. Types a validation defers (references, subtypes, schema-defined
//! parents) are pushed onto the same worklist, so every type is validated
//! at most once per `start()` no matter how the schemas reference each
//! other.
//!
//! ## Memoization
//!
//! Results are recorded per [`SchemaKey`] with insert-if-absent semantics:
//! the first verdict for a key sticks. Asking about a key that was never
//! validated records it as invalid.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use sgov_core::SchemaKey;
use sgov_schema::{SchemaValidator, TypeIntrospector, TypeRef, Violation};
use tracing::{debug, error, info, warn};

use crate::error::RegistryError;
use crate::refresher::SchemaSupplier;

/// Conformance verdicts for registered schemas.
pub trait SchemaConformance: Send + Sync {
    fn start(&self) -> Result<(), RegistryError>;
    fn stop(&self);
    fn valid(&self, key: &SchemaKey) -> bool;
    /// The type validated against `key`, if any.
    fn type_for(&self, key: &SchemaKey) -> Option<TypeRef>;
}

pub struct StaticSchemaValidator<I> {
    introspector: I,
    supplier: Arc<dyn SchemaSupplier>,
    validation_registry: RwLock<HashMap<SchemaKey, bool>>,
    type_registry: RwLock<HashMap<SchemaKey, TypeRef>>,
}

impl<I: TypeIntrospector + Send + Sync> StaticSchemaValidator<I> {
    pub fn new(introspector: I, supplier: Arc<dyn SchemaSupplier>) -> Self {
        Self {
            introspector,
            supplier,
            validation_registry: RwLock::new(HashMap::new()),
            type_registry: RwLock::new(HashMap::new()),
        }
    }

    fn validate_all(&self) -> Result<Vec<(String, Vec<Violation>)>, RegistryError> {
        let schemas = self.supplier.schemas();
        let validator = SchemaValidator::new(&self.introspector);
        let resolver = |t: &TypeRef| self.introspector.immediate_subtypes(t);

        let mut pending: VecDeque<TypeRef> = self.introspector.schema_defined_types().into();
        let mut visited = BTreeSet::new();
        let mut invalid = Vec::new();

        while let Some(type_ref) = pending.pop_front() {
            if !visited.insert(type_ref.clone()) {
                continue;
            }
            // Deferred types are always schema-defined.
            let Some(definition) = self
                .introspector
                .describe(&type_ref)
                .and_then(|c| c.definition.as_ref())
            else {
                continue;
            };
            let key = definition.schema_key();
            self.type_registry
                .write()
                .entry(key.clone())
                .or_insert_with(|| type_ref.clone());

            let details = schemas
                .iter()
                .find(|d| d.schema_key == key)
                .ok_or_else(|| RegistryError::NoSchemaFound {
                    reference_id: key.reference_id(),
                    type_ref: type_ref.clone(),
                })?;

            let response = validator.validate(details, &type_ref, Some(&resolver));
            pending.extend(response.classes_to_validate.iter().cloned());

            let valid = response.is_valid();
            self.validation_registry.write().entry(key.clone()).or_insert(valid);
            if valid {
                debug!(schema = %key, type_ref = %type_ref, "type conforms to schema");
            } else {
                warn!(
                    schema = %key,
                    type_ref = %type_ref,
                    violations = response.violations.len(),
                    "type does not conform to schema"
                );
                invalid.push((key.reference_id(), response.violations));
            }
        }
        info!(validated = visited.len(), "schema conformance check finished");
        Ok(invalid)
    }
}

impl<I: TypeIntrospector + Send + Sync> SchemaConformance for StaticSchemaValidator<I> {
    /// Validate every schema-declared type.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NoSchemaFound`] when a type's schema is not in the
    ///   supplied set.
    /// - [`RegistryError::InvalidSchemas`] listing every non-conforming schema.
    fn start(&self) -> Result<(), RegistryError> {
        info!("starting the schema validator");
        let invalid = self.validate_all()?;
        if !invalid.is_empty() {
            error!(
                invalid = invalid.len(),
                "found invalid schemas, fix them before starting"
            );
            return Err(RegistryError::InvalidSchemas { violations: invalid });
        }
        Ok(())
    }

    fn stop(&self) {
        info!("stopping the schema validator");
    }

    fn valid(&self, key: &SchemaKey) -> bool {
        *self
            .validation_registry
            .write()
            .entry(key.clone())
            .or_insert(false)
    }

    fn type_for(&self, key: &SchemaKey) -> Option<TypeRef> {
        self.type_registry.read().get(key).cloned()
    }
}
