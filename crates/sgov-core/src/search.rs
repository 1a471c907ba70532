//! Search filters over registered schemas.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::details::{SchemaDetails, SchemaState};

/// Filter for schema lookups. An empty filter set matches any value;
/// string filters compare ASCII case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub orgs: BTreeSet<String>,
    #[serde(default)]
    pub tenants: BTreeSet<String>,
    #[serde(default)]
    pub namespaces: BTreeSet<String>,
    #[serde(default)]
    pub schema_names: BTreeSet<String>,
    #[serde(default)]
    pub states: BTreeSet<SchemaState>,
}

fn admits(filter: &BTreeSet<String>, value: &str) -> bool {
    filter.is_empty() || filter.iter().any(|f| f.eq_ignore_ascii_case(value))
}

impl SearchRequest {
    /// Every schema in the APPROVED state.
    pub fn approved() -> Self {
        Self::default().with_state(SchemaState::Approved)
    }

    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.orgs.insert(org.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenants.insert(tenant.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.insert(namespace.into());
        self
    }

    pub fn with_schema_name(mut self, name: impl Into<String>) -> Self {
        self.schema_names.insert(name.into());
        self
    }

    pub fn with_state(mut self, state: SchemaState) -> Self {
        self.states.insert(state);
        self
    }

    pub fn matches(&self, details: &SchemaDetails) -> bool {
        let key = &details.schema_key;
        admits(&self.orgs, &key.org_id)
            && admits(&self.tenants, &key.tenant_id)
            && admits(&self.namespaces, &key.namespace)
            && admits(&self.schema_names, &key.schema_name)
            && (self.states.is_empty() || self.states.contains(&details.schema_state))
    }
}
