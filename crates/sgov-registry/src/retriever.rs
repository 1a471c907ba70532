//! Schema lookups with an optional cached snapshot.
//!
//! With caching enabled, reads are answered from a [`SchemaRefresher`]
//! holding every stored schema; a request may bypass it with
//! [`RequestContext::ignore_cache`]. Without caching, every read goes to
//! the repository.

use std::sync::Arc;

use sgov_core::{SchemaDetails, SchemaKey, SearchRequest};
use tracing::warn;

use crate::config::CacheConfig;
use crate::error::RegistryError;
use crate::refresher::SchemaRefresher;
use crate::repository::SchemaRepository;

/// Per-request read options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ignore_cache: bool,
}

impl RequestContext {
    pub fn uncached() -> Self {
        Self { ignore_cache: true }
    }
}

pub struct SchemaRetriever {
    repository: Arc<dyn SchemaRepository>,
    refresher: Option<Arc<SchemaRefresher>>,
}

impl SchemaRetriever {
    /// A retriever over `repository`. An enabled `cache` creates a refresher
    /// over all stored schemas and populates it once; call
    /// [`start`](Self::start) to keep it current.
    pub fn new(repository: Arc<dyn SchemaRepository>, cache: Option<CacheConfig>) -> Self {
        let refresher = cache.filter(|c| c.enabled).map(|c| {
            let refresher = Arc::new(SchemaRefresher::new(
                Arc::clone(&repository),
                SearchRequest::default(),
                c.refresh_interval,
            ));
            if let Err(e) = refresher.refresh() {
                warn!(error = %e, "initial schema cache load failed");
            }
            refresher
        });
        Self {
            repository,
            refresher,
        }
    }

    pub fn refresher(&self) -> Option<&Arc<SchemaRefresher>> {
        self.refresher.as_ref()
    }

    /// Start periodic cache refreshes. A no-op without a cache.
    pub fn start(&self) -> Result<(), RegistryError> {
        match &self.refresher {
            Some(refresher) => refresher.start(),
            None => Ok(()),
        }
    }

    pub fn stop(&self) {
        if let Some(refresher) = &self.refresher {
            refresher.stop();
        }
    }

    pub fn get_schema_details(
        &self,
        context: &RequestContext,
        key: &SchemaKey,
    ) -> Result<Option<SchemaDetails>, RegistryError> {
        match self.cached(context) {
            Some(refresher) => Ok(refresher.get(key)),
            None => self.repository.get(key),
        }
    }

    pub fn search(
        &self,
        context: &RequestContext,
        request: &SearchRequest,
    ) -> Result<Vec<SchemaDetails>, RegistryError> {
        match self.cached(context) {
            Some(refresher) => Ok(refresher
                .data()
                .iter()
                .filter(|d| request.matches(d))
                .cloned()
                .collect()),
            None => self.repository.get_schemas(request),
        }
    }

    fn cached(&self, context: &RequestContext) -> Option<&SchemaRefresher> {
        if context.ignore_cache {
            None
        } else {
            self.refresher.as_deref()
        }
    }
}
