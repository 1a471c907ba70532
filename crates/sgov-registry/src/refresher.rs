//! # Schema Refresher
//!
//! Keeps a local snapshot of the schemas matching a [`SearchRequest`] and
//! replaces it wholesale on every refresh. Readers get an
//! `Arc<Vec<SchemaDetails>>` and never block a refresh for longer than a
//! pointer swap.
//!
//! ## Lifecycle
//!
//! `start()` spawns a tokio interval task on the current runtime. The task
//! holds only a weak handle, so dropping the last `Arc<SchemaRefresher>`
//! ends it; `stop()` (and `Drop`) abort it eagerly. A failed refresh keeps
//! the previous snapshot and is logged.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use sgov_core::{SchemaDetails, SchemaKey, SearchRequest};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::repository::SchemaRepository;

/// Source of the current schema set.
pub trait SchemaSupplier: Send + Sync {
    fn schemas(&self) -> Arc<Vec<SchemaDetails>>;
}

impl SchemaSupplier for Vec<SchemaDetails> {
    fn schemas(&self) -> Arc<Vec<SchemaDetails>> {
        Arc::new(self.clone())
    }
}

pub struct SchemaRefresher {
    repository: Arc<dyn SchemaRepository>,
    request: SearchRequest,
    interval: Duration,
    data: RwLock<Arc<Vec<SchemaDetails>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SchemaRefresher {
    /// An empty refresher. Call [`refresh`](Self::refresh) or
    /// [`start`](Self::start) to populate it.
    pub fn new(
        repository: Arc<dyn SchemaRepository>,
        request: SearchRequest,
        interval: Duration,
    ) -> Self {
        Self {
            repository,
            request,
            interval,
            data: RwLock::new(Arc::new(Vec::new())),
            task: Mutex::new(None),
        }
    }

    /// Replace the snapshot from the repository. Returns the new size.
    pub fn refresh(&self) -> Result<usize, RegistryError> {
        let schemas = self.repository.get_schemas(&self.request)?;
        let count = schemas.len();
        *self.data.write() = Arc::new(schemas);
        debug!(schemas = count, "refreshed schema snapshot");
        Ok(count)
    }

    pub fn data(&self) -> Arc<Vec<SchemaDetails>> {
        Arc::clone(&self.data.read())
    }

    pub fn get(&self, key: &SchemaKey) -> Option<SchemaDetails> {
        self.data.read().iter().find(|d| &d.schema_key == key).cloned()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Spawn the periodic refresh task. A second call while running is a no-op.
    ///
    /// # Errors
    ///
    /// [`RegistryError::RuntimeUnavailable`] outside a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<(), RegistryError> {
        let handle = Handle::try_current().map_err(|_| RegistryError::RuntimeUnavailable)?;
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(());
        }
        let refresher = Arc::downgrade(self);
        *task = Some(handle.spawn(run(refresher, self.interval)));
        info!(interval_ms = self.interval.as_millis() as u64, "started schema refresher");
        Ok(())
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("stopped schema refresher");
        }
    }
}

async fn run(refresher: Weak<SchemaRefresher>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(refresher) = refresher.upgrade() else {
            break;
        };
        if let Err(e) = refresher.refresh() {
            warn!(error = %e, "schema refresh failed, keeping previous snapshot");
        }
    }
}

impl SchemaSupplier for SchemaRefresher {
    fn schemas(&self) -> Arc<Vec<SchemaDetails>> {
        self.data()
    }
}

impl Drop for SchemaRefresher {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SchemaRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRefresher")
            .field("request", &self.request)
            .field("interval", &self.interval)
            .field("schemas", &self.data.read().len())
            .finish()
    }
}
