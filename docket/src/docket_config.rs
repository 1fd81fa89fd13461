//! Configuration of a [crate::docket::Docket] client.

use crate::common::{ReadExecutor, WriteExecutor, MAX_BATCH_SIZE, PATH_SEPARATOR};
use crate::errors::{DocketError, DocketResult, ErrorKind};
use crate::storage::BlobStore;
use crate::store::memory::InMemoryStore;
use crate::store::DocumentStore;
use crate::{atomic, Atomic};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Settings shared by a client and every handle it gives out.
///
/// Values can only be changed before the client is opened; afterwards every
/// setter fails with [ErrorKind::InvalidArgument].
///
/// * `namespace_prefix` - prepended to every collection name (default empty)
/// * `max_batch_size` - writes per atomic batch, 1 to 500 (default 500)
/// * `store` - the document store (default [InMemoryStore])
/// * `blob_store` - optional blob store for file uploads
#[derive(Clone)]
pub struct DocketConfig {
    inner: Arc<DocketConfigInner>,
}

impl Default for DocketConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DocketConfig {
    pub fn new() -> Self {
        DocketConfig {
            inner: Arc::new(DocketConfigInner::new()),
        }
    }

    pub fn namespace_prefix(&self) -> String {
        self.inner.namespace_prefix()
    }

    pub fn set_namespace_prefix(&self, prefix: &str) -> DocketResult<()> {
        self.inner.set_namespace_prefix(prefix)
    }

    /// Reads the namespace prefix from an environment variable.
    pub fn set_namespace_prefix_from_env(&self, var: &str) -> DocketResult<()> {
        match std::env::var(var) {
            Ok(prefix) => self.inner.set_namespace_prefix(&prefix),
            Err(e) => {
                log::error!("Cannot read namespace prefix from {}: {}", var, e);
                Err(DocketError::new(
                    &format!("Cannot read namespace prefix from {}: {}", var, e),
                    ErrorKind::InvalidArgument,
                ))
            }
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size.load(Ordering::Relaxed)
    }

    pub fn set_max_batch_size(&self, max_batch_size: usize) -> DocketResult<()> {
        self.inner.set_max_batch_size(max_batch_size)
    }

    pub fn set_store(&self, store: DocumentStore) -> DocketResult<()> {
        self.inner.set_store(store)
    }

    pub fn store(&self) -> DocketResult<DocumentStore> {
        self.inner.store()
    }

    pub fn set_blob_store(&self, blob_store: BlobStore) -> DocketResult<()> {
        self.inner.set_blob_store(blob_store)
    }

    pub fn blob_store(&self) -> Option<BlobStore> {
        self.inner.blob_store.get().cloned()
    }

    /// Batch size actually used: the configured size, capped by the store.
    pub fn effective_batch_size(&self) -> DocketResult<usize> {
        let store = self.store()?;
        Ok(self.max_batch_size().min(store.max_batch_size()).max(1))
    }

    pub fn is_configured(&self) -> bool {
        self.inner.configured.load(Ordering::Relaxed)
    }

    /// Freezes the configuration and opens the store, installing an
    /// in-memory store if none was given.
    pub(crate) fn initialize(&self) -> DocketResult<()> {
        self.inner.initialize()
    }

    pub(crate) fn close(&self) -> DocketResult<()> {
        match self.inner.store.get() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }
}

struct DocketConfigInner {
    configured: AtomicBool,
    namespace_prefix: Atomic<String>,
    max_batch_size: AtomicUsize,
    store: OnceLock<DocumentStore>,
    blob_store: OnceLock<BlobStore>,
}

impl DocketConfigInner {
    fn new() -> Self {
        DocketConfigInner {
            configured: AtomicBool::from(false),
            namespace_prefix: atomic(String::new()),
            max_batch_size: AtomicUsize::new(MAX_BATCH_SIZE),
            store: OnceLock::new(),
            blob_store: OnceLock::new(),
        }
    }

    fn check_not_configured(&self, setting: &str) -> DocketResult<()> {
        if self.configured.load(Ordering::Relaxed) {
            log::error!("{} cannot be changed after initialization", setting);
            return Err(DocketError::new(
                &format!("{} cannot be changed after initialization", setting),
                ErrorKind::InvalidArgument,
            ));
        }
        Ok(())
    }

    fn namespace_prefix(&self) -> String {
        self.namespace_prefix.read_with(|it| it.clone())
    }

    fn set_namespace_prefix(&self, prefix: &str) -> DocketResult<()> {
        self.check_not_configured("Namespace prefix")?;

        if prefix
            .chars()
            .any(|c| c.is_whitespace() || c == PATH_SEPARATOR)
        {
            log::error!("Namespace prefix '{}' cannot contain whitespace or '/'", prefix);
            return Err(DocketError::new(
                &format!("Namespace prefix '{}' cannot contain whitespace or '/'", prefix),
                ErrorKind::InvalidArgument,
            ));
        }

        self.namespace_prefix.write_with(|it| *it = prefix.to_string());
        Ok(())
    }

    fn set_max_batch_size(&self, max_batch_size: usize) -> DocketResult<()> {
        self.check_not_configured("Max batch size")?;

        if max_batch_size == 0 || max_batch_size > MAX_BATCH_SIZE {
            log::error!(
                "Max batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE,
                max_batch_size
            );
            return Err(DocketError::new(
                &format!(
                    "Max batch size must be between 1 and {}, got {}",
                    MAX_BATCH_SIZE, max_batch_size
                ),
                ErrorKind::InvalidArgument,
            ));
        }

        self.max_batch_size.store(max_batch_size, Ordering::Relaxed);
        Ok(())
    }

    fn set_store(&self, store: DocumentStore) -> DocketResult<()> {
        self.check_not_configured("Document store")?;
        if self.store.set(store).is_err() {
            log::error!("A document store is already configured");
            return Err(DocketError::new(
                "A document store is already configured",
                ErrorKind::InvalidArgument,
            ));
        }
        Ok(())
    }

    fn store(&self) -> DocketResult<DocumentStore> {
        match self.store.get() {
            Some(store) => Ok(store.clone()),
            None => {
                log::error!("No document store is configured");
                Err(DocketError::new(
                    "No document store is configured",
                    ErrorKind::StoreNotInitialized,
                ))
            }
        }
    }

    fn set_blob_store(&self, blob_store: BlobStore) -> DocketResult<()> {
        self.check_not_configured("Blob store")?;
        if self.blob_store.set(blob_store).is_err() {
            log::error!("A blob store is already configured");
            return Err(DocketError::new(
                "A blob store is already configured",
                ErrorKind::InvalidArgument,
            ));
        }
        Ok(())
    }

    fn initialize(&self) -> DocketResult<()> {
        if self.configured.swap(true, Ordering::Relaxed) {
            log::error!("Configuration is already initialized");
            return Err(DocketError::new(
                "Configuration is already initialized",
                ErrorKind::InvalidArgument,
            ));
        }

        let store = self.store.get_or_init(|| {
            log::debug!("No document store configured, using an in-memory store");
            DocumentStore::new(InMemoryStore::default())
        });
        store.open()
    }
}
