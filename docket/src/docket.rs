use crate::access::CollectionAccess;
use crate::docket_builder::DocketBuilder;
use crate::docket_config::DocketConfig;
use crate::errors::{DocketError, DocketResult, ErrorKind};
use crate::lists::ListService;
use crate::storage::BlobStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A client of the document and blob stores.
///
/// `Docket` is the entry point of the crate. Open one with
/// [Docket::builder], use [Docket::access] for collection operations and
/// close it when done. Clones share one client; it is closed explicitly
/// with [Docket::close] or when the last clone or handle is dropped.
///
/// Closing the client closes the store, which ends every subscription.
/// Handles obtained earlier fail with [ErrorKind::ClientClosed] afterwards.
///
/// ```rust,ignore
/// use docket::docket::Docket;
/// use docket::fields;
///
/// let docket = Docket::builder().namespace_prefix("APP00_ADMIN_").open()?;
/// let access = docket.access()?;
///
/// let created = access.create("users", fields! { name: "Alice" })?;
/// let alice = access.get("users", &created.id)?;
///
/// docket.close()?;
/// ```
#[derive(Clone)]
pub struct Docket {
    inner: Arc<DocketInner>,
}

impl Docket {
    pub fn builder() -> DocketBuilder {
        DocketBuilder::new()
    }

    pub(crate) fn new(config: DocketConfig) -> Self {
        Docket {
            inner: Arc::new(DocketInner {
                config,
                closed: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Returns the collection access layer of this client.
    ///
    /// The handle keeps the client alive: the store stays open until the
    /// client is closed or every `Docket` clone and handle is dropped.
    pub fn access(&self) -> DocketResult<CollectionAccess> {
        self.inner.check_open()?;
        let store = self.inner.config.store()?;
        Ok(CollectionAccess::new(self.inner.clone(), store))
    }

    /// Returns list operations built on this client.
    pub fn lists(&self) -> DocketResult<ListService> {
        Ok(ListService::new(self.access()?))
    }

    /// Returns the configured blob store.
    ///
    /// # Errors
    ///
    /// Fails with [ErrorKind::StorageError] if no blob store was configured.
    pub fn blob_store(&self) -> DocketResult<BlobStore> {
        self.inner.check_open()?;
        match self.inner.config.blob_store() {
            Some(blob_store) => Ok(blob_store),
            None => {
                log::error!("No blob store is configured");
                Err(DocketError::new(
                    "No blob store is configured",
                    ErrorKind::StorageError,
                ))
            }
        }
    }

    pub fn config(&self) -> &DocketConfig {
        &self.inner.config
    }

    /// Closes the client. Closing twice is a no-op.
    pub fn close(&self) -> DocketResult<()> {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

pub(crate) struct DocketInner {
    config: DocketConfig,
    closed: Arc<AtomicBool>,
}

impl DocketInner {
    pub(crate) fn config(&self) -> &DocketConfig {
        &self.config
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn check_open(&self) -> DocketResult<()> {
        if self.is_closed() {
            log::error!("Client is closed");
            return Err(DocketError::new("Client is closed", ErrorKind::ClientClosed));
        }
        Ok(())
    }

    fn close(&self) -> DocketResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.config.close()?;
        log::debug!("Closed docket client");
        Ok(())
    }
}

impl Drop for DocketInner {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close docket client: {}", e);
        }
    }
}
