use crate::docket::Docket;
use crate::docket_config::DocketConfig;
use crate::errors::{DocketError, DocketResult};
use crate::storage::{BlobStore, BlobStoreProvider};
use crate::store::{DocumentStore, DocumentStoreProvider};

/// Builder for [Docket] clients.
///
/// Setters record the first error they hit; [DocketBuilder::open] returns it
/// instead of opening the client.
///
/// ```rust,ignore
/// let docket = Docket::builder()
///     .namespace_prefix_from_env("DOCKET_NAMESPACE")
///     .max_batch_size(250)
///     .store(InMemoryStore::default())
///     .blob_store(InMemoryBlobStore::new("receipts"))
///     .open()?;
/// ```
#[derive(Default)]
pub struct DocketBuilder {
    error: Option<DocketError>,
    config: DocketConfig,
}

impl DocketBuilder {
    pub fn new() -> Self {
        DocketBuilder {
            error: None,
            config: DocketConfig::new(),
        }
    }

    /// Prefix prepended to every collection name, e.g. `APP00_ADMIN_`.
    pub fn namespace_prefix(self, prefix: &str) -> Self {
        let config = self.config.clone();
        self.apply(|| config.set_namespace_prefix(prefix))
    }

    pub fn namespace_prefix_from_env(self, var: &str) -> Self {
        let config = self.config.clone();
        self.apply(|| config.set_namespace_prefix_from_env(var))
    }

    pub fn max_batch_size(self, max_batch_size: usize) -> Self {
        let config = self.config.clone();
        self.apply(|| config.set_max_batch_size(max_batch_size))
    }

    pub fn store<T: DocumentStoreProvider + 'static>(self, store: T) -> Self {
        let config = self.config.clone();
        self.apply(|| config.set_store(DocumentStore::new(store)))
    }

    pub fn blob_store<T: BlobStoreProvider + 'static>(self, blob_store: T) -> Self {
        self.blob_store_handle(BlobStore::new(blob_store))
    }

    /// Like [DocketBuilder::blob_store], for a handle with custom chunking.
    pub fn blob_store_handle(self, blob_store: BlobStore) -> Self {
        let config = self.config.clone();
        self.apply(|| config.set_blob_store(blob_store))
    }

    /// Opens the client, or returns the first error a setter recorded.
    pub fn open(self) -> DocketResult<Docket> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.config.initialize()?;
        log::debug!(
            "Opened docket client with namespace '{}'",
            self.config.namespace_prefix()
        );
        Ok(Docket::new(self.config))
    }

    fn apply<F: FnOnce() -> DocketResult<()>>(mut self, setter: F) -> Self {
        if self.error.is_none() {
            if let Err(e) = setter() {
                self.error = Some(e);
            }
        }
        self
    }
}
