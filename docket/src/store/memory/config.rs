use crate::common::MAX_BATCH_SIZE;
use std::sync::Arc;

/// Settings of an [crate::store::memory::InMemoryStore].
///
/// ```ignore
/// let config = InMemoryStoreConfig::new().with_max_batch_size(100);
/// let store = InMemoryStore::new(config);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStoreConfig {
    inner: Arc<InMemoryStoreConfigInner>,
}

impl InMemoryStoreConfig {
    pub fn new() -> InMemoryStoreConfig {
        InMemoryStoreConfig {
            inner: Arc::new(InMemoryStoreConfigInner {
                max_batch_size: MAX_BATCH_SIZE,
                name: "default".to_string(),
            }),
        }
    }

    /// Caps the writes per batch. Values above the backend limit of 500
    /// are clamped to it; zero is raised to one.
    pub fn with_max_batch_size(&self, max_batch_size: usize) -> InMemoryStoreConfig {
        InMemoryStoreConfig {
            inner: Arc::new(InMemoryStoreConfigInner {
                max_batch_size: max_batch_size.clamp(1, MAX_BATCH_SIZE),
                name: self.inner.name.clone(),
            }),
        }
    }

    /// Names the store in log lines.
    pub fn with_name(&self, name: &str) -> InMemoryStoreConfig {
        InMemoryStoreConfig {
            inner: Arc::new(InMemoryStoreConfigInner {
                max_batch_size: self.inner.max_batch_size,
                name: name.to_string(),
            }),
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct InMemoryStoreConfigInner {
    max_batch_size: usize,
    name: String,
}
