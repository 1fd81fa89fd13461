use crate::collection::{CollectionPath, Document, EqualityFilter, FieldPatch};
use crate::errors::DocketResult;
use crate::store::{ListenerId, SnapshotListener, WriteBatch};
use std::ops::Deref;
use std::sync::Arc;

/// Interface of a managed document database as the access layer sees it.
///
/// # Purpose
/// Everything the access layer needs from a backend: single document writes
/// with server assigned ids and timestamps, reads, atomic batch commits and
/// live listeners. Hosts plug in a real backend by implementing this trait;
/// [crate::store::memory::InMemoryStore] is the bundled implementation.
///
/// # Contract
/// - `add` and `update` take a [FieldPatch]; the store resolves
///   [crate::collection::FieldUpdate::ServerTimestamp] entries against its
///   own clock. `add` also assigns the new document's id.
/// - `update` is a partial merge; it reports whether the document existed and
///   never creates one.
/// - `delete` reports whether the document existed; deleting a missing
///   document is not an error.
/// - `commit` applies a whole [WriteBatch] or nothing.
/// - `listen` delivers the current matching set before it returns, and a new
///   full set every time that set changes.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; listeners may be invoked from any thread.
pub trait DocumentStoreProvider: Send + Sync {
    /// Opens the store. Must be called before any other operation.
    fn open(&self) -> DocketResult<()>;

    /// Closes the store and releases every listener.
    fn close(&self) -> DocketResult<()>;

    fn is_closed(&self) -> DocketResult<bool>;

    /// Adds a document built from `document` and returns its new id.
    fn add(&self, path: &CollectionPath, document: &FieldPatch) -> DocketResult<String>;

    fn get(&self, path: &CollectionPath, id: &str) -> DocketResult<Option<Document>>;

    /// Returns the documents of a collection in store order, optionally
    /// filtered by field equality.
    fn query(
        &self,
        path: &CollectionPath,
        filter: Option<&EqualityFilter>,
    ) -> DocketResult<Vec<Document>>;

    /// Applies a partial update. Returns `false` if no document has the id.
    fn update(&self, path: &CollectionPath, id: &str, patch: &FieldPatch) -> DocketResult<bool>;

    /// Deletes a document. Returns `false` if it did not exist.
    fn delete(&self, path: &CollectionPath, id: &str) -> DocketResult<bool>;

    /// Commits a batch atomically and returns the ids of the added documents
    /// in batch order.
    fn commit(&self, path: &CollectionPath, batch: WriteBatch) -> DocketResult<Vec<String>>;

    fn listen(
        &self,
        path: &CollectionPath,
        filter: Option<EqualityFilter>,
        listener: SnapshotListener,
    ) -> DocketResult<ListenerId>;

    /// Releases a listener. Unknown ids are ignored.
    fn unlisten(&self, listener_id: &ListenerId) -> DocketResult<()>;

    /// The largest number of writes one [WriteBatch] may carry.
    fn max_batch_size(&self) -> usize;
}

/// Cloneable handle to a [DocumentStoreProvider].
///
/// Dereferences to `Arc<dyn DocumentStoreProvider>`, so every provider
/// method is callable on the handle. Cloning only bumps a reference count.
///
/// ```ignore
/// let store = DocumentStore::new(InMemoryStore::default());
/// store.open()?;
/// let id = store.add(&path, &FieldPatch::new().set("name", "Milk"))?;
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<dyn DocumentStoreProvider>,
}

impl DocumentStore {
    pub fn new<T: DocumentStoreProvider + 'static>(inner: T) -> Self {
        DocumentStore {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for DocumentStore {
    type Target = Arc<dyn DocumentStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
