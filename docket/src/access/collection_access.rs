use crate::access::{BatchWriteResult, CreateResult, DeleteResult, UpdateResult};
use crate::collection::{
    validate_field_name, CollectionPath, Document, EntityState, EqualityFilter, FieldPatch,
    Fields, Snapshot, Subscription, TrackedDocument,
};
use crate::common::{CREATED_AT, UPDATED_AT};
use crate::docket::DocketInner;
use crate::errors::{BatchFailure, DocketError, DocketResult, ErrorKind};
use crate::store::{DocumentStore, WriteBatch};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

/// CRUD, live views and bulk writes over namespaced collections.
///
/// Every collection name is validated and prefixed with the configured
/// namespace before it reaches the store. Every failure is logged with the
/// operation and collection, then returned; nothing is retried here. Use
/// [DocketError::is_retryable] to decide whether to try again.
///
/// Obtained from [crate::docket::Docket::access]. Cloning is cheap and all
/// clones share the client's lifecycle: once the client is closed every
/// operation fails with [ErrorKind::ClientClosed].
#[derive(Clone)]
pub struct CollectionAccess {
    inner: Arc<CollectionAccessInner>,
}

struct CollectionAccessInner {
    client: Arc<DocketInner>,
    store: DocumentStore,
}

impl CollectionAccess {
    pub(crate) fn new(client: Arc<DocketInner>, store: DocumentStore) -> Self {
        CollectionAccess {
            inner: Arc::new(CollectionAccessInner { client, store }),
        }
    }

    /// Resolves a collection name to its backend path.
    pub fn path(&self, collection: &str) -> DocketResult<CollectionPath> {
        CollectionPath::new(&self.inner.client.config().namespace_prefix(), collection)
    }

    /// Adds a document and stamps `createdAt` with the server time.
    ///
    /// ```ignore
    /// let created = access.create("MesListes", fields! { name: "Courses", userId: uid })?;
    /// println!("new list {}", created.id);
    /// ```
    pub fn create(&self, collection: &str, fields: Fields) -> DocketResult<CreateResult> {
        let path = self.prepare(collection)?;
        let document = FieldPatch::from_fields(&fields).server_timestamp(CREATED_AT);

        match self.inner.store.add(&path, &document) {
            Ok(id) => Ok(CreateResult { success: true, id }),
            Err(e) => Err(backend_error("add document to", &path, ErrorKind::BackendWrite, e)),
        }
    }

    /// Merges `fields` over an existing document and stamps `updatedAt`.
    ///
    /// Fields not named keep their values. If no document has the id nothing
    /// is written and the result reports `matched: false`.
    pub fn update(&self, collection: &str, id: &str, fields: Fields) -> DocketResult<UpdateResult> {
        let patch = FieldPatch::from_fields(&fields).server_timestamp(UPDATED_AT);
        self.update_with(collection, id, &patch)
    }

    /// Applies an arbitrary patch without adding an `updatedAt` stamp.
    pub fn update_with(
        &self,
        collection: &str,
        id: &str,
        patch: &FieldPatch,
    ) -> DocketResult<UpdateResult> {
        let path = self.prepare(collection)?;
        validate_id(id)?;
        patch.validate()?;

        match self.inner.store.update(&path, id, patch) {
            Ok(matched) => {
                if !matched {
                    log::debug!("No document {} in {}, update skipped", id, path);
                }
                Ok(UpdateResult {
                    success: true,
                    matched,
                })
            }
            Err(e) => Err(backend_error("update document in", &path, ErrorKind::BackendWrite, e)),
        }
    }

    /// Deletes a document. Deleting a missing document succeeds.
    pub fn delete(&self, collection: &str, id: &str) -> DocketResult<DeleteResult> {
        let path = self.prepare(collection)?;
        validate_id(id)?;

        match self.inner.store.delete(&path, id) {
            Ok(existed) => Ok(DeleteResult {
                success: true,
                existed,
            }),
            Err(e) => Err(backend_error("delete document from", &path, ErrorKind::BackendWrite, e)),
        }
    }

    /// Reads one document. A missing document is `Ok(None)`, not an error.
    pub fn get(&self, collection: &str, id: &str) -> DocketResult<Option<Document>> {
        let path = self.prepare(collection)?;
        validate_id(id)?;

        self.inner
            .store
            .get(&path, id)
            .map_err(|e| backend_error("get document from", &path, ErrorKind::BackendRead, e))
    }

    /// Reads a whole collection once, in store order.
    pub fn get_all(&self, collection: &str) -> DocketResult<Vec<Document>> {
        let path = self.prepare(collection)?;

        self.inner
            .store
            .query(&path, None)
            .map_err(|e| backend_error("read collection", &path, ErrorKind::BackendRead, e))
    }

    /// Opens a live view of a collection, optionally narrowed to documents
    /// where one field equals one value.
    pub fn subscribe(
        &self,
        collection: &str,
        filter: Option<EqualityFilter>,
    ) -> DocketResult<Subscription> {
        let path = self.prepare(collection)?;
        if let Some(filter) = &filter {
            validate_field_name(filter.field())?;
        }

        Subscription::establish(self.inner.store.clone(), path.clone(), filter)
            .map_err(|e| backend_error("subscribe to", &path, ErrorKind::BackendRead, e))
    }

    /// Like [CollectionAccess::subscribe], but hands every snapshot to
    /// `callback` on a background thread.
    ///
    /// The thread runs until the returned handle is cancelled or dropped, or
    /// the client is closed. Do not read snapshots from the returned handle
    /// as well; they would be taken from the callback.
    pub fn subscribe_with<F>(
        &self,
        collection: &str,
        filter: Option<EqualityFilter>,
        mut callback: F,
    ) -> DocketResult<Subscription>
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        let subscription = self.subscribe(collection, filter)?;
        let (receiver, cancelled) = subscription.detach_receiver();
        let path = subscription.path().clone();

        let spawned = thread::Builder::new()
            .name(format!("docket-subscription-{}", path.name()))
            .spawn(move || {
                while let Ok(snapshot) = receiver.recv() {
                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    callback(snapshot);
                }
                log::debug!("Stopped delivering snapshots of {}", path);
            });

        if let Err(e) = spawned {
            log::error!("Failed to start subscription thread: {}", e);
            return Err(DocketError::new(
                &format!("Failed to start subscription thread: {}", e),
                ErrorKind::InternalError,
            ));
        }
        Ok(subscription)
    }

    /// Adds many documents in chunks of at most the configured batch size.
    ///
    /// Chunks are committed one after another; each chunk is atomic, the
    /// whole call is not. If chunk *k* fails, chunks before it stay written
    /// and the returned error carries a [BatchFailure] with their ids.
    pub fn batch_write(&self, collection: &str, items: Vec<Fields>) -> DocketResult<BatchWriteResult> {
        let path = self.prepare(collection)?;
        let chunk_size = self.inner.client.config().effective_batch_size()?;

        if items.is_empty() {
            return Ok(BatchWriteResult {
                success: true,
                ids: Vec::new(),
                chunks: 0,
            });
        }

        let total_chunks = items.len().div_ceil(chunk_size);
        let mut ids = Vec::with_capacity(items.len());

        for (index, chunk) in items.chunks(chunk_size).enumerate() {
            let batch = WriteBatch::from(chunk.to_vec());
            match self.inner.store.commit(&path, batch) {
                Ok(committed) => {
                    log::debug!(
                        "Committed chunk {}/{} ({} documents) to {}",
                        index + 1,
                        total_chunks,
                        committed.len(),
                        path
                    );
                    ids.extend(committed);
                }
                Err(e) => {
                    let failure = BatchFailure {
                        failed_chunk: index,
                        total_chunks,
                        committed_ids: ids,
                    };
                    log::error!(
                        "Batch write to {} failed at chunk {}/{} after {} documents",
                        path,
                        index + 1,
                        total_chunks,
                        failure.committed_ids.len()
                    );
                    return Err(backend_error("batch write to", &path, ErrorKind::BackendWrite, e)
                        .with_batch_failure(failure));
                }
            }
        }

        Ok(BatchWriteResult {
            success: true,
            ids,
            chunks: total_chunks,
        })
    }

    /// Deletes one field of a document, leaving the others untouched.
    ///
    /// This removes the field; it does not set it to null.
    pub fn remove_field(&self, collection: &str, id: &str, field: &str) -> DocketResult<UpdateResult> {
        validate_field_name(field)?;
        let patch = FieldPatch::new().delete(field);
        self.update_with(collection, id, &patch)
    }

    /// Writes the staged edits of a tracked document.
    ///
    /// Confirms the edits when the store applied them and rejects them when
    /// the write failed or the document no longer exists. A document without
    /// staged edits is left alone.
    ///
    /// # Errors
    ///
    /// A document in [EntityState::Conflict] is not written; it fails with
    /// [ErrorKind::Conflict] until [TrackedDocument::resolve] is called.
    pub fn save_tracked(
        &self,
        collection: &str,
        tracked: &mut TrackedDocument,
    ) -> DocketResult<UpdateResult> {
        if tracked.state() == EntityState::Conflict {
            log::error!(
                "Cannot save {} in {}: remote change not resolved",
                tracked.id(),
                collection
            );
            return Err(DocketError::new(
                &format!("Cannot save {} with an unresolved conflict", tracked.id()),
                ErrorKind::Conflict,
            ));
        }

        let patch = match tracked.pending() {
            Some(pending) => pending.clone().server_timestamp(UPDATED_AT),
            None => {
                return Ok(UpdateResult {
                    success: true,
                    matched: true,
                })
            }
        };

        match self.update_with(collection, tracked.id(), &patch) {
            Ok(result) if result.matched => {
                tracked.confirm()?;
                Ok(result)
            }
            Ok(result) => {
                tracked.reject()?;
                Ok(result)
            }
            Err(e) => {
                tracked.reject()?;
                Err(e)
            }
        }
    }

    fn prepare(&self, collection: &str) -> DocketResult<CollectionPath> {
        if self.inner.client.is_closed() {
            log::error!("Client is closed, cannot access {}", collection);
            return Err(DocketError::new(
                "Client is closed",
                ErrorKind::ClientClosed,
            ));
        }
        self.path(collection)
    }
}

fn validate_id(id: &str) -> DocketResult<()> {
    if id.is_empty() || id.contains(crate::common::PATH_SEPARATOR) {
        log::error!("Invalid document id '{}'", id);
        return Err(DocketError::new(
            &format!("Invalid document id '{}'", id),
            ErrorKind::InvalidArgument,
        ));
    }
    Ok(())
}

fn backend_error(
    operation: &str,
    path: &CollectionPath,
    kind: ErrorKind,
    cause: DocketError,
) -> DocketError {
    log::error!("Failed to {} '{}': {}", operation, path, cause);
    DocketError::new_with_cause(
        &format!("Failed to {} '{}'", operation, path),
        kind,
        cause,
    )
}
