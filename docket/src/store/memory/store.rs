use crate::collection::{CollectionPath, Document, EqualityFilter, FieldPatch, Fields};
use crate::common::{server_now, DocketEventBus, SubscriberRef};
use crate::errors::{DocketError, DocketResult, ErrorKind};
use crate::store::memory::InMemoryStoreConfig;
use crate::store::{
    ChangeKind, DocumentStoreProvider, ListenerId, SnapshotListener, StoreChange, WriteBatch,
};
use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type CollectionData = IndexMap<String, Fields>;
type Collections = Arc<DashMap<String, CollectionData>>;

/// A document store that keeps every collection in memory.
///
/// Documents keep insertion order. Ids are random v4 UUIDs in simple form.
/// Change notifications go through a [DocketEventBus]; each listener
/// re-reads its collection and only forwards a snapshot when its matching
/// set actually changed.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryStore {
    pub fn new(store_config: InMemoryStoreConfig) -> InMemoryStore {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner::new(store_config)),
        }
    }

    pub fn config(&self) -> &InMemoryStoreConfig {
        &self.inner.store_config
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        InMemoryStore::new(InMemoryStoreConfig::default())
    }
}

impl DocumentStoreProvider for InMemoryStore {
    fn open(&self) -> DocketResult<()> {
        self.inner.open()
    }

    fn close(&self) -> DocketResult<()> {
        self.inner.close()
    }

    fn is_closed(&self) -> DocketResult<bool> {
        Ok(self.inner.closed.load(Ordering::Relaxed))
    }

    fn add(&self, path: &CollectionPath, document: &FieldPatch) -> DocketResult<String> {
        self.inner.add(path, document)
    }

    fn get(&self, path: &CollectionPath, id: &str) -> DocketResult<Option<Document>> {
        self.inner.get(path, id)
    }

    fn query(
        &self,
        path: &CollectionPath,
        filter: Option<&EqualityFilter>,
    ) -> DocketResult<Vec<Document>> {
        self.inner.check_opened()?;
        Ok(read_collection(&self.inner.collections, path.as_str(), filter))
    }

    fn update(&self, path: &CollectionPath, id: &str, patch: &FieldPatch) -> DocketResult<bool> {
        self.inner.update(path, id, patch)
    }

    fn delete(&self, path: &CollectionPath, id: &str) -> DocketResult<bool> {
        self.inner.delete(path, id)
    }

    fn commit(&self, path: &CollectionPath, batch: WriteBatch) -> DocketResult<Vec<String>> {
        self.inner.commit(path, batch)
    }

    fn listen(
        &self,
        path: &CollectionPath,
        filter: Option<EqualityFilter>,
        listener: SnapshotListener,
    ) -> DocketResult<ListenerId> {
        self.inner.listen(path, filter, listener)
    }

    fn unlisten(&self, listener_id: &ListenerId) -> DocketResult<()> {
        self.inner.unlisten(listener_id)
    }

    fn max_batch_size(&self) -> usize {
        self.inner.store_config.max_batch_size()
    }
}

struct InMemoryStoreInner {
    opened: AtomicBool,
    closed: AtomicBool,
    store_config: InMemoryStoreConfig,
    collections: Collections,
    event_bus: DocketEventBus<StoreChange, ChangeListener>,
    listeners: DashMap<ListenerId, SubscriberRef>,
}

impl InMemoryStoreInner {
    fn new(store_config: InMemoryStoreConfig) -> InMemoryStoreInner {
        InMemoryStoreInner {
            opened: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            store_config,
            collections: Arc::new(DashMap::new()),
            event_bus: DocketEventBus::new(),
            listeners: DashMap::new(),
        }
    }

    fn open(&self) -> DocketResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("Store {} is already closed", self.store_config.name());
            return Err(DocketError::new(
                "Store is already closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        if !self.opened.swap(true, Ordering::Relaxed) {
            log::debug!("Opened in-memory store {}", self.store_config.name());
        }
        Ok(())
    }

    fn close(&self) -> DocketResult<()> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }

        // dropping the handlers disconnects every subscription
        self.listeners.clear();
        self.event_bus.close()?;
        self.collections.clear();
        log::debug!("Closed in-memory store {}", self.store_config.name());
        Ok(())
    }

    fn check_opened(&self) -> DocketResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("Store {} is closed", self.store_config.name());
            return Err(DocketError::new(
                "Store is closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        if !self.opened.load(Ordering::Relaxed) {
            log::error!("Store {} is not opened", self.store_config.name());
            return Err(DocketError::new(
                "Store is not opened",
                ErrorKind::StoreNotInitialized,
            ));
        }
        Ok(())
    }

    fn add(&self, path: &CollectionPath, document: &FieldPatch) -> DocketResult<String> {
        self.check_opened()?;

        let mut fields = Fields::new();
        document.apply_at(&mut fields, server_now())?;

        let id = new_document_id();
        self.collections
            .entry(path.as_str().to_string())
            .or_default()
            .insert(id.clone(), fields);

        self.alert(path, ChangeKind::Added);
        Ok(id)
    }

    fn get(&self, path: &CollectionPath, id: &str) -> DocketResult<Option<Document>> {
        self.check_opened()?;
        let document = self.collections.get(path.as_str()).and_then(|collection| {
            collection
                .get(id)
                .map(|fields| Document::new(id, fields.clone()))
        });
        Ok(document)
    }

    fn update(&self, path: &CollectionPath, id: &str, patch: &FieldPatch) -> DocketResult<bool> {
        self.check_opened()?;

        let matched = match self.collections.get_mut(path.as_str()) {
            Some(mut collection) => match collection.get_mut(id) {
                Some(fields) => {
                    // apply to a copy so a rejected patch leaves the document untouched
                    let mut updated = fields.clone();
                    patch.apply_at(&mut updated, server_now())?;
                    *fields = updated;
                    true
                }
                None => false,
            },
            None => false,
        };

        if matched {
            self.alert(path, ChangeKind::Updated);
        }
        Ok(matched)
    }

    fn delete(&self, path: &CollectionPath, id: &str) -> DocketResult<bool> {
        self.check_opened()?;

        let existed = match self.collections.get_mut(path.as_str()) {
            Some(mut collection) => collection.shift_remove(id).is_some(),
            None => false,
        };

        if existed {
            self.alert(path, ChangeKind::Removed);
        }
        Ok(existed)
    }

    fn commit(&self, path: &CollectionPath, batch: WriteBatch) -> DocketResult<Vec<String>> {
        self.check_opened()?;

        let max_batch_size = self.store_config.max_batch_size();
        if batch.len() > max_batch_size {
            log::error!(
                "Batch of {} writes exceeds the limit of {} for {}",
                batch.len(),
                max_batch_size,
                path
            );
            return Err(DocketError::new(
                &format!(
                    "Batch of {} writes exceeds the limit of {}",
                    batch.len(),
                    max_batch_size
                ),
                ErrorKind::InvalidArgument,
            ));
        }

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let staged: Vec<(String, Fields)> = batch
            .into_iter()
            .map(|fields| (new_document_id(), fields))
            .collect();
        let ids = staged.iter().map(|(id, _)| id.clone()).collect();

        {
            let mut collection = self
                .collections
                .entry(path.as_str().to_string())
                .or_default();
            collection.extend(staged);
        }

        self.alert(path, ChangeKind::Committed);
        Ok(ids)
    }

    fn listen(
        &self,
        path: &CollectionPath,
        filter: Option<EqualityFilter>,
        listener: SnapshotListener,
    ) -> DocketResult<ListenerId> {
        self.check_opened()?;

        let change_listener = ChangeListener::new(
            path.as_str().to_string(),
            filter,
            self.collections.clone(),
            listener,
        );

        // register before the first read so no write slips between them
        let subscriber = self.event_bus.register(change_listener.clone())?;
        let listener_id = ListenerId::new();
        self.listeners.insert(listener_id.clone(), subscriber);

        if let Err(e) = change_listener.refresh() {
            log::error!("Failed to deliver the first snapshot of {}: {}", path, e);
            self.unlisten(&listener_id)?;
            return Err(e);
        }
        Ok(listener_id)
    }

    fn unlisten(&self, listener_id: &ListenerId) -> DocketResult<()> {
        if let Some((_, subscriber)) = self.listeners.remove(listener_id) {
            self.event_bus.deregister(subscriber)?;
        }
        Ok(())
    }

    fn alert(&self, path: &CollectionPath, kind: ChangeKind) {
        if !self.event_bus.has_listeners() {
            return;
        }

        // the write is already applied, a failing listener must not fail it
        if let Err(e) = self.event_bus.publish(StoreChange::new(path.as_str(), kind)) {
            log::warn!("Failed to notify listeners of {}: {}", path, e);
        }
    }
}

fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn read_collection(
    collections: &DashMap<String, CollectionData>,
    path: &str,
    filter: Option<&EqualityFilter>,
) -> Vec<Document> {
    match collections.get(path) {
        Some(collection) => collection
            .iter()
            .map(|(id, fields)| Document::new(id.as_str(), fields.clone()))
            .filter(|doc| filter.map_or(true, |f| f.matches(doc)))
            .collect(),
        None => Vec::new(),
    }
}

/// Bridges store changes to one [SnapshotListener].
#[derive(Clone)]
struct ChangeListener {
    inner: Arc<ChangeListenerInner>,
}

struct ChangeListenerInner {
    path: String,
    filter: Option<EqualityFilter>,
    collections: Collections,
    listener: SnapshotListener,
    last_snapshot: Mutex<Option<Vec<Document>>>,
}

impl ChangeListener {
    fn new(
        path: String,
        filter: Option<EqualityFilter>,
        collections: Collections,
        listener: SnapshotListener,
    ) -> Self {
        ChangeListener {
            inner: Arc::new(ChangeListenerInner {
                path,
                filter,
                collections,
                listener,
                last_snapshot: Mutex::new(None),
            }),
        }
    }

    /// Re-reads the collection and forwards the matching set if it differs
    /// from the last one forwarded.
    fn refresh(&self) -> DocketResult<()> {
        let inner = &self.inner;
        // held across read and delivery so snapshots leave in read order
        let mut last_snapshot = inner.last_snapshot.lock();
        let snapshot = read_collection(&inner.collections, &inner.path, inner.filter.as_ref());
        if last_snapshot.as_ref() == Some(&snapshot) {
            return Ok(());
        }
        *last_snapshot = Some(snapshot.clone());
        inner.listener.notify(snapshot)
    }
}

impl Handle<StoreChange> for ChangeListener {
    fn handle(&self, event: &Event<StoreChange>) -> Result<(), BasuError> {
        if event.data.path() != self.inner.path {
            return Ok(());
        }
        self.refresh()
            .map_err(|e| BasuError::HandlerError(Error::from(e)))
    }
}
