use crate::collection::Document;
use crate::errors::DocketResult;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// The kind of write that changed a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
    Committed,
}

/// Published on a store's event bus after a write has been applied.
///
/// Carries only the address of the changed collection. Listeners re-read the
/// collection themselves, so a listener that handles a late event still sees
/// the newest state.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    path: String,
    kind: ChangeKind,
}

impl StoreChange {
    pub fn new(path: &str, kind: ChangeKind) -> Self {
        StoreChange {
            path: path.to_string(),
            kind,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }
}

/// Identifies a listener registered with [crate::store::DocumentStoreProvider::listen].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(String);

impl ListenerId {
    pub fn new() -> Self {
        ListenerId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closure receiving a full snapshot of the documents a listener matches.
///
/// Any `Fn(Vec<Document>) -> DocketResult<()>` that is `Send + Sync`
/// implements it. Stores may call it from any thread.
pub trait SnapshotCallback: Send + Sync + Fn(Vec<Document>) -> DocketResult<()> {}

impl<F> SnapshotCallback for F where F: Send + Sync + Fn(Vec<Document>) -> DocketResult<()> {}

/// Receives snapshots from a store.
///
/// A store calls the listener once with the current matching set when the
/// listener is registered and again every time that set changes.
#[derive(Clone)]
pub struct SnapshotListener {
    on_snapshot: Arc<dyn SnapshotCallback>,
}

impl SnapshotListener {
    pub fn new(on_snapshot: impl SnapshotCallback + 'static) -> Self {
        SnapshotListener {
            on_snapshot: Arc::new(on_snapshot),
        }
    }

    pub fn notify(&self, snapshot: Vec<Document>) -> DocketResult<()> {
        (self.on_snapshot)(snapshot)
    }
}

impl Debug for SnapshotListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotListener").finish()
    }
}
