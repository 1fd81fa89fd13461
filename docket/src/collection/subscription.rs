use crate::collection::{CollectionPath, Document, EqualityFilter};
use crate::errors::DocketResult;
use crate::store::{DocumentStore, ListenerId, SnapshotListener};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The complete set of documents a subscription matched at one point in time.
pub type Snapshot = Vec<Document>;

/// A live view of a collection.
///
/// Every change to the matched set produces a new [Snapshot] holding the
/// whole set, never a diff. The first snapshot is available as soon as the
/// subscription is established.
///
/// Snapshots wait in a slot that holds one at a time. A newer snapshot
/// replaces an unread older one, so a slow reader never falls behind by
/// more than one snapshot and never sees stale data once it catches up.
///
/// Dropping the subscription cancels it.
///
/// ```ignore
/// let subscription = access.subscribe("MesListes", Some(field("userId").eq(uid)))?;
/// for snapshot in subscription {
///     render(&snapshot);
/// }
/// ```
pub struct Subscription {
    path: CollectionPath,
    store: DocumentStore,
    listener_id: ListenerId,
    receiver: Receiver<Snapshot>,
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    /// Registers a listener with the store and returns the live handle.
    pub(crate) fn establish(
        store: DocumentStore,
        path: CollectionPath,
        filter: Option<EqualityFilter>,
    ) -> DocketResult<Subscription> {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let slot = SnapshotSlot {
            sender,
            receiver: receiver.clone(),
        };
        let listener = SnapshotListener::new(move |snapshot: Snapshot| {
            slot.offer(snapshot);
            Ok(())
        });

        let listener_id = store.listen(&path, filter, listener)?;
        log::debug!("Subscribed to {} with listener {}", path, listener_id);

        Ok(Subscription {
            path,
            store,
            listener_id,
            receiver,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Blocks until the next snapshot arrives.
    ///
    /// Returns `None` once the subscription is cancelled or the store has
    /// been closed.
    pub fn next(&self) -> Option<Snapshot> {
        if self.is_cancelled() {
            return None;
        }
        let snapshot = self.receiver.recv().ok()?;
        // a snapshot read after cancel never reaches the caller
        if self.is_cancelled() {
            return None;
        }
        Some(snapshot)
    }

    /// Waits up to `timeout` for the next snapshot.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Snapshot> {
        if self.is_cancelled() {
            return None;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(snapshot) if !self.is_cancelled() => Some(snapshot),
            Ok(_) => None,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Returns a waiting snapshot without blocking.
    pub fn try_next(&self) -> Option<Snapshot> {
        if self.is_cancelled() {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Stops delivery and releases the store listener.
    ///
    /// Safe to call more than once and from any thread holding a reference.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.store.unlisten(&self.listener_id) {
            Ok(_) => log::debug!("Cancelled subscription to {}", self.path),
            Err(e) => log::warn!("Failed to release listener on {}: {}", self.path, e),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The collection this subscription watches.
    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Hands the receiving end to a background consumer; cancellation stays
    /// with this handle.
    pub(crate) fn detach_receiver(&self) -> (Receiver<Snapshot>, Arc<AtomicBool>) {
        (self.receiver.clone(), self.cancelled.clone())
    }
}

impl Iterator for Subscription {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Self::Item> {
        Subscription::next(self)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path.as_str())
            .field("listener_id", &self.listener_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Sending side of a one-snapshot delivery slot.
struct SnapshotSlot {
    sender: Sender<Snapshot>,
    // used to evict an unread snapshot when a newer one arrives
    receiver: Receiver<Snapshot>,
}

impl SnapshotSlot {
    fn offer(&self, snapshot: Snapshot) {
        let mut pending = snapshot;
        loop {
            match self.sender.try_send(pending) {
                Ok(_) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.receiver.try_recv();
                    pending = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{field, FieldPatch};
    use crate::common::Value;
    use crate::store::memory::InMemoryStore;
    use std::thread;

    fn open_store() -> DocumentStore {
        let store = DocumentStore::new(InMemoryStore::default());
        store.open().unwrap();
        store
    }

    fn items() -> CollectionPath {
        CollectionPath::new("", "items").unwrap()
    }

    #[test]
    fn test_slot_keeps_only_the_newest_snapshot() {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let slot = SnapshotSlot {
            sender,
            receiver: receiver.clone(),
        };
        for n in 0..5 {
            slot.offer(vec![Document::new(n.to_string(), Default::default())]);
        }
        let snapshot = receiver.try_recv().unwrap();
        assert_eq!(snapshot[0].id(), "4");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_first_snapshot_is_delivered_on_establishment() {
        let store = open_store();
        store.add(&items(), &FieldPatch::new().set("n", 1)).unwrap();

        let subscription = Subscription::establish(store, items(), None).unwrap();
        let snapshot = subscription.next_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_slow_reader_sees_latest_state() {
        let store = open_store();
        let subscription = Subscription::establish(store.clone(), items(), None).unwrap();

        for n in 0..10 {
            store.add(&items(), &FieldPatch::new().set("n", n)).unwrap();
        }

        awaitility::at_most(Duration::from_secs(2)).until(|| {
            match subscription.try_next() {
                Some(snapshot) => snapshot.len() == 10,
                None => false,
            }
        });
    }

    #[test]
    fn test_filtered_subscription() {
        let store = open_store();
        let subscription =
            Subscription::establish(store.clone(), items(), Some(field("userId").eq("u1")))
                .unwrap();
        assert!(subscription.next_timeout(Duration::from_secs(1)).unwrap().is_empty());

        store.add(&items(), &FieldPatch::new().set("userId", "u2")).unwrap();
        store.add(&items(), &FieldPatch::new().set("userId", "u1")).unwrap();

        let snapshot = subscription.next_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.iter().all(|d| d.get("userId") == Some(&Value::from("u1"))));
    }

    #[test]
    fn test_cancel_is_idempotent_and_ends_iteration() {
        let store = open_store();
        let subscription = Subscription::establish(store.clone(), items(), None).unwrap();
        subscription.cancel();
        subscription.cancel();
        assert!(subscription.is_cancelled());

        store.add(&items(), &FieldPatch::new().set("n", 1)).unwrap();
        assert!(subscription.next().is_none());
        assert!(subscription.try_next().is_none());
    }

    #[test]
    fn test_cancel_unblocks_waiting_reader() {
        let store = open_store();
        let subscription = Arc::new(Subscription::establish(store, items(), None).unwrap());
        assert!(subscription.next().is_some());

        let reader = subscription.clone();
        let handle = thread::spawn(move || reader.next());
        thread::sleep(Duration::from_millis(50));
        subscription.cancel();
        assert!(handle.join().unwrap().is_none());
    }

    #[test]
    fn test_store_close_ends_subscription() {
        let store = open_store();
        let subscription = Subscription::establish(store.clone(), items(), None).unwrap();
        assert!(subscription.next().is_some());
        store.close().unwrap();
        assert!(subscription.next_timeout(Duration::from_secs(1)).is_none());
    }
}
