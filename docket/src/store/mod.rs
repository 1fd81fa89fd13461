//! Document store abstraction.
//!
//! The access layer talks to a managed document database through the
//! [DocumentStoreProvider] trait, held in a cloneable [DocumentStore] handle.
//! The database itself is out of reach of this crate; hosts supply a provider
//! for their backend.
//!
//! # Bundled store
//!
//! [memory::InMemoryStore] keeps collections in memory. It honours the same
//! contract as a managed backend (store assigned ids, server timestamps,
//! atomic batches capped at 500 writes, live listeners) and backs the test
//! suites.
//!
//! # Listeners
//!
//! Stores push full snapshots to a [SnapshotListener]. The in-memory store
//! routes change notifications through the crate's event bus and recomputes
//! each listener's matching set when its collection changes.

mod document_store;
mod event;
pub mod memory;
mod write_batch;

pub use document_store::*;
pub use event::*;
pub use write_batch::*;
