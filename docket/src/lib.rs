//! # Docket - Collection Access Layer
//!
//! Docket is a thin client layer over a managed document database and blob
//! store. It turns application CRUD calls into document store operations on
//! namespaced collections, offers live views of a collection (optionally
//! narrowed by a field equality filter) and splits bulk writes into batches
//! the backend accepts.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docket::collection::field;
//! use docket::docket::Docket;
//! use docket::fields;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let docket = Docket::builder()
//!     .namespace_prefix("APP00_ADMIN_")
//!     .open()?;
//! let access = docket.access()?;
//!
//! let created = access.create("MesListes", fields! { name: "Courses", userId: "u1" })?;
//! access.update("MesListes", &created.id, fields! { isPinned: true })?;
//!
//! let subscription = access.subscribe("MesListes", Some(field("userId").eq("u1")))?;
//! if let Some(snapshot) = subscription.next() {
//!     println!("{} lists", snapshot.len());
//! }
//!
//! docket.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! The document store and the blob store are traits
//! ([store::DocumentStoreProvider], [storage::BlobStoreProvider]) supplied by
//! the host. In-memory implementations ship with the crate and are used when
//! none is configured.
//!
//! ## Module Organization
//!
//! - [`access`] - CRUD, subscriptions and batch writes on collections
//! - [`collection`] - Documents, fields, paths, patches, filters and subscriptions
//! - [`common`] - Values, constants and shared utilities
//! - [`docket`] - The client
//! - [`docket_builder`] - Client builder
//! - [`docket_config`] - Client configuration
//! - [`errors`] - Error types and fault classification
//! - [`lists`] - User lists, list views and list import/export
//! - [`storage`] - Blob storage and uploads
//! - [`store`] - Document store abstraction and the in-memory store

pub mod access;
pub mod collection;
pub mod common;
pub mod docket;
pub mod docket_builder;
pub mod docket_config;
pub mod errors;
pub mod lists;
pub mod storage;
pub mod store;

pub use common::*;
