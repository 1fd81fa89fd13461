//! Documents, collection addressing and live views.
//!
//! # Documents
//!
//! A [Document] is a store-assigned id plus open [Fields]. Fields map names
//! to [crate::common::Value]s and carry no schema.
//!
//! ```rust,ignore
//! use docket::fields;
//!
//! let item = fields! {
//!     field1: "Milk",
//!     isFavorite: false,
//! };
//! let created = access.create("lists/a1/items", item)?;
//! ```
//!
//! # Partial updates
//!
//! A [FieldPatch] lists per-field changes: set a value, delete the field or
//! take the server's clock. Fields the patch does not name are untouched.
//!
//! # Subscriptions
//!
//! [Subscription] delivers the full matching set of a collection each time it
//! changes, optionally narrowed with an [EqualityFilter] built by [field].
//!
//! # Optimistic edits
//!
//! [TrackedDocument] follows a document through staged edits, their
//! acknowledgement and conflicting remote changes.

mod collection_path;
mod document;
mod field_patch;
mod filter;
mod subscription;
mod tracked;

pub use collection_path::*;
pub use document::*;
pub use field_patch::*;
pub use filter::*;
pub use subscription::*;
pub use tracked::*;
