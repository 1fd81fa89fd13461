//! User lists: list metadata, client-side views of list items, and the
//! list operations (duplication, CSV and JSON import and export).

mod list_metadata;
mod list_service;
mod list_view;

pub use list_metadata::*;
pub use list_service::*;
pub use list_view::*;
