//! Collection access: the CRUD, subscription and batch operations an
//! application uses against namespaced collections.

mod collection_access;
mod write_result;

pub use collection_access::*;
pub use write_result::*;
