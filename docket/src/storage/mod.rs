//! Blob storage for files attached to documents.
//!
//! [BlobStore::upload_file] sends a file in chunks through a
//! [BlobStoreProvider], reports progress after each chunk and returns the
//! object's download URL. [InMemoryBlobStore] is the bundled provider.

mod blob_store;
mod memory;

pub use blob_store::*;
pub use memory::*;
