use crate::common::MEMORY_URL_SCHEME;
use crate::errors::{DocketError, DocketResult, ErrorKind};
use crate::storage::{BlobStoreProvider, UploadId};
use dashmap::DashMap;
use std::sync::Arc;

/// A blob store that keeps objects in memory.
///
/// Download URLs take the form `memory://<bucket>/<path>`.
#[derive(Clone)]
pub struct InMemoryBlobStore {
    inner: Arc<InMemoryBlobStoreInner>,
}

struct InMemoryBlobStoreInner {
    bucket: String,
    uploads: DashMap<UploadId, PendingUpload>,
    objects: DashMap<String, Vec<u8>>,
}

struct PendingUpload {
    path: String,
    total_bytes: usize,
    data: Vec<u8>,
}

impl InMemoryBlobStore {
    pub fn new(bucket: &str) -> Self {
        InMemoryBlobStore {
            inner: Arc::new(InMemoryBlobStoreInner {
                bucket: bucket.to_string(),
                uploads: DashMap::new(),
                objects: DashMap::new(),
            }),
        }
    }

    /// Returns a copy of a stored object.
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.objects.get(path).map(|data| data.clone())
    }

    /// Number of uploads begun and neither finished nor aborted.
    pub fn pending_uploads(&self) -> usize {
        self.inner.uploads.len()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}/{}", MEMORY_URL_SCHEME, self.inner.bucket, path)
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        InMemoryBlobStore::new("default")
    }
}

impl BlobStoreProvider for InMemoryBlobStore {
    fn begin_upload(&self, path: &str, total_bytes: usize) -> DocketResult<UploadId> {
        let upload_id = UploadId::new();
        self.inner.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                path: path.to_string(),
                total_bytes,
                data: Vec::with_capacity(total_bytes),
            },
        );
        Ok(upload_id)
    }

    fn upload_chunk(&self, upload_id: &UploadId, bytes: &[u8]) -> DocketResult<()> {
        match self.inner.uploads.get_mut(upload_id) {
            Some(mut upload) => {
                if upload.data.len() + bytes.len() > upload.total_bytes {
                    log::error!("Upload {} exceeds its declared size", upload_id);
                    return Err(DocketError::new(
                        &format!("Upload {} exceeds its declared size", upload_id),
                        ErrorKind::StorageError,
                    ));
                }
                upload.data.extend_from_slice(bytes);
                Ok(())
            }
            None => Err(unknown_upload(upload_id)),
        }
    }

    fn finish_upload(&self, upload_id: &UploadId) -> DocketResult<String> {
        let (_, upload) = self
            .inner
            .uploads
            .remove(upload_id)
            .ok_or_else(|| unknown_upload(upload_id))?;

        if upload.data.len() != upload.total_bytes {
            log::error!(
                "Upload {} ended after {} of {} bytes",
                upload_id,
                upload.data.len(),
                upload.total_bytes
            );
            return Err(DocketError::new(
                &format!("Upload {} is incomplete", upload_id),
                ErrorKind::StorageError,
            ));
        }

        let url = self.url(&upload.path);
        self.inner.objects.insert(upload.path, upload.data);
        Ok(url)
    }

    fn abort_upload(&self, upload_id: &UploadId) -> DocketResult<()> {
        self.inner.uploads.remove(upload_id);
        Ok(())
    }

    fn download_url(&self, path: &str) -> DocketResult<String> {
        if self.inner.objects.contains_key(path) {
            Ok(self.url(path))
        } else {
            log::error!("No object at {}", path);
            Err(DocketError::new(
                &format!("No object at {}", path),
                ErrorKind::StorageError,
            ))
        }
    }
}

fn unknown_upload(upload_id: &UploadId) -> DocketError {
    log::error!("Unknown upload {}", upload_id);
    DocketError::new(
        &format!("Unknown upload {}", upload_id),
        ErrorKind::StorageError,
    )
}
