use crate::common::{PATH_SEPARATOR, UPLOAD_CHUNK_SIZE};
use crate::errors::{DocketError, DocketResult, ErrorKind};
use std::fmt::{Debug, Display};
use std::ops::Deref;
use std::sync::Arc;

/// Identifies an upload between [BlobStoreProvider::begin_upload] and
/// [BlobStoreProvider::finish_upload].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadId(String);

impl UploadId {
    pub fn new() -> Self {
        UploadId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress of a running upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    pub bytes_transferred: usize,
    pub total_bytes: usize,
    /// Share of bytes transferred, 0 to 100. An empty file counts as done.
    pub percent: f64,
}

impl UploadProgress {
    fn new(bytes_transferred: usize, total_bytes: usize) -> Self {
        let percent = if total_bytes == 0 {
            100.0
        } else {
            bytes_transferred as f64 / total_bytes as f64 * 100.0
        };
        UploadProgress {
            bytes_transferred,
            total_bytes,
            percent,
        }
    }
}

/// A blob store that accepts resumable uploads and serves download URLs.
pub trait BlobStoreProvider: Send + Sync {
    /// Starts an upload of `total_bytes` bytes to `path`.
    fn begin_upload(&self, path: &str, total_bytes: usize) -> DocketResult<UploadId>;

    /// Appends the next chunk of an upload.
    fn upload_chunk(&self, upload_id: &UploadId, bytes: &[u8]) -> DocketResult<()>;

    /// Completes an upload and returns the download URL of the stored object.
    fn finish_upload(&self, upload_id: &UploadId) -> DocketResult<String>;

    /// Discards an unfinished upload. Unknown ids are ignored.
    fn abort_upload(&self, upload_id: &UploadId) -> DocketResult<()>;

    /// Returns the download URL of a stored object.
    fn download_url(&self, path: &str) -> DocketResult<String>;
}

/// Cloneable handle to a [BlobStoreProvider].
#[derive(Clone)]
pub struct BlobStore {
    inner: Arc<dyn BlobStoreProvider>,
    chunk_size: usize,
}

impl BlobStore {
    pub fn new<T: BlobStoreProvider + 'static>(inner: T) -> Self {
        BlobStore {
            inner: Arc::new(inner),
            chunk_size: UPLOAD_CHUNK_SIZE,
        }
    }

    /// Sets how many bytes each upload chunk carries.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Uploads `bytes` as `dir/file_name` and returns its download URL.
    ///
    /// The upload runs in chunks; `on_progress` is called after each one.
    ///
    /// # Errors
    ///
    /// Every failure is reported as [ErrorKind::StorageError] with the
    /// provider's error as cause. A failed upload is aborted.
    ///
    /// ```ignore
    /// let url = blob_store.upload_file("receipts", "march.pdf", &bytes, |p| {
    ///     println!("{:.0}%", p.percent);
    /// })?;
    /// ```
    pub fn upload_file(
        &self,
        dir: &str,
        file_name: &str,
        bytes: &[u8],
        mut on_progress: impl FnMut(UploadProgress),
    ) -> DocketResult<String> {
        let path = object_path(dir, file_name)?;
        let total_bytes = bytes.len();

        let upload_id = self
            .inner
            .begin_upload(&path, total_bytes)
            .map_err(|e| storage_error(&path, e))?;

        let mut transferred = 0;
        let mut chunks = bytes.chunks(self.chunk_size).peekable();
        if chunks.peek().is_none() {
            on_progress(UploadProgress::new(0, 0));
        }

        for chunk in chunks {
            if let Err(e) = self.inner.upload_chunk(&upload_id, chunk) {
                self.abort(&upload_id);
                return Err(storage_error(&path, e));
            }
            transferred += chunk.len();
            let progress = UploadProgress::new(transferred, total_bytes);
            log::debug!("Upload of {} is {:.1}% done", path, progress.percent);
            on_progress(progress);
        }

        match self.inner.finish_upload(&upload_id) {
            Ok(url) => Ok(url),
            Err(e) => {
                self.abort(&upload_id);
                Err(storage_error(&path, e))
            }
        }
    }

    fn abort(&self, upload_id: &UploadId) {
        if let Err(e) = self.inner.abort_upload(upload_id) {
            log::warn!("Failed to abort upload {}: {}", upload_id, e);
        }
    }
}

impl Deref for BlobStore {
    type Target = Arc<dyn BlobStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

fn object_path(dir: &str, file_name: &str) -> DocketResult<String> {
    if file_name.is_empty() || file_name.contains(PATH_SEPARATOR) {
        log::error!("Invalid file name '{}'", file_name);
        return Err(DocketError::new(
            &format!("Invalid file name '{}'", file_name),
            ErrorKind::StorageError,
        ));
    }

    let dir = dir.trim_matches(PATH_SEPARATOR);
    if dir.is_empty() {
        Ok(file_name.to_string())
    } else {
        Ok(format!("{}{}{}", dir, PATH_SEPARATOR, file_name))
    }
}

fn storage_error(path: &str, cause: DocketError) -> DocketError {
    log::error!("Upload of {} failed: {}", path, cause);
    DocketError::new_with_cause(
        &format!("Upload of {} failed", path),
        ErrorKind::StorageError,
        cause,
    )
}
