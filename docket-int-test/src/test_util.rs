use docket::collection::{CollectionPath, Document, EqualityFilter, FieldPatch, Fields};
use docket::docket::Docket;
use docket::errors::{DocketError, DocketResult, ErrorKind};
use docket::storage::InMemoryBlobStore;
use docket::store::memory::{InMemoryStore, InMemoryStoreConfig};
use docket::store::{DocumentStoreProvider, ListenerId, SnapshotListener, WriteBatch};
use fake::faker::lorem::en::Word;
use fake::faker::name::en::Name;
use fake::Fake;
use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Runs a test with retry logic and error handling.
/// Tests run on the current thread; subscription delivery happens on the store's workers.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> DocketResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> DocketResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> DocketResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => match after(ctx) {
                        Ok(_) => Ok(()),
                        Err(e) => Err((format!("After run failed: {:?}", e), backtrace.to_string())),
                    },
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        let error = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                last_backtrace = Some(Backtrace::capture().to_string());
                if let Some(s) = panic_err.downcast_ref::<&str>() {
                    format!("Panic: {}", s)
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    format!("Panic: {}", s)
                } else {
                    "Panic: unknown payload".to_string()
                }
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", error);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(error);
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    prefix: String,
    docket: Docket,
    store: FlakyStore,
    blob_store: InMemoryBlobStore,
}

impl TestContext {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn docket(&self) -> Docket {
        self.docket.clone()
    }

    /// The store behind the client, for fault injection and raw reads.
    pub fn store(&self) -> FlakyStore {
        self.store.clone()
    }

    pub fn blob_store(&self) -> InMemoryBlobStore {
        self.blob_store.clone()
    }

    /// Backend path of a collection under this context's prefix.
    pub fn backend_path(&self, collection: &str) -> DocketResult<CollectionPath> {
        CollectionPath::new(&self.prefix, collection)
    }
}

/// A namespace unique to one test run.
pub fn random_prefix() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("TEST_{}_", &id[..8])
}

pub fn create_test_context() -> DocketResult<TestContext> {
    create_test_context_with(InMemoryStoreConfig::new())
}

/// Context over an in-memory store built from `store_config`.
pub fn create_test_context_with(store_config: InMemoryStoreConfig) -> DocketResult<TestContext> {
    let prefix = random_prefix();
    let store = FlakyStore::new(InMemoryStore::new(store_config));
    let blob_store = InMemoryBlobStore::new("test-bucket");

    let docket = Docket::builder()
        .namespace_prefix(&prefix)
        .store(store.clone())
        .blob_store(blob_store.clone())
        .open()?;

    Ok(TestContext {
        prefix,
        docket,
        store,
        blob_store,
    })
}

pub fn cleanup(ctx: TestContext) -> DocketResult<()> {
    ctx.docket().close()
}

pub fn wait_for<F: Fn() -> bool>(timeout_ms: u64, check: F) {
    awaitility::at_most(Duration::from_millis(timeout_ms)).until(check);
}

/// `count` list items with generated names, numbered in `field2`.
pub fn fake_items(count: usize) -> DocketResult<Vec<Fields>> {
    let mut items = Vec::with_capacity(count);
    for n in 0..count {
        let mut item = Fields::new();
        item.put("field1", Word().fake::<String>())?;
        item.put("field2", n as i64)?;
        items.push(item);
    }
    Ok(items)
}

pub fn fake_user_name() -> String {
    Name().fake()
}

pub fn ids(documents: &[Document]) -> Vec<String> {
    documents.iter().map(|d| d.id().to_string()).collect()
}

/// Store operations a [FlakyStore] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Get,
    Query,
    Update,
    Delete,
    Listen,
}

/// An [InMemoryStore] that fails chosen operations on demand.
///
/// Commits are counted; `fail_commit(n, kind)` makes the n-th commit from
/// now (1-based) fail without writing anything.
#[derive(Clone)]
pub struct FlakyStore {
    inner: Arc<FlakyStoreInner>,
}

struct FlakyStoreInner {
    store: InMemoryStore,
    commits: AtomicUsize,
    commit_sizes: Mutex<Vec<usize>>,
    failing_commit: Mutex<Option<(usize, ErrorKind)>>,
    failing_ops: Mutex<Vec<(Operation, ErrorKind)>>,
}

impl FlakyStore {
    pub fn new(store: InMemoryStore) -> Self {
        FlakyStore {
            inner: Arc::new(FlakyStoreInner {
                store,
                commits: AtomicUsize::new(0),
                commit_sizes: Mutex::new(Vec::new()),
                failing_commit: Mutex::new(None),
                failing_ops: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn fail_commit(&self, nth: usize, kind: ErrorKind) {
        let target = self.inner.commits.load(Ordering::SeqCst) + nth;
        *self.inner.failing_commit.lock() = Some((target, kind));
    }

    pub fn fail(&self, operation: Operation, kind: ErrorKind) {
        self.inner.failing_ops.lock().push((operation, kind));
    }

    pub fn heal(&self) {
        *self.inner.failing_commit.lock() = None;
        self.inner.failing_ops.lock().clear();
    }

    /// Sizes of the batches committed so far, failed ones included.
    pub fn commit_sizes(&self) -> Vec<usize> {
        self.inner.commit_sizes.lock().clone()
    }

    fn check(&self, operation: Operation) -> DocketResult<()> {
        let failing = self
            .inner
            .failing_ops
            .lock()
            .iter()
            .find(|(op, _)| *op == operation)
            .map(|(_, kind)| kind.clone());
        match failing {
            Some(kind) => Err(DocketError::new(
                &format!("injected {:?} failure", operation),
                kind,
            )),
            None => Ok(()),
        }
    }
}

impl DocumentStoreProvider for FlakyStore {
    fn open(&self) -> DocketResult<()> {
        self.inner.store.open()
    }

    fn close(&self) -> DocketResult<()> {
        self.inner.store.close()
    }

    fn is_closed(&self) -> DocketResult<bool> {
        self.inner.store.is_closed()
    }

    fn add(&self, path: &CollectionPath, document: &FieldPatch) -> DocketResult<String> {
        self.check(Operation::Add)?;
        self.inner.store.add(path, document)
    }

    fn get(&self, path: &CollectionPath, id: &str) -> DocketResult<Option<Document>> {
        self.check(Operation::Get)?;
        self.inner.store.get(path, id)
    }

    fn query(
        &self,
        path: &CollectionPath,
        filter: Option<&EqualityFilter>,
    ) -> DocketResult<Vec<Document>> {
        self.check(Operation::Query)?;
        self.inner.store.query(path, filter)
    }

    fn update(&self, path: &CollectionPath, id: &str, patch: &FieldPatch) -> DocketResult<bool> {
        self.check(Operation::Update)?;
        self.inner.store.update(path, id, patch)
    }

    fn delete(&self, path: &CollectionPath, id: &str) -> DocketResult<bool> {
        self.check(Operation::Delete)?;
        self.inner.store.delete(path, id)
    }

    fn commit(&self, path: &CollectionPath, batch: WriteBatch) -> DocketResult<Vec<String>> {
        let count = self.inner.commits.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.commit_sizes.lock().push(batch.len());

        let failing = self.inner.failing_commit.lock().clone();
        if let Some((target, kind)) = failing {
            if target == count {
                return Err(DocketError::new(
                    &format!("injected failure of commit {}", count),
                    kind,
                ));
            }
        }
        self.inner.store.commit(path, batch)
    }

    fn listen(
        &self,
        path: &CollectionPath,
        filter: Option<EqualityFilter>,
        listener: SnapshotListener,
    ) -> DocketResult<ListenerId> {
        self.check(Operation::Listen)?;
        self.inner.store.listen(path, filter, listener)
    }

    fn unlisten(&self, listener_id: &ListenerId) -> DocketResult<()> {
        self.inner.store.unlisten(listener_id)
    }

    fn max_batch_size(&self) -> usize {
        self.inner.store.max_batch_size()
    }
}
