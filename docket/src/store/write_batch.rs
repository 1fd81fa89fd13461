use crate::collection::Fields;

/// A group of document additions committed atomically.
///
/// Either every document in the batch is added or none is. Stores cap the
/// size of one batch with [crate::store::DocumentStoreProvider::max_batch_size];
/// callers with more documents split them over several batches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    additions: Vec<Fields>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch {
            additions: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        WriteBatch {
            additions: Vec::with_capacity(capacity),
        }
    }

    /// Queues a new document.
    pub fn add(&mut self, fields: Fields) {
        self.additions.push(fields);
    }

    pub fn len(&self) -> usize {
        self.additions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fields> {
        self.additions.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = Fields;
    type IntoIter = std::vec::IntoIter<Fields>;

    fn into_iter(self) -> Self::IntoIter {
        self.additions.into_iter()
    }
}

impl From<Vec<Fields>> for WriteBatch {
    fn from(additions: Vec<Fields>) -> Self {
        WriteBatch { additions }
    }
}
