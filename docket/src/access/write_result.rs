/// Outcome of [crate::access::CollectionAccess::create].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResult {
    pub success: bool,
    /// Id the store assigned to the new document.
    pub id: String,
}

/// Outcome of an update or field removal.
///
/// `matched` is `false` when no document had the id. Nothing is written in
/// that case and the call still succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub success: bool,
    pub matched: bool,
}

/// Outcome of [crate::access::CollectionAccess::delete].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    pub success: bool,
    /// Whether the document existed before the call.
    pub existed: bool,
}

/// Outcome of [crate::access::CollectionAccess::batch_write].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWriteResult {
    pub success: bool,
    /// Ids of the new documents in input order.
    pub ids: Vec<String>,
    /// Number of atomic commits issued.
    pub chunks: usize,
}
