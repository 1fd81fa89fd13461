use crate::collection::Document;
use crate::common::{SortOrder, Value, CREATED_AT, DEFAULT_PAGE_SIZE, IS_FAVORITE};
use std::cmp::Ordering;

/// Column sort of a list view. No column means creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    column: Option<(String, SortOrder)>,
}

impl SortState {
    pub fn by(field: &str, order: SortOrder) -> Self {
        SortState {
            column: Some((field.to_string(), order)),
        }
    }

    pub fn field(&self) -> Option<&str> {
        self.column.as_ref().map(|(field, _)| field.as_str())
    }

    pub fn order(&self) -> Option<SortOrder> {
        self.column.as_ref().map(|(_, order)| *order)
    }

    /// Advances the sort after a click on `field`'s header: ascending, then
    /// descending, then back to creation order. Another column starts at
    /// ascending.
    pub fn cycle(&mut self, field: &str) {
        self.column = match self.column.take() {
            Some((current, SortOrder::Ascending)) if current == field => {
                Some((current, SortOrder::Descending))
            }
            Some((current, SortOrder::Descending)) if current == field => None,
            _ => Some((field.to_string(), SortOrder::Ascending)),
        };
    }
}

/// Client-side filtering, sorting and paging of a list's items.
///
/// ```ignore
/// let mut view = ListView::new().favorites_only(true).search("lait");
/// view.sort_mut().cycle("field1");
/// let page = view.page(&snapshot, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ListView {
    favorites_only: bool,
    search: String,
    sort: SortState,
    page_size: usize,
}

impl Default for ListView {
    fn default() -> Self {
        Self::new()
    }
}

impl ListView {
    pub fn new() -> Self {
        ListView {
            favorites_only: false,
            search: String::new(),
            sort: SortState::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn favorites_only(mut self, favorites_only: bool) -> Self {
        self.favorites_only = favorites_only;
        self
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search = term.to_lowercase();
        self
    }

    pub fn sort(mut self, sort: SortState) -> Self {
        self.sort = sort;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn sort_mut(&mut self) -> &mut SortState {
        &mut self.sort
    }

    /// Filters and sorts a snapshot.
    pub fn process(&self, items: &[Document]) -> Vec<Document> {
        let mut result: Vec<Document> = items
            .iter()
            .filter(|item| !self.favorites_only || is_favorite(item))
            .filter(|item| self.matches_search(item))
            .cloned()
            .collect();

        match &self.sort.column {
            Some((field, order)) => {
                result.sort_by(|a, b| order.apply(compare_text(a, b, field)));
            }
            None => {
                result.sort_by_key(created_seconds);
            }
        }
        result
    }

    /// Number of pages for `count` processed items; at least one.
    pub fn total_pages(&self, count: usize) -> usize {
        count.div_ceil(self.page_size).max(1)
    }

    /// Returns page `page` (starting at 1) of the processed snapshot.
    pub fn page(&self, items: &[Document], page: usize) -> Vec<Document> {
        let start = page.saturating_sub(1).saturating_mul(self.page_size);
        self.process(items)
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }

    fn matches_search(&self, item: &Document) -> bool {
        if self.search.is_empty() {
            return true;
        }
        item.id().to_lowercase().contains(&self.search)
            || item
                .fields()
                .iter()
                .any(|(_, value)| value.to_plain_string().to_lowercase().contains(&self.search))
    }
}

fn is_favorite(item: &Document) -> bool {
    item.get(IS_FAVORITE).map(Value::is_truthy).unwrap_or(false)
}

fn compare_text(a: &Document, b: &Document, field: &str) -> Ordering {
    let text = |doc: &Document| {
        doc.get(field)
            .filter(|v| v.is_truthy())
            .map(|v| v.to_plain_string().to_lowercase())
            .unwrap_or_default()
    };
    text(a).cmp(&text(b))
}

fn created_seconds(item: &Document) -> i64 {
    item.get(CREATED_AT)
        .and_then(Value::as_timestamp)
        .map(|ts| ts.timestamp())
        .unwrap_or(0)
}
