use crate::access::{CollectionAccess, CreateResult, DeleteResult, UpdateResult};
use crate::collection::{field, Document, Fields, Snapshot, Subscription};
use crate::common::{Value, CREATED_AT, DOC_ID, IS_FAVORITE, LISTS_COLLECTION, USER_ID};
use crate::errors::{DocketError, DocketResult, ErrorKind};
use crate::lists::{field_key, items_path, order_lists, ListMetadata};
use std::collections::HashMap;

const COPY_SUFFIX: &str = " (Copie)";
const IMPORT_SUFFIX: &str = " (Import)";
const CSV_EXTENSION: &str = ".csv";

/// Outcome of a list import or duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub list_id: String,
    pub name: String,
    /// Number of items written to the new list.
    pub items: usize,
}

/// List and item operations built on [CollectionAccess].
///
/// Lists are documents of the `MesListes` collection; the items of a list
/// live in their own collection under [items_path].
#[derive(Clone)]
pub struct ListService {
    access: CollectionAccess,
}

impl ListService {
    pub fn new(access: CollectionAccess) -> Self {
        ListService { access }
    }

    pub fn create_list(&self, metadata: &ListMetadata) -> DocketResult<String> {
        let created = self.access.create(LISTS_COLLECTION, metadata.to_fields()?)?;
        log::debug!("Created list '{}' as {}", metadata.name, created.id);
        Ok(created.id)
    }

    pub fn get_list(&self, list_id: &str) -> DocketResult<Option<ListMetadata>> {
        match self.access.get(LISTS_COLLECTION, list_id)? {
            Some(document) => Ok(Some(ListMetadata::from_document(&document)?)),
            None => Ok(None),
        }
    }

    /// Renames the list or changes its color or columns.
    pub fn update_list(&self, metadata: &ListMetadata) -> DocketResult<UpdateResult> {
        let list_id = require_id(metadata)?;
        self.access
            .update(LISTS_COLLECTION, list_id, metadata.to_fields()?)
    }

    /// Deletes the list document. Its items are left in place.
    pub fn delete_list(&self, list_id: &str) -> DocketResult<DeleteResult> {
        self.access.delete(LISTS_COLLECTION, list_id)
    }

    /// Live view of the lists owned by `user_id`.
    ///
    /// Pass each snapshot to [ListService::lists_from_snapshot] for display
    /// order.
    pub fn owned_lists(&self, user_id: &str) -> DocketResult<Subscription> {
        self.access
            .subscribe(LISTS_COLLECTION, Some(field(USER_ID).eq(user_id)))
    }

    /// Reads a lists snapshot, pinned lists first then by name.
    ///
    /// Documents that are not valid lists are skipped.
    pub fn lists_from_snapshot(snapshot: &Snapshot) -> Vec<ListMetadata> {
        let mut lists: Vec<ListMetadata> = snapshot
            .iter()
            .filter_map(|document| match ListMetadata::from_document(document) {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    log::warn!("Skipping list {}: {}", document.id(), e);
                    None
                }
            })
            .collect();
        order_lists(&mut lists);
        lists
    }

    pub fn toggle_pin(&self, metadata: &ListMetadata) -> DocketResult<UpdateResult> {
        let list_id = require_id(metadata)?;
        let mut fields = Fields::new();
        fields.put("isPinned", !metadata.is_pinned)?;
        self.access.update(LISTS_COLLECTION, list_id, fields)
    }

    /// Live view of a list's items.
    pub fn items(&self, list_id: &str) -> DocketResult<Subscription> {
        self.access.subscribe(&items_path(list_id), None)
    }

    pub fn add_item(&self, list_id: &str, item: Fields) -> DocketResult<CreateResult> {
        self.access.create(&items_path(list_id), item)
    }

    pub fn update_item(&self, list_id: &str, item_id: &str, item: Fields) -> DocketResult<UpdateResult> {
        self.access.update(&items_path(list_id), item_id, item)
    }

    pub fn delete_item(&self, list_id: &str, item_id: &str) -> DocketResult<DeleteResult> {
        self.access.delete(&items_path(list_id), item_id)
    }

    pub fn toggle_favorite(&self, list_id: &str, item: &Document) -> DocketResult<UpdateResult> {
        let favorite = item.get(IS_FAVORITE).map(Value::is_truthy).unwrap_or(false);
        let mut fields = Fields::new();
        fields.put(IS_FAVORITE, !favorite)?;
        self.access.update(&items_path(list_id), item.id(), fields)
    }

    /// Adds a copy of an item as a new, non-favorite item with its own
    /// creation time.
    pub fn duplicate_item(&self, list_id: &str, item: &Document) -> DocketResult<CreateResult> {
        let mut copy = item.fields().without(&[IS_FAVORITE, CREATED_AT]);
        copy.put(IS_FAVORITE, false)?;
        self.access.create(&items_path(list_id), copy)
    }

    /// Copies a list and all its items under a new name ending in " (Copie)".
    pub fn duplicate_list(&self, list_id: &str, user_id: &str) -> DocketResult<ImportSummary> {
        let source = self.require_list(list_id)?;
        let name = format!("{}{}", source.name, COPY_SUFFIX);
        let new_id = self.create_list(&source.copy_as(&name, user_id))?;

        let items: Vec<Fields> = self
            .access
            .get_all(&items_path(list_id))?
            .into_iter()
            .map(Document::into_fields)
            .collect();
        let count = self.write_items(&new_id, items)?;

        log::debug!("Duplicated list {} into {} with {} items", list_id, new_id, count);
        Ok(ImportSummary {
            list_id: new_id,
            name,
            items: count,
        })
    }

    /// Creates a list from CSV text.
    ///
    /// Each header becomes a visible column `field1..N` and each row an item.
    /// A trailing `.csv` is dropped from `name`.
    pub fn import_csv(&self, name: &str, user_id: &str, csv: &str) -> DocketResult<ImportSummary> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(csv.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut items = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut item = Fields::new();
            for (index, value) in record.iter().enumerate().take(headers.len()) {
                item.put(field_key(index + 1), value)?;
            }
            items.push(item);
        }

        if headers.iter().all(|h| h.is_empty()) || items.is_empty() {
            log::error!("CSV import '{}' has no columns or no rows", name);
            return Err(DocketError::new(
                "CSV file is empty or invalid",
                ErrorKind::ValidationError,
            ));
        }

        let name = name.strip_suffix(CSV_EXTENSION).unwrap_or(name);
        let metadata = ListMetadata::new(name, user_id).with_labels(headers.as_slice());
        let list_id = self.create_list(&metadata)?;
        let count = self.write_items(&list_id, items)?;

        Ok(ImportSummary {
            list_id,
            name: name.to_string(),
            items: count,
        })
    }

    /// Restores a list from a JSON backup made by [ListService::export_json].
    ///
    /// The new list is named after the backup with " (Import)" appended and
    /// belongs to `user_id`. Ids in the backup are ignored.
    pub fn import_json(&self, user_id: &str, json: &str) -> DocketResult<ImportSummary> {
        let backup: serde_json::Value = serde_json::from_str(json)?;

        let metadata = backup.get("metadata").filter(|m| m.is_object());
        let items = backup.get("items").and_then(|i| i.as_array());
        let (metadata, items) = match (metadata, items) {
            (Some(metadata), Some(items)) => (metadata, items),
            _ => {
                log::error!("JSON backup must contain 'metadata' and 'items'");
                return Err(DocketError::new(
                    "JSON backup must contain 'metadata' and 'items'",
                    ErrorKind::ValidationError,
                ));
            }
        };

        let source = ListMetadata::from_fields(&Fields::from_json(&without_id(metadata))?)?;
        let name = format!("{}{}", source.name, IMPORT_SUFFIX);

        let items = items
            .iter()
            .map(|item| Fields::from_json(&without_id(item)))
            .collect::<DocketResult<Vec<_>>>()?;

        let list_id = self.create_list(&source.copy_as(&name, user_id))?;
        let count = self.write_items(&list_id, items)?;

        Ok(ImportSummary {
            list_id,
            name,
            items: count,
        })
    }

    /// Pretty-printed JSON backup `{ metadata, items }`; items carry no ids.
    pub fn export_json(&self, list_id: &str) -> DocketResult<String> {
        let metadata = self.require_list(list_id)?;
        let items: Vec<serde_json::Value> = self
            .access
            .get_all(&items_path(list_id))?
            .iter()
            .map(|item| item.fields().to_json())
            .collect();

        let backup = serde_json::json!({
            "metadata": metadata.to_json()?,
            "items": items,
        });
        Ok(serde_json::to_string_pretty(&backup)?)
    }

    /// CSV of a list's items with one column per configured field.
    ///
    /// Headers are the column labels in `fieldN` order; missing values are
    /// written as empty strings.
    pub fn export_csv(&self, list_id: &str) -> DocketResult<String> {
        let metadata = self.require_list(list_id)?;
        let keys = metadata.sorted_field_keys();
        let labels: Vec<&str> = keys
            .iter()
            .filter_map(|key| metadata.fields_config.get(key))
            .map(|config| config.label.as_str())
            .collect();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&labels)?;
        for item in self.access.get_all(&items_path(list_id))? {
            let row: Vec<String> = keys
                .iter()
                .map(|key| item.get(key).map(Value::to_plain_string).unwrap_or_default())
                .collect();
            writer.write_record(&row)?;
        }

        let bytes = writer.into_inner().map_err(|e| {
            log::error!("Failed to finish CSV export of {}: {}", list_id, e);
            DocketError::new(
                &format!("Failed to finish CSV export of {}", list_id),
                ErrorKind::EncodingError,
            )
        })?;
        Ok(String::from_utf8(bytes)?)
    }

    fn require_list(&self, list_id: &str) -> DocketResult<ListMetadata> {
        match self.get_list(list_id)? {
            Some(metadata) => Ok(metadata),
            None => {
                log::error!("List {} does not exist", list_id);
                Err(DocketError::new(
                    &format!("List {} does not exist", list_id),
                    ErrorKind::InvalidArgument,
                ))
            }
        }
    }

    fn write_items(&self, list_id: &str, items: Vec<Fields>) -> DocketResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let result = self.access.batch_write(&items_path(list_id), items)?;
        Ok(result.ids.len())
    }
}

fn require_id(metadata: &ListMetadata) -> DocketResult<&str> {
    match metadata.id.as_deref() {
        Some(id) => Ok(id),
        None => {
            log::error!("List '{}' has not been saved", metadata.name);
            Err(DocketError::new(
                &format!("List '{}' has not been saved", metadata.name),
                ErrorKind::InvalidArgument,
            ))
        }
    }
}

fn without_id(json: &serde_json::Value) -> serde_json::Value {
    let mut json = json.clone();
    if let Some(map) = json.as_object_mut() {
        map.remove(DOC_ID);
    }
    json
}

/// Column labels keyed by field, for callers that render a table.
pub fn column_labels(metadata: &ListMetadata) -> HashMap<String, String> {
    metadata
        .fields_config
        .iter()
        .map(|(key, config)| (key.clone(), config.label.clone()))
        .collect()
}
