use crate::collection::{Document, Fields};
use crate::common::{
    Value, CREATED_AT, DEFAULT_LIST_COLOR, DOC_ID, FIELD_KEY_PREFIX, PATH_SEPARATOR, USER_ID,
};
use crate::errors::{DocketError, DocketResult, ErrorKind};
use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::BTreeMap;

const NAME: &str = "name";
const COLOR: &str = "color";
const IS_PINNED: &str = "isPinned";
const FIELDS_CONFIG: &str = "fieldsConfig";
const FIELD_LABELS: &str = "fieldLabels";
const LABEL: &str = "label";
const VISIBLE: &str = "visible";

/// Label and visibility of one column of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConfig {
    pub label: String,
    pub visible: bool,
}

impl FieldConfig {
    pub fn new(label: &str) -> Self {
        FieldConfig {
            label: label.to_string(),
            visible: true,
        }
    }

    fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert(LABEL.to_string(), Value::from(self.label.as_str()));
        map.insert(VISIBLE.to_string(), Value::Bool(self.visible));
        Value::Map(map)
    }

    fn from_value(value: &Value) -> Option<FieldConfig> {
        let map = value.as_map()?;
        let label = map.get(LABEL)?.as_str()?.to_string();
        let visible = map.get(VISIBLE).map(|v| v.is_truthy()).unwrap_or(true);
        Some(FieldConfig { label, visible })
    }
}

/// A user's list: its name, owner, color, pin and column layout.
///
/// Items live in the collection returned by [items_path]. Column keys take
/// the form `field1`, `field2` and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct ListMetadata {
    pub id: Option<String>,
    pub name: String,
    pub user_id: String,
    pub color: String,
    pub is_pinned: bool,
    pub fields_config: BTreeMap<String, FieldConfig>,
    created_at: Option<Value>,
}

impl ListMetadata {
    pub fn new(name: &str, user_id: &str) -> Self {
        ListMetadata {
            id: None,
            name: name.to_string(),
            user_id: user_id.to_string(),
            color: DEFAULT_LIST_COLOR.to_string(),
            is_pinned: false,
            fields_config: BTreeMap::new(),
            created_at: None,
        }
    }

    /// Builds columns `field1..N` from labels, all visible.
    pub fn with_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        self.fields_config = labels
            .iter()
            .enumerate()
            .map(|(index, label)| (field_key(index + 1), FieldConfig::new(label.as_ref())))
            .collect();
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    /// A new, unpinned list with this list's columns and color.
    pub fn copy_as(&self, name: &str, user_id: &str) -> ListMetadata {
        ListMetadata {
            id: None,
            name: name.to_string(),
            user_id: user_id.to_string(),
            color: self.color.clone(),
            is_pinned: false,
            fields_config: self.fields_config.clone(),
            created_at: None,
        }
    }

    /// Reads list metadata from a stored document.
    pub fn from_document(document: &Document) -> DocketResult<ListMetadata> {
        let mut metadata = ListMetadata::from_fields(document.fields())?;
        metadata.id = Some(document.id().to_string());
        Ok(metadata)
    }

    /// Reads list metadata from raw fields.
    ///
    /// Older lists only carry `fieldLabels`; those become a visible column
    /// each. A missing color falls back to the default.
    pub fn from_fields(fields: &Fields) -> DocketResult<ListMetadata> {
        let name = match fields.get(NAME).and_then(|v| v.as_str()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                log::error!("List metadata has no name");
                return Err(DocketError::new(
                    "List metadata has no name",
                    ErrorKind::ValidationError,
                ));
            }
        };

        let mut fields_config = BTreeMap::new();
        if let Some(config) = fields.get(FIELDS_CONFIG).and_then(|v| v.as_map()) {
            for (key, value) in config {
                match FieldConfig::from_value(value) {
                    Some(field_config) => {
                        fields_config.insert(key.clone(), field_config);
                    }
                    None => log::warn!("Ignoring malformed column {} of list {}", key, name),
                }
            }
        } else if let Some(labels) = fields.get(FIELD_LABELS).and_then(|v| v.as_map()) {
            for (key, label) in labels {
                fields_config.insert(key.clone(), FieldConfig::new(&label.to_plain_string()));
            }
        }

        Ok(ListMetadata {
            id: None,
            name,
            user_id: fields
                .get(USER_ID)
                .map(|v| v.to_plain_string())
                .unwrap_or_default(),
            color: fields
                .get(COLOR)
                .and_then(|v| v.as_str())
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_LIST_COLOR)
                .to_string(),
            is_pinned: fields.get(IS_PINNED).map(|v| v.is_truthy()).unwrap_or(false),
            fields_config,
            created_at: fields.get(CREATED_AT).cloned(),
        })
    }

    /// Fields to store for this list.
    ///
    /// `fieldLabels` is written next to `fieldsConfig` so older readers keep
    /// working.
    pub fn to_fields(&self) -> DocketResult<Fields> {
        let mut fields = Fields::new();
        fields.put(NAME, self.name.as_str())?;
        fields.put(USER_ID, self.user_id.as_str())?;
        fields.put(COLOR, self.color.as_str())?;
        fields.put(IS_PINNED, self.is_pinned)?;

        let config: BTreeMap<String, Value> = self
            .fields_config
            .iter()
            .map(|(key, config)| (key.clone(), config.to_value()))
            .collect();
        let labels: BTreeMap<String, Value> = self
            .fields_config
            .iter()
            .map(|(key, config)| (key.clone(), Value::from(config.label.as_str())))
            .collect();
        fields.put(FIELDS_CONFIG, config)?;
        fields.put(FIELD_LABELS, labels)?;
        Ok(fields)
    }

    /// JSON form used in backups, including the id when known.
    pub fn to_json(&self) -> DocketResult<serde_json::Value> {
        let mut json = self.to_fields()?.to_json();
        if let Some(map) = json.as_object_mut() {
            if let Some(id) = &self.id {
                map.insert(DOC_ID.to_string(), serde_json::Value::String(id.clone()));
            }
            if let Some(created_at) = &self.created_at {
                map.insert(CREATED_AT.to_string(), created_at.to_json());
            }
        }
        Ok(json)
    }

    /// Column keys ordered by their numeric suffix.
    pub fn sorted_field_keys(&self) -> Vec<String> {
        self.fields_config
            .keys()
            .cloned()
            .sorted_by_key(|key| field_index(key))
            .collect()
    }

    /// Visible column keys ordered by their numeric suffix.
    pub fn visible_field_keys(&self) -> Vec<String> {
        self.sorted_field_keys()
            .into_iter()
            .filter(|key| self.fields_config.get(key).is_some_and(|c| c.visible))
            .collect()
    }

    /// Key of the next column to add.
    pub fn next_field_key(&self) -> String {
        let last = self.fields_config.keys().map(|k| field_index(k)).max().unwrap_or(0);
        field_key(last.saturating_add(1))
    }
}

/// Numeric suffix of a `fieldN` key; keys without one sort first.
pub fn field_index(key: &str) -> usize {
    key.strip_prefix(FIELD_KEY_PREFIX)
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

pub fn field_key(index: usize) -> String {
    format!("{}{}", FIELD_KEY_PREFIX, index)
}

/// Collection holding the items of a list.
pub fn items_path(list_id: &str) -> String {
    format!("lists{}{}{}items", PATH_SEPARATOR, list_id, PATH_SEPARATOR)
}

/// Orders lists pinned first, then by name ignoring case.
pub fn order_lists(lists: &mut [ListMetadata]) {
    lists.sort_by(compare_lists);
}

fn compare_lists(a: &ListMetadata, b: &ListMetadata) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}
