use crate::common::{Value, DOC_ID, RESERVED_FIELDS};
use crate::errors::{DocketError, DocketResult, ErrorKind};
use im::OrdMap;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

/// The open set of named values a document carries, excluding its id.
///
/// Fields are schemaless: any field name maps to any [Value]. Names are
/// top-level only; nested data lives inside [Value::Map].
///
/// The field `id` is reserved. A document's id is assigned by the store and
/// travels beside the fields, never inside them.
///
/// Backed by `im::OrdMap`, so cloning a field set for a snapshot is cheap and
/// mutations never affect earlier clones.
#[derive(Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Fields {
    data: OrdMap<String, Value>,
}

impl Fields {
    pub fn new() -> Self {
        Fields {
            data: OrdMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::InvalidFieldName] if the key is empty or reserved.
    ///
    /// ```ignore
    /// let mut fields = Fields::new();
    /// fields.put("name", "Groceries")?;
    /// fields.put("count", 3)?;
    /// assert_eq!(fields.len(), 2);
    /// ```
    pub fn put<'a, T: Into<Value>>(
        &mut self,
        key: impl Into<Cow<'a, str>>,
        value: T,
    ) -> DocketResult<()> {
        let key = key.into();
        validate_field_name(&key)?;
        self.data.insert(key.into_owned(), value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Removes a field. Removing an absent field is not an error.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Merges `other` over these fields.
    ///
    /// Top-level values from `other` replace existing ones wholesale; nested
    /// maps are not merged recursively. This is the behaviour of a partial
    /// update against the managed backend.
    pub fn merge(&mut self, other: &Fields) {
        for (key, value) in other.data.iter() {
            self.data.insert(key.clone(), value.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Returns a copy without the given fields.
    pub fn without(&self, keys: &[&str]) -> Fields {
        let mut data = self.data.clone();
        for key in keys {
            data.remove(*key);
        }
        Fields { data }
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.data.into_iter().collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Reads fields from a JSON object.
    ///
    /// # Errors
    ///
    /// Fails with [ErrorKind::EncodingError] if `json` is not an object and
    /// with [ErrorKind::InvalidFieldName] if it carries a reserved field.
    pub fn from_json(json: &serde_json::Value) -> DocketResult<Fields> {
        let object = match json.as_object() {
            Some(object) => object,
            None => {
                log::error!("Expected a JSON object for document fields, found {}", json);
                return Err(DocketError::new(
                    "Expected a JSON object for document fields",
                    ErrorKind::EncodingError,
                ));
            }
        };

        let mut fields = Fields::new();
        for (key, value) in object {
            fields.put(key.as_str(), Value::from_json(value)?)?;
        }
        Ok(fields)
    }
}

impl Debug for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl TryFrom<BTreeMap<String, Value>> for Fields {
    type Error = DocketError;

    fn try_from(map: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        let mut fields = Fields::new();
        for (key, value) in map {
            fields.put(key, value)?;
        }
        Ok(fields)
    }
}

/// A document as read back from a collection: its store-assigned id and its fields.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    id: String,
    fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Document {
            id: id.into(),
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Returns the document as one JSON object with the id under `id`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut json = self.fields.to_json();
        if let serde_json::Value::Object(map) = &mut json {
            map.insert(DOC_ID.to_string(), serde_json::Value::String(self.id.clone()));
        }
        json
    }
}

/// Checks that `name` can be used as a field name.
pub fn validate_field_name(name: &str) -> DocketResult<()> {
    if name.trim().is_empty() {
        log::error!("Field name cannot be empty");
        return Err(DocketError::new(
            "Field name cannot be empty",
            ErrorKind::InvalidFieldName,
        ));
    }

    if RESERVED_FIELDS.contains(&name) {
        log::error!("Field name {} is reserved", name);
        return Err(DocketError::new(
            &format!("Field name {} is reserved", name),
            ErrorKind::InvalidFieldName,
        ));
    }
    Ok(())
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates [Fields] with JSON-like syntax.
///
/// ```rust
/// use docket::fields;
///
/// let empty = fields!{};
///
/// let item = fields!{
///     field1: "Milk",
///     field2: (2 * 3),
///     isFavorite: false,
///     tags: ["dairy", "weekly"],
///     config: {
///         visible: true,
///     },
/// };
/// assert_eq!(item.len(), 5);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::collection::Fields::new()
    };

    ({}) => {
        $crate::collection::Fields::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::fields!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::field_value;

            let mut fields = $crate::collection::Fields::new();
            $(
                fields.put($crate::collection::normalize(stringify!($key)), $crate::field_value!($value))
                    .expect(&format!("Failed to put field {}", stringify!($key)));
            )*
            fields
        }
    };
}

/// Helper macro converting values for [fields!].
#[macro_export]
macro_rules! field_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Map($crate::fields!($($key : $value),*).into_map())
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::field_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
