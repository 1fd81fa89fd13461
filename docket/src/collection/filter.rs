use crate::collection::Document;
use crate::common::Value;
use std::fmt::Display;

/// Starts an equality filter on a field.
///
/// ```ignore
/// let mine = field("userId").eq("u1");
/// let subscription = access.subscribe("MesListes", Some(mine))?;
/// ```
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

/// A filter builder bound to one field.
pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    /// Matches documents whose field equals `value`.
    pub fn eq<T: Into<Value>>(self, value: T) -> EqualityFilter {
        EqualityFilter::new(self.field_name, value.into())
    }
}

/// Keeps documents where one field equals one value.
///
/// A document without the field never matches, not even a filter on
/// [Value::Null].
#[derive(Clone, Debug, PartialEq)]
pub struct EqualityFilter {
    field: String,
    value: Value,
}

impl EqualityFilter {
    pub fn new(field: impl Into<String>, value: Value) -> Self {
        EqualityFilter {
            field: field.into(),
            value,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn matches(&self, document: &Document) -> bool {
        document
            .get(&self.field)
            .map(|v| v == &self.value)
            .unwrap_or(false)
    }
}

impl Display for EqualityFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} == {})", self.field, self.value)
    }
}
