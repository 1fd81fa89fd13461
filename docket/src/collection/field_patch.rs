use crate::collection::{validate_field_name, Fields};
use crate::common::{server_now, Value};
use crate::errors::DocketResult;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// What a partial update does to one field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldUpdate {
    /// Replaces the field's value, creating the field if absent.
    Set(Value),
    /// Removes the field from the document.
    Delete,
    /// Sets the field to the store's clock at the moment the write applies.
    ServerTimestamp,
}

/// A partial update: the set of fields to change and how.
///
/// Fields not named in the patch are left untouched. A field is removed only
/// when the patch says [FieldUpdate::Delete]; setting [Value::Null] keeps the
/// field with a null value.
///
/// ```ignore
/// let patch = FieldPatch::new()
///     .set("name", "Groceries")
///     .delete("legacy")
///     .server_timestamp("updatedAt");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldPatch {
    updates: BTreeMap<String, FieldUpdate>,
}

impl FieldPatch {
    pub fn new() -> Self {
        FieldPatch {
            updates: BTreeMap::new(),
        }
    }

    /// Builds a patch that sets every field in `fields`.
    pub fn from_fields(fields: &Fields) -> Self {
        let updates = fields
            .iter()
            .map(|(k, v)| (k.clone(), FieldUpdate::Set(v.clone())))
            .collect();
        FieldPatch { updates }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.updates
            .insert(field.to_string(), FieldUpdate::Set(value.into()));
        self
    }

    pub fn delete(mut self, field: &str) -> Self {
        self.updates.insert(field.to_string(), FieldUpdate::Delete);
        self
    }

    pub fn server_timestamp(mut self, field: &str) -> Self {
        self.updates
            .insert(field.to_string(), FieldUpdate::ServerTimestamp);
        self
    }

    pub fn insert(&mut self, field: &str, update: FieldUpdate) {
        self.updates.insert(field.to_string(), update);
    }

    pub fn get(&self, field: &str) -> Option<&FieldUpdate> {
        self.updates.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldUpdate)> {
        self.updates.iter()
    }

    /// Folds a later patch into this one; for a field named by both, the
    /// later update wins.
    pub fn merge(&mut self, later: &FieldPatch) {
        for (field, update) in later.updates.iter() {
            self.updates.insert(field.clone(), update.clone());
        }
    }

    /// Checks every field name in the patch.
    pub fn validate(&self) -> DocketResult<()> {
        for field in self.updates.keys() {
            validate_field_name(field)?;
        }
        Ok(())
    }

    /// Applies the patch to `fields`, resolving server timestamps to `now`.
    pub fn apply_at(&self, fields: &mut Fields, now: DateTime<Utc>) -> DocketResult<()> {
        for (field, update) in self.updates.iter() {
            match update {
                FieldUpdate::Set(value) => fields.put(field.as_str(), value.clone())?,
                FieldUpdate::Delete => {
                    fields.remove(field);
                }
                FieldUpdate::ServerTimestamp => fields.put(field.as_str(), now)?,
            }
        }
        Ok(())
    }

    /// Applies the patch to `fields` using the current server time.
    pub fn apply(&self, fields: &mut Fields) -> DocketResult<()> {
        self.apply_at(fields, server_now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::fields;

    #[test]
    fn test_apply_set_delete_and_timestamp() {
        let mut fields = fields! { name: "Old", legacy: 1, keep: true };
        let now = server_now();
        let patch = FieldPatch::new()
            .set("name", "New")
            .delete("legacy")
            .server_timestamp("updatedAt");
        patch.apply_at(&mut fields, now).unwrap();

        assert_eq!(fields.get("name"), Some(&Value::from("New")));
        assert!(!fields.contains_key("legacy"));
        assert_eq!(fields.get("keep"), Some(&Value::Bool(true)));
        assert_eq!(fields.get("updatedAt"), Some(&Value::Timestamp(now)));
    }

    #[test]
    fn test_set_null_keeps_field() {
        let mut fields = fields! { note: "x" };
        FieldPatch::new()
            .set("note", Value::Null)
            .apply(&mut fields)
            .unwrap();
        assert_eq!(fields.get("note"), Some(&Value::Null));
    }

    #[test]
    fn test_merge_later_wins() {
        let mut first = FieldPatch::new().set("a", 1).set("b", 1);
        let later = FieldPatch::new().set("b", 2).delete("c");
        first.merge(&later);
        assert_eq!(first.get("a"), Some(&FieldUpdate::Set(Value::Int(1))));
        assert_eq!(first.get("b"), Some(&FieldUpdate::Set(Value::Int(2))));
        assert_eq!(first.get("c"), Some(&FieldUpdate::Delete));
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_validate_rejects_reserved_field() {
        let patch = FieldPatch::new().set("id", "x");
        assert_eq!(
            patch.validate().unwrap_err().kind(),
            &ErrorKind::InvalidFieldName
        );
        assert!(FieldPatch::new().set("name", "x").validate().is_ok());
    }

    #[test]
    fn test_from_fields() {
        let patch = FieldPatch::from_fields(&fields! { a: 1, b: "x" });
        assert_eq!(patch.len(), 2);
        assert_eq!(patch.get("b"), Some(&FieldUpdate::Set(Value::from("x"))));
    }
}
