//! Field-level write operations
//!
//! The mutation vocabulary accepted by
//! [`CollectionStore::update`](super::CollectionStore::update). Ops are
//! applied in order, atomically per call, and broadcast as one snapshot.

use serde_json::{Map, Value};

use super::error::StoreError;

/// A single top-level field mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Replace (or insert) a field.
    Set { field: String, value: Value },

    /// Append to an array field unless an equal element already exists.
    /// A missing field is treated as an empty array.
    ArrayUnion { field: String, value: Value },

    /// Remove array elements whose `key_field` equals `key`.
    ///
    /// Entries are matched by key only, never by whole-value equality,
    /// so a denormalized copy that drifted from the live identity is
    /// still removed.
    ArrayRemoveByKey {
        field: String,
        key_field: String,
        key: Value,
    },
}

impl WriteOp {
    pub fn set(field: impl Into<String>, value: Value) -> Self {
        WriteOp::Set {
            field: field.into(),
            value,
        }
    }

    pub fn array_union(field: impl Into<String>, value: Value) -> Self {
        WriteOp::ArrayUnion {
            field: field.into(),
            value,
        }
    }

    pub fn array_remove_by_key(
        field: impl Into<String>,
        key_field: impl Into<String>,
        key: Value,
    ) -> Self {
        WriteOp::ArrayRemoveByKey {
            field: field.into(),
            key_field: key_field.into(),
            key,
        }
    }

    /// Apply this op to a document's top-level data.
    pub fn apply(&self, data: &mut Map<String, Value>) -> Result<(), StoreError> {
        match self {
            WriteOp::Set { field, value } => {
                data.insert(field.clone(), value.clone());
                Ok(())
            }
            WriteOp::ArrayUnion { field, value } => {
                let items = array_field_mut(data, field)?;
                if !items.contains(value) {
                    items.push(value.clone());
                }
                Ok(())
            }
            WriteOp::ArrayRemoveByKey {
                field,
                key_field,
                key,
            } => {
                let items = array_field_mut(data, field)?;
                items.retain(|item| match item {
                    Value::Object(entry) => entry.get(key_field) != Some(key),
                    other => other != key,
                });
                Ok(())
            }
        }
    }
}

fn array_field_mut<'a>(
    data: &'a mut Map<String, Value>,
    field: &str,
) -> Result<&'a mut Vec<Value>, StoreError> {
    let slot = data
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot {
        Value::Array(items) => Ok(items),
        _ => Err(StoreError::NotAnArray(field.to_string())),
    }
}
