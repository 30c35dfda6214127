//! Identity records as delivered by the identity service, and the immutable
//! snapshots handed to request handlers.
//!
//! The service decides the field set of a user record at runtime, so records
//! are string-keyed maps of [`Value`] and every field access is a fallible
//! lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use crate::types::Value;

/// A user record as returned by the identity service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityRecord {
    fields: BTreeMap<String, Value>,
}

impl IdentityRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Looks up a string field. Returns `None` if absent or not a string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Looks up a boolean field. Returns `None` if absent or not a boolean.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Looks up an integer field. Returns `None` if absent or not an integer.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// The record's `id` field, if present and a string.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// The record's `email` field, if present and a string.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copies only the named fields that are present into a new record.
    #[must_use]
    pub fn project(&self, names: &[&str]) -> Self {
        let fields = names
            .iter()
            .filter_map(|name| {
                self.fields
                    .get(*name)
                    .map(|value| ((*name).to_string(), value.clone()))
            })
            .collect();
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for IdentityRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Immutable point-in-time copy of an identity record.
///
/// Taken once per request at session bootstrap. Holds its own deep copy, so
/// later mutation or clearing of the live session is never visible through
/// it. Cloning shares the same frozen record.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySnapshot(Arc<IdentityRecord>);

impl IdentitySnapshot {
    /// Deep-copies `record` into a new snapshot.
    #[must_use]
    pub fn capture(record: &IdentityRecord) -> Self {
        Self(Arc::new(record.clone()))
    }

    /// Snapshot of an optional record; `None` stays `None`.
    #[must_use]
    pub fn capture_optional(record: Option<&IdentityRecord>) -> Option<Self> {
        record.map(Self::capture)
    }

    #[must_use]
    pub fn record(&self) -> &IdentityRecord {
        &self.0
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get_str(name)
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.id()
    }
}

impl Serialize for IdentitySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl PartialEq<IdentityRecord> for IdentitySnapshot {
    fn eq(&self, other: &IdentityRecord) -> bool {
        *self.0 == *other
    }
}
