//! Custom user attributes (`c.`) and tag collections (`t.`).
//!
//! Attribute storage is an external collaborator reached through
//! [`UserAttributeSource`]. Values are stored as text plus a declared
//! kind and decoded on lookup; anything that fails to decode as its
//! declared kind, or was marked deleted, resolves to `Nil`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::EvaluationContext;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    String,
    Number,
    Bool,
    Url,
    /// Unix epoch milliseconds.
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttribute {
    pub kind: AttributeKind,
    pub raw: String,
    #[serde(default)]
    pub deleted: bool,
}

impl StoredAttribute {
    pub fn new(kind: AttributeKind, raw: impl Into<String>) -> Self {
        StoredAttribute {
            kind,
            raw: raw.into(),
            deleted: false,
        }
    }

    /// Decodes the stored text as its declared kind.
    pub fn decode(&self) -> Value {
        if self.deleted {
            return Value::Nil;
        }
        match self.kind {
            AttributeKind::String | AttributeKind::Url => Value::Text(self.raw.clone()),
            AttributeKind::Number => self
                .raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Number)
                .unwrap_or(Value::Nil),
            AttributeKind::Bool => match self.raw.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::Nil,
            },
            AttributeKind::Date => self
                .raw
                .parse::<i64>()
                .map(|ms| Value::Number(ms as f64))
                .unwrap_or(Value::Nil),
        }
    }
}

/// Read access to the user profile store.
pub trait UserAttributeSource {
    /// Attribute by lowercase key.
    fn attribute(&self, key: &str) -> Option<StoredAttribute>;

    /// Tag collection by lowercase name.
    fn tag_collection(&self, name: &str) -> Option<BTreeSet<String>>;

    /// Serialized view of every live attribute and tag collection.
    fn snapshot(&self) -> serde_json::Value;
}

impl<T: UserAttributeSource + ?Sized> UserAttributeSource for &T {
    fn attribute(&self, key: &str) -> Option<StoredAttribute> {
        (**self).attribute(key)
    }

    fn tag_collection(&self, name: &str) -> Option<BTreeSet<String>> {
        (**self).tag_collection(name)
    }

    fn snapshot(&self) -> serde_json::Value {
        (**self).snapshot()
    }
}

// ──────────────────────────────────────────────
// InMemoryUserAttributes
// ──────────────────────────────────────────────

/// Attribute source held in memory. Keys and collection names are
/// normalized to lowercase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryUserAttributes {
    #[serde(default)]
    attributes: BTreeMap<String, StoredAttribute>,
    #[serde(default)]
    tags: BTreeMap<String, BTreeSet<String>>,
}

impl InMemoryUserAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, attribute: StoredAttribute) {
        self.attributes.insert(key.to_lowercase(), attribute);
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.set(key, StoredAttribute::new(AttributeKind::String, value));
    }

    pub fn set_number(&mut self, key: &str, value: f64) {
        self.set(key, StoredAttribute::new(AttributeKind::Number, value.to_string()));
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, StoredAttribute::new(AttributeKind::Bool, value.to_string()));
    }

    pub fn set_url(&mut self, key: &str, value: &str) {
        self.set(key, StoredAttribute::new(AttributeKind::Url, value));
    }

    pub fn set_date(&mut self, key: &str, epoch_ms: i64) {
        self.set(key, StoredAttribute::new(AttributeKind::Date, epoch_ms.to_string()));
    }

    /// Marks an attribute deleted; it keeps its row but resolves to `Nil`.
    pub fn delete(&mut self, key: &str) {
        if let Some(attr) = self.attributes.get_mut(&key.to_lowercase()) {
            attr.deleted = true;
        }
    }

    pub fn add_tag(&mut self, collection: &str, tag: &str) {
        self.tags
            .entry(collection.to_lowercase())
            .or_default()
            .insert(tag.to_string());
    }

    pub fn remove_tag(&mut self, collection: &str, tag: &str) {
        if let Some(set) = self.tags.get_mut(&collection.to_lowercase()) {
            set.remove(tag);
        }
    }

    pub fn clear_tags(&mut self, collection: &str) {
        self.tags.remove(&collection.to_lowercase());
    }
}

impl UserAttributeSource for InMemoryUserAttributes {
    fn attribute(&self, key: &str) -> Option<StoredAttribute> {
        self.attributes.get(key).cloned()
    }

    fn tag_collection(&self, name: &str) -> Option<BTreeSet<String>> {
        self.tags.get(name).cloned()
    }

    fn snapshot(&self) -> serde_json::Value {
        let attributes: serde_json::Map<String, serde_json::Value> = self
            .attributes
            .iter()
            .filter(|(_, a)| !a.deleted)
            .map(|(k, a)| {
                (
                    k.clone(),
                    serde_json::json!({ "type": a.kind, "value": a.decode().to_json() }),
                )
            })
            .collect();
        serde_json::json!({
            "attributes": attributes,
            "tags": self.tags,
        })
    }
}

// ──────────────────────────────────────────────
// UserAttributeContext
// ──────────────────────────────────────────────

pub struct UserAttributeContext<S> {
    source: S,
}

impl<S: UserAttributeSource> UserAttributeContext<S> {
    pub fn new(source: S) -> Self {
        UserAttributeContext { source }
    }
}

impl<S: UserAttributeSource> EvaluationContext for UserAttributeContext<S> {
    fn resolve(&mut self, name: &str) -> Option<Value> {
        if let Some(key) = name.strip_prefix("c.") {
            let value = self
                .source
                .attribute(&key.to_lowercase())
                .map(|a| a.decode())
                .unwrap_or(Value::Nil);
            return Some(value);
        }
        if let Some(collection) = name.strip_prefix("t.") {
            let value = self
                .source
                .tag_collection(&collection.to_lowercase())
                .map(Value::Set)
                .unwrap_or(Value::Nil);
            return Some(value);
        }
        None
    }
}
