//! Variables sourced from a just-tracked analytics event.
//!
//! | Variable | Value |
//! |---|---|
//! | `e.name` | event name (Text) |
//! | `e.label` | event label (Text or Nil) |
//! | `e.tags` | event tags (Set) |
//! | `e.attr['key']` | attribute `key`, matched case-insensitively |

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::EvaluationContext;
use crate::value::Value;

/// An analytics event as seen by the targeting engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl EventData {
    pub fn new(name: impl Into<String>) -> Self {
        EventData {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key).or_else(|| {
            self.attributes
                .iter()
                .find(|(k, _)| k.to_lowercase() == key.to_lowercase())
                .map(|(_, v)| v)
        })
    }
}

pub struct EventContext<'a> {
    event: &'a EventData,
}

impl<'a> EventContext<'a> {
    pub fn new(event: &'a EventData) -> Self {
        EventContext { event }
    }
}

/// Extracts `key` from `e.attr['key']` or `e.attr["key"]`.
fn attribute_key(name: &str) -> Option<&str> {
    let inner = name.strip_prefix("e.attr[")?.strip_suffix(']')?;
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

impl EvaluationContext for EventContext<'_> {
    fn resolve(&mut self, name: &str) -> Option<Value> {
        match name {
            "e.name" => Some(Value::Text(self.event.name.clone())),
            "e.label" => Some(
                self.event
                    .label
                    .clone()
                    .map(Value::Text)
                    .unwrap_or(Value::Nil),
            ),
            "e.tags" => Some(Value::Set(self.event.tags.clone())),
            _ => {
                let key = attribute_key(name)?;
                match self.event.attribute(key) {
                    Some(json) => Value::from_json(json),
                    None => Some(Value::Nil),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> EventData {
        EventData::new("PURCHASE")
            .with_label("checkout")
            .with_tag("promo")
            .with_tag("summer")
            .with_attribute("Amount", json!(12.5))
            .with_attribute("currency", json!("EUR"))
            .with_attribute("items", json!(["a", "b"]))
            .with_attribute("meta", json!({"nested": true}))
    }

    #[test]
    fn resolves_name_label_and_tags() {
        let data = event();
        let mut ctx = EventContext::new(&data);
        assert_eq!(ctx.resolve("e.name"), Some(Value::text("PURCHASE")));
        assert_eq!(ctx.resolve("e.label"), Some(Value::text("checkout")));
        assert_eq!(ctx.resolve("e.tags"), Some(Value::set(["promo", "summer"])));
    }

    #[test]
    fn missing_label_is_nil() {
        let data = EventData::new("OPEN");
        let mut ctx = EventContext::new(&data);
        assert_eq!(ctx.resolve("e.label"), Some(Value::Nil));
    }

    #[test]
    fn attribute_lookup_is_case_insensitive() {
        let data = event();
        let mut ctx = EventContext::new(&data);
        assert_eq!(ctx.resolve("e.attr['amount']"), Some(Value::Number(12.5)));
        assert_eq!(ctx.resolve("e.attr[\"CURRENCY\"]"), Some(Value::text("EUR")));
        assert_eq!(ctx.resolve("e.attr['items']"), Some(Value::set(["a", "b"])));
        assert_eq!(ctx.resolve("e.attr['absent']"), Some(Value::Nil));
    }

    #[test]
    fn unsupported_shapes_and_other_names_fall_through() {
        let data = event();
        let mut ctx = EventContext::new(&data);
        assert_eq!(ctx.resolve("e.attr['meta']"), None);
        assert_eq!(ctx.resolve("e.attr[amount]"), None);
        assert_eq!(ctx.resolve("c.age"), None);
    }
}
