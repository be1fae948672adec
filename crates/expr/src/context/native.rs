//! Read-only device and SDK facts, exposed under the `b.` prefix.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::EvaluationContext;
use crate::value::Value;

/// Device facts known at startup. Unset fields resolve to `Nil`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeAttributes {
    pub platform: Option<String>,
    pub os_version: Option<String>,
    pub app_version: Option<String>,
    pub app_build: Option<f64>,
    pub sdk_level: Option<f64>,
    pub language: Option<String>,
    pub region: Option<String>,
    pub device_model: Option<String>,
    pub installation_id: Option<String>,
    /// Additional facts, keyed without the `b.` prefix.
    #[serde(default)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

fn text(v: &Option<String>) -> Value {
    v.clone().map(Value::Text).unwrap_or(Value::Nil)
}

fn number(v: &Option<f64>) -> Value {
    v.map(Value::Number).unwrap_or(Value::Nil)
}

pub struct NativeAttributeContext<'a> {
    attributes: &'a NativeAttributes,
}

impl<'a> NativeAttributeContext<'a> {
    pub fn new(attributes: &'a NativeAttributes) -> Self {
        NativeAttributeContext { attributes }
    }
}

impl EvaluationContext for NativeAttributeContext<'_> {
    fn resolve(&mut self, name: &str) -> Option<Value> {
        let key = name.strip_prefix("b.")?;
        let a = self.attributes;
        let value = match key {
            "platform" => text(&a.platform),
            "os_version" => text(&a.os_version),
            "app_version" => text(&a.app_version),
            "app_build" => number(&a.app_build),
            "sdk_level" => number(&a.sdk_level),
            "language" => text(&a.language),
            "region" => text(&a.region),
            "device_model" => text(&a.device_model),
            "installation_id" => text(&a.installation_id),
            other => return a.extras.get(other).and_then(Value::from_json),
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_facts_under_prefix() {
        let attrs = NativeAttributes {
            platform: Some("ios".into()),
            app_build: Some(420.0),
            ..Default::default()
        };
        let mut ctx = NativeAttributeContext::new(&attrs);
        assert_eq!(ctx.resolve("b.platform"), Some(Value::text("ios")));
        assert_eq!(ctx.resolve("b.app_build"), Some(Value::Number(420.0)));
        assert_eq!(ctx.resolve("b.region"), Some(Value::Nil));
    }

    #[test]
    fn extras_and_unknown_names() {
        let mut attrs = NativeAttributes::default();
        attrs
            .extras
            .insert("push_optin".into(), serde_json::json!(true));
        let mut ctx = NativeAttributeContext::new(&attrs);
        assert_eq!(ctx.resolve("b.push_optin"), Some(Value::Bool(true)));
        assert_eq!(ctx.resolve("b.unknown"), None);
        assert_eq!(ctx.resolve("platform"), None);
    }
}
