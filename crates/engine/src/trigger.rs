//! Campaign triggers.
//!
//! A trigger answers one question: does this signal satisfy me? Event
//! triggers match structurally. Condition triggers additionally run an
//! expression against the variable context built for the signal.

use herald_expr::{EvaluationContext, Evaluator, Expression};

use crate::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Exact match on event name; `label`/`attributes` of `None` match anything.
    Event {
        name: String,
        label: Option<String>,
        attributes: Option<serde_json::Value>,
    },
    /// Start of the next session only.
    NextSession,
    /// Start of any session, including the one the campaigns were loaded in.
    SessionStart,
    CampaignsRefreshed,
    /// Expression evaluated on events (optionally one event name) and
    /// attribute changes.
    Condition {
        event: Option<String>,
        rule: Expression,
    },
    /// A condition whose rule failed to parse. Never satisfied.
    Never { reason: String },
}

impl Trigger {
    pub fn event(name: impl Into<String>) -> Self {
        Trigger::Event {
            name: name.into(),
            label: None,
            attributes: None,
        }
    }

    pub fn event_with(
        name: impl Into<String>,
        label: Option<&str>,
        attributes: Option<serde_json::Value>,
    ) -> Self {
        Trigger::Event {
            name: name.into(),
            label: label.map(str::to_string),
            attributes,
        }
    }

    /// Builds a condition trigger. A rule that does not parse is logged
    /// and yields [`Trigger::Never`].
    pub fn condition(event: Option<&str>, source: &str) -> Self {
        match Expression::parse(source) {
            Ok(rule) => Trigger::Condition {
                event: event.map(str::to_string),
                rule,
            },
            Err(e) => {
                tracing::warn!(rule = source, error = %e, "ignoring unparsable trigger condition");
                Trigger::Never {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_satisfied(
        &self,
        signal: &Signal,
        evaluator: &Evaluator,
        ctx: &mut dyn EvaluationContext,
    ) -> bool {
        match self {
            Trigger::Event {
                name,
                label,
                attributes,
            } => {
                let Some(event) = signal.event() else {
                    return false;
                };
                if event.name != *name {
                    return false;
                }
                if let Some(label) = label {
                    if event.label.as_deref() != Some(label.as_str()) {
                        return false;
                    }
                }
                match attributes {
                    None => true,
                    Some(serde_json::Value::Object(expected)) => {
                        expected.len() == event.attributes.len()
                            && expected.iter().all(|(k, v)| {
                                event.attributes.get(k).is_some_and(|actual| json_eq(v, actual))
                            })
                    }
                    Some(_) => false,
                }
            }
            Trigger::NextSession => matches!(signal, Signal::NewSession),
            Trigger::SessionStart => {
                matches!(signal, Signal::NewSession | Signal::CampaignsLoaded)
            }
            Trigger::CampaignsRefreshed => matches!(signal, Signal::CampaignsRefreshed),
            Trigger::Condition { event, rule } => {
                let applies = match signal {
                    Signal::Event(e) => event.as_deref().map_or(true, |name| e.name == name),
                    Signal::AttributeChanged => event.is_none(),
                    _ => false,
                };
                if !applies {
                    return false;
                }
                match rule.evaluate_bool(evaluator, ctx) {
                    Ok(satisfied) => satisfied,
                    Err(e) => {
                        tracing::warn!(rule = rule.source(), error = %e, "trigger condition failed to evaluate");
                        false
                    }
                }
            }
            Trigger::Never { .. } => false,
        }
    }
}

/// Deep JSON equality where numbers compare by value, so `1` equals `1.0`.
fn json_eq(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    use serde_json::Value;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
