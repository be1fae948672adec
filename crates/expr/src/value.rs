//! Runtime values and expression tree nodes.
//!
//! A single enum serves as both the parsed tree and the result of
//! reducing it: literals reduce to themselves, `Variable` resolves
//! through a context, `Call` reduces through the operator registry.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::ExprError;

// ──────────────────────────────────────────────
// Value
// ──────────────────────────────────────────────

/// Expression value. Derived equality is the language's equality rule:
/// values of different kinds are never equal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    /// All numbers are floating point.
    Number(f64),
    Text(String),
    /// Deduplicated, unordered string set.
    Set(BTreeSet<String>),
    /// Unresolved variable reference.
    Variable(String),
    /// Named function, opaque until applied.
    Operator(String),
    /// S-expression; the first element must reduce to an `Operator`.
    Call(Vec<Value>),
    Error(ExprError),
}

impl Value {
    /// Returns a human-readable kind name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::Text(_) => "Text",
            Value::Set(_) => "Set",
            Value::Variable(_) => "Variable",
            Value::Operator(_) => "Operator",
            Value::Call(_) => "Call",
            Value::Error(_) => "Error",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Builds a `Set` from any iterator of strings, collapsing duplicates.
    pub fn set<I, S>(members: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Set(members.into_iter().map(Into::into).collect())
    }

    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    /// Converts a JSON scalar into a value. Arrays are accepted only when
    /// every element is a string; objects are never converted.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => Some(Value::Nil),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|i| i.as_str().map(str::to_string))
                .collect::<Option<BTreeSet<_>>>()
                .map(Value::Set),
            serde_json::Value::Object(_) => None,
        }
    }

    /// Converts a reduced value to JSON. Tree-only nodes serialize to
    /// their source text.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Nil => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Set(members) => serde_json::Value::Array(
                members
                    .iter()
                    .map(|m| serde_json::Value::String(m.clone()))
                    .collect(),
            ),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

/// Formats a number, dropping the fraction of integral values.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            other => write!(f, "{}", other)?,
        }
    }
    write!(f, "\"")
}

/// Renders the value in source syntax.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write_quoted(f, s),
            Value::Set(members) => {
                write!(f, "[")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write_quoted(f, m)?;
                }
                write!(f, "]")
            }
            Value::Variable(name) => write!(f, "`{}`", name),
            Value::Operator(symbol) => write!(f, "{}", symbol),
            Value::Call(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Error(e) => write!(f, "<{}>", e),
        }
    }
}

impl From<ExprError> for Value {
    fn from(e: ExprError) -> Self {
        Value::Error(e)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
