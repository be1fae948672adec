//! Built-in operators.
//!
//! Every reducer receives fully evaluated arguments and either returns a
//! value or an `EvalError`. Reducers never see `Value::Error`: the
//! evaluator propagates errors before invoking them.

use std::collections::{BTreeSet, HashMap};

use crate::error::ExprError;
use crate::value::{format_number, Value};

/// Signature of an operator implementation.
pub type Reducer = fn(&[Value]) -> Result<Value, ExprError>;

/// Registry mapping operator symbols to reducers.
#[derive(Clone)]
pub struct OperatorRegistry {
    reducers: HashMap<String, Reducer>,
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut symbols: Vec<_> = self.reducers.keys().collect();
        symbols.sort();
        f.debug_struct("OperatorRegistry")
            .field("symbols", &symbols)
            .finish()
    }
}

impl OperatorRegistry {
    /// A registry with no operators at all.
    pub fn empty() -> Self {
        OperatorRegistry {
            reducers: HashMap::new(),
        }
    }

    /// The standard operator set.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("=", op_equal);
        registry.register(">", op_greater);
        registry.register(">=", op_greater_or_equal);
        registry.register("<", op_less);
        registry.register("<=", op_less_or_equal);
        registry.register("and", op_and);
        registry.register("or", op_or);
        registry.register("not", op_not);
        registry.register("if", op_if);
        registry.register("contains", op_contains);
        registry.register("containsAll", op_contains_all);
        registry.register("write-to-string", op_write_to_string);
        registry.register("parse-string", op_parse_string);
        registry.register("upper", op_upper);
        registry.register("lower", op_lower);
        registry
    }

    /// Registers (or replaces) an operator.
    pub fn register(&mut self, symbol: impl Into<String>, reducer: Reducer) {
        self.reducers.insert(symbol.into(), reducer);
    }

    pub fn get(&self, symbol: &str) -> Option<Reducer> {
        self.reducers.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.reducers.contains_key(symbol)
    }
}

// ──────────────────────────────────────────────
// Argument helpers
// ──────────────────────────────────────────────

fn expect_arity(name: &str, args: &[Value], arity: usize) -> Result<(), ExprError> {
    if args.len() != arity {
        return Err(ExprError::eval(format!(
            "'{}' expects {} argument(s), got {}",
            name,
            arity,
            args.len()
        )));
    }
    Ok(())
}

fn numbers(name: &str, args: &[Value]) -> Result<Vec<f64>, ExprError> {
    if args.len() < 2 {
        return Err(ExprError::eval(format!(
            "'{}' expects at least 2 arguments, got {}",
            name,
            args.len()
        )));
    }
    args.iter()
        .map(|a| match a {
            Value::Number(n) => Ok(*n),
            other => Err(ExprError::eval(format!(
                "'{}' expects Number arguments, got {}",
                name,
                other.type_name()
            ))),
        })
        .collect()
}

/// Boolean view of logical operands: nil is falsy, anything else non-boolean
/// is a type error. Every operand is checked, even after the result settles.
fn truth_values(name: &str, args: &[Value]) -> Result<Vec<bool>, ExprError> {
    if args.is_empty() {
        return Err(ExprError::eval(format!(
            "'{}' expects at least 1 argument",
            name
        )));
    }
    args.iter()
        .map(|a| match a {
            Value::Bool(b) => Ok(*b),
            Value::Nil => Ok(false),
            other => Err(ExprError::eval(format!(
                "'{}' expects Bool or Nil arguments, got {}",
                name,
                other.type_name()
            ))),
        })
        .collect()
}

enum Needle<'a> {
    One(&'a str),
    Many(&'a BTreeSet<String>),
}

/// Splits `(contains needle haystack)` arguments. `Ok(None)` means a nil
/// operand, which never matches.
fn membership_args<'a>(
    name: &str,
    args: &'a [Value],
) -> Result<Option<(Needle<'a>, &'a BTreeSet<String>)>, ExprError> {
    expect_arity(name, args, 2)?;
    let haystack = match &args[1] {
        Value::Set(s) => s,
        Value::Nil => return Ok(None),
        other => {
            return Err(ExprError::eval(format!(
                "'{}' expects a Set as second argument, got {}",
                name,
                other.type_name()
            )));
        }
    };
    let needle = match &args[0] {
        Value::Text(t) => Needle::One(t),
        Value::Set(s) => Needle::Many(s),
        Value::Nil => return Ok(None),
        other => {
            return Err(ExprError::eval(format!(
                "'{}' expects Text or Set as first argument, got {}",
                name,
                other.type_name()
            )));
        }
    };
    Ok(Some((needle, haystack)))
}

fn case_fold(name: &str, args: &[Value], fold: fn(&str) -> String) -> Result<Value, ExprError> {
    expect_arity(name, args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Text(t) => Ok(Value::Text(fold(t))),
        Value::Set(members) => Ok(Value::Set(members.iter().map(|m| fold(m)).collect())),
        other => Err(ExprError::eval(format!(
            "'{}' expects Text or Set, got {}",
            name,
            other.type_name()
        ))),
    }
}

// ──────────────────────────────────────────────
// Reducers
// ──────────────────────────────────────────────

fn op_equal(args: &[Value]) -> Result<Value, ExprError> {
    Ok(Value::Bool(args.windows(2).all(|w| w[0] == w[1])))
}

fn op_greater(args: &[Value]) -> Result<Value, ExprError> {
    let ns = numbers(">", args)?;
    Ok(Value::Bool(ns.windows(2).all(|w| w[0] > w[1])))
}

fn op_greater_or_equal(args: &[Value]) -> Result<Value, ExprError> {
    let ns = numbers(">=", args)?;
    Ok(Value::Bool(ns.windows(2).all(|w| w[0] >= w[1])))
}

fn op_less(args: &[Value]) -> Result<Value, ExprError> {
    let ns = numbers("<", args)?;
    Ok(Value::Bool(ns.windows(2).all(|w| w[0] < w[1])))
}

fn op_less_or_equal(args: &[Value]) -> Result<Value, ExprError> {
    let ns = numbers("<=", args)?;
    Ok(Value::Bool(ns.windows(2).all(|w| w[0] <= w[1])))
}

fn op_and(args: &[Value]) -> Result<Value, ExprError> {
    let truths = truth_values("and", args)?;
    Ok(Value::Bool(truths.into_iter().all(|b| b)))
}

fn op_or(args: &[Value]) -> Result<Value, ExprError> {
    let truths = truth_values("or", args)?;
    Ok(Value::Bool(truths.into_iter().any(|b| b)))
}

fn op_not(args: &[Value]) -> Result<Value, ExprError> {
    expect_arity("not", args, 1)?;
    match &args[0] {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(ExprError::eval(format!(
            "'not' expects a Bool, got {}",
            other.type_name()
        ))),
    }
}

fn op_if(args: &[Value]) -> Result<Value, ExprError> {
    if args.len() != 2 && args.len() != 3 {
        return Err(ExprError::eval(format!(
            "'if' expects 2 or 3 arguments, got {}",
            args.len()
        )));
    }
    let cond = match &args[0] {
        Value::Bool(b) => *b,
        other => {
            return Err(ExprError::eval(format!(
                "'if' condition must be a Bool, got {}",
                other.type_name()
            )));
        }
    };
    if cond {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(Value::Nil))
    }
}

fn op_contains(args: &[Value]) -> Result<Value, ExprError> {
    let found = match membership_args("contains", args)? {
        None => false,
        Some((Needle::One(t), haystack)) => haystack.contains(t),
        Some((Needle::Many(members), haystack)) => {
            members.iter().any(|m| haystack.contains(m))
        }
    };
    Ok(Value::Bool(found))
}

fn op_contains_all(args: &[Value]) -> Result<Value, ExprError> {
    let found = match membership_args("containsAll", args)? {
        None => false,
        Some((Needle::One(t), haystack)) => haystack.contains(t),
        Some((Needle::Many(members), haystack)) => members.is_subset(haystack),
    };
    Ok(Value::Bool(found))
}

fn op_write_to_string(args: &[Value]) -> Result<Value, ExprError> {
    expect_arity("write-to-string", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Number(n) => Ok(Value::Text(format_number(*n))),
        Value::Bool(b) => Ok(Value::Text(b.to_string())),
        Value::Text(t) => Ok(Value::Text(t.clone())),
        other => Err(ExprError::eval(format!(
            "'write-to-string' cannot convert {}",
            other.type_name()
        ))),
    }
}

fn op_parse_string(args: &[Value]) -> Result<Value, ExprError> {
    expect_arity("parse-string", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Text(t) => t
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Number)
            .ok_or_else(|| {
                ExprError::eval(format!("'parse-string' cannot parse '{}' as a number", t))
            }),
        other => Err(ExprError::eval(format!(
            "'parse-string' expects Text, got {}",
            other.type_name()
        ))),
    }
}

fn op_upper(args: &[Value]) -> Result<Value, ExprError> {
    case_fold("upper", args, str::to_uppercase)
}

fn op_lower(args: &[Value]) -> Result<Value, ExprError> {
    case_fold("lower", args, str::to_lowercase)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
