//! Bottom-up reduction of expression trees.
//!
//! Evaluation order for a call: reduce the head (it must yield a known
//! operator), reduce every argument eagerly and left to right, then
//! invoke the reducer. The first error encountered aborts the whole
//! reduction; no enclosing reducer runs on it.

use crate::context::EvaluationContext;
use crate::error::ExprError;
use crate::operators::OperatorRegistry;
use crate::parser::parse;
use crate::value::Value;

/// Reduces expression trees using an operator registry.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    registry: OperatorRegistry,
}

impl Evaluator {
    pub fn new(registry: OperatorRegistry) -> Self {
        Evaluator { registry }
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Reduce `expr` against `ctx`.
    pub fn evaluate(
        &self,
        expr: &Value,
        ctx: &mut dyn EvaluationContext,
    ) -> Result<Value, ExprError> {
        match expr {
            // An unknown variable stays unresolved instead of failing.
            Value::Variable(name) => Ok(ctx.resolve(name).unwrap_or(Value::Nil)),
            Value::Call(items) => self.eval_call(items, ctx),
            Value::Error(e) => Err(e.clone()),
            literal => Ok(literal.clone()),
        }
    }

    /// Like [`Evaluator::evaluate`], folding a failure into `Value::Error`.
    pub fn reduce(&self, expr: &Value, ctx: &mut dyn EvaluationContext) -> Value {
        self.evaluate(expr, ctx).unwrap_or_else(Value::Error)
    }

    fn eval_call(
        &self,
        items: &[Value],
        ctx: &mut dyn EvaluationContext,
    ) -> Result<Value, ExprError> {
        let (head, rest) = items
            .split_first()
            .ok_or_else(|| ExprError::eval("cannot evaluate an empty call"))?;

        let symbol = match self.evaluate(head, ctx)? {
            Value::Operator(symbol) => symbol,
            other => {
                return Err(ExprError::eval(format!(
                    "call head must be an operator, got {}",
                    other.type_name()
                )));
            }
        };
        let reducer = self
            .registry
            .get(&symbol)
            .ok_or_else(|| ExprError::eval(format!("unknown operator '{}'", symbol)))?;

        let args = rest
            .iter()
            .map(|arg| self.evaluate(arg, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        reducer(&args)
    }
}

// ──────────────────────────────────────────────
// Expression
// ──────────────────────────────────────────────

/// A parsed rule together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Value,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let root = parse(source)?;
        Ok(Expression {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn evaluate(
        &self,
        evaluator: &Evaluator,
        ctx: &mut dyn EvaluationContext,
    ) -> Result<Value, ExprError> {
        evaluator.evaluate(&self.root, ctx)
    }

    /// Evaluates the rule as a condition. `Nil` counts as false; any other
    /// non-boolean result is an `EvalError`.
    pub fn evaluate_bool(
        &self,
        evaluator: &Evaluator,
        ctx: &mut dyn EvaluationContext,
    ) -> Result<bool, ExprError> {
        match self.evaluate(evaluator, ctx)? {
            Value::Bool(b) => Ok(b),
            Value::Nil => Ok(false),
            other => Err(ExprError::eval(format!(
                "condition must evaluate to a Bool, got {}",
                other.type_name()
            ))),
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn eval_src(src: &str, vars: &mut BTreeMap<String, Value>) -> Result<Value, ExprError> {
        Evaluator::default().evaluate(&parse(src).unwrap(), vars)
    }

    fn eval_plain(src: &str) -> Result<Value, ExprError> {
        eval_src(src, &mut BTreeMap::new())
    }

    #[test]
    fn evaluates_nested_calls() {
        assert_eq!(eval_plain("(if true 2 1)").unwrap(), Value::Number(2.0));
        assert_eq!(eval_plain("(if false true false)").unwrap(), Value::Bool(false));
        assert_eq!(
            eval_plain("(and (> 3 2) (not (= 1 2)))").unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn if_with_non_bool_condition_errors() {
        assert!(eval_plain("(if 2 true)").unwrap_err().is_eval_error());
    }

    #[test]
    fn resolves_variables_from_context() {
        let mut vars = BTreeMap::new();
        vars.insert("c.age".to_string(), Value::Number(21.0));
        assert_eq!(eval_src("(>= `c.age` 18)", &mut vars).unwrap(), Value::Bool(true));
    }

    #[test]
    fn unknown_variables_evaluate_to_nil() {
        assert_eq!(eval_plain("(= `nope` nil)").unwrap(), Value::Bool(true));
    }

    #[test]
    fn unknown_operator_is_an_eval_error() {
        let err = eval_plain("(frobnicate 1)").unwrap_err();
        assert!(err.is_eval_error());
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn non_operator_head_is_an_eval_error() {
        assert!(eval_plain("(1 2 3)").unwrap_err().is_eval_error());
        assert!(eval_plain(r#"("=" 1 1)"#).unwrap_err().is_eval_error());
    }

    #[test]
    fn nested_head_may_reduce_to_an_operator() {
        assert_eq!(eval_plain("((if true = >) 1 1)").unwrap(), Value::Bool(true));
    }

    #[test]
    fn errors_propagate_through_enclosing_calls() {
        // `not` would error on a non-bool, the inner error wins first.
        let err = eval_plain("(not (> 1 \"a\"))").unwrap_err();
        assert!(err.message.contains("'>'"));
    }

    #[test]
    fn eager_arguments_error_even_when_result_is_settled() {
        assert!(eval_plain("(or true (> 1 \"a\"))").unwrap_err().is_eval_error());
        assert!(eval_plain("(and false \"x\")").unwrap_err().is_eval_error());
    }

    #[test]
    fn embedded_error_values_short_circuit() {
        let tree = Value::Call(vec![
            Value::Operator("=".into()),
            Value::Error(ExprError::eval("boom")),
        ]);
        let reduced = Evaluator::default().reduce(&tree, &mut BTreeMap::new());
        assert_eq!(reduced, Value::Error(ExprError::eval("boom")));
    }

    #[test]
    fn expression_condition_treats_nil_as_false() {
        let expr = Expression::parse("(if false true)").unwrap();
        let evaluator = Evaluator::default();
        assert!(!expr.evaluate_bool(&evaluator, &mut BTreeMap::new()).unwrap());

        let expr = Expression::parse("(write-to-string 1)").unwrap();
        assert!(expr
            .evaluate_bool(&evaluator, &mut BTreeMap::new())
            .unwrap_err()
            .is_eval_error());
    }
}
