//! Herald targeting expressions -- a small prefix-notation rule language
//! evaluated on-device against event, device and user data.
//!
//! Rules are parsed once into a [`Value`] tree and reduced by an
//! [`Evaluator`] whose operators come from an [`OperatorRegistry`].
//! Variables are resolved through an [`EvaluationContext`] chain.
//!
//! ```
//! use std::collections::BTreeMap;
//! use herald_expr::{evaluate, Value};
//!
//! let mut vars = BTreeMap::new();
//! vars.insert("c.age".to_string(), Value::Number(30.0));
//! let result = evaluate("(and (>= `c.age` 18) (contains \"a\" [\"a\" \"b\"]))", &mut vars);
//! assert_eq!(result, Ok(Value::Bool(true)));
//! ```

pub mod context;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod value;

pub use context::{
    CachingContext, EmptyContext, EvaluationContext, EventContext, EventData,
    InMemoryUserAttributes, MetaContext, NativeAttributeContext, NativeAttributes,
    UserAttributeContext, UserAttributeSource,
};
pub use error::{ErrorKind, ExprError};
pub use eval::{Evaluator, Expression};
pub use operators::{OperatorRegistry, Reducer};
pub use parser::parse;
pub use value::Value;

/// Parse and evaluate a rule with the built-in operators.
pub fn evaluate(source: &str, ctx: &mut dyn EvaluationContext) -> Result<Value, ExprError> {
    let tree = parse(source)?;
    Evaluator::default().evaluate(&tree, ctx)
}
