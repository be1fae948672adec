use super::EvaluationContext;
use crate::value::Value;

/// Ordered chain of contexts. The first child yielding a non-nil value
/// wins; when every child returns nil or nothing, the name stays unknown.
#[derive(Default)]
pub struct MetaContext<'a> {
    contexts: Vec<Box<dyn EvaluationContext + 'a>>,
}

impl<'a> MetaContext<'a> {
    pub fn new() -> Self {
        MetaContext {
            contexts: Vec::new(),
        }
    }

    /// Builder-style `push`.
    pub fn with(mut self, ctx: impl EvaluationContext + 'a) -> Self {
        self.push(ctx);
        self
    }

    pub fn push(&mut self, ctx: impl EvaluationContext + 'a) {
        self.contexts.push(Box::new(ctx));
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl EvaluationContext for MetaContext<'_> {
    fn resolve(&mut self, name: &str) -> Option<Value> {
        for ctx in self.contexts.iter_mut() {
            match ctx.resolve(name) {
                None | Some(Value::Nil) => continue,
                found => return found,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn vars(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn first_non_nil_resolution_wins() {
        let mut meta = MetaContext::new()
            .with(vars(&[("a", Value::Nil)]))
            .with(vars(&[("a", Value::Number(1.0)), ("b", Value::Number(2.0))]))
            .with(vars(&[("a", Value::Number(3.0))]));
        assert_eq!(meta.resolve("a"), Some(Value::Number(1.0)));
        assert_eq!(meta.resolve("b"), Some(Value::Number(2.0)));
    }

    #[test]
    fn unknown_or_all_nil_falls_through_to_none() {
        let mut meta = MetaContext::new()
            .with(vars(&[("a", Value::Nil)]))
            .with(vars(&[]));
        assert_eq!(meta.resolve("a"), None);
        assert_eq!(meta.resolve("zzz"), None);
    }

    #[test]
    fn empty_chain_resolves_nothing() {
        let mut meta = MetaContext::new();
        assert!(meta.is_empty());
        assert_eq!(meta.resolve("a"), None);
    }
}
