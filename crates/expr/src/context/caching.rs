use std::collections::HashMap;

use super::EvaluationContext;
use crate::value::Value;

/// Memoizes resolutions of a wrapped context.
///
/// A resolved value, `Nil` included, is cached for the lifetime of the
/// wrapper. An unknown name (`None`) is not cached, so the child is asked
/// again on the next lookup.
pub struct CachingContext<C> {
    inner: C,
    cache: HashMap<String, Value>,
}

impl<C: EvaluationContext> CachingContext<C> {
    pub fn new(inner: C) -> Self {
        CachingContext {
            inner,
            cache: HashMap::new(),
        }
    }

    /// Number of memoized names.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: EvaluationContext> EvaluationContext for CachingContext<C> {
    fn resolve(&mut self, name: &str) -> Option<Value> {
        if let Some(hit) = self.cache.get(name) {
            return Some(hit.clone());
        }
        let resolved = self.inner.resolve(name)?;
        self.cache.insert(name.to_string(), resolved.clone());
        Some(resolved)
    }
}
