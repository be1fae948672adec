//! Variable resolution.
//!
//! Each context kind resolves a family of variable names. Contexts are
//! composed with [`MetaContext`] (ordered fall-through) and
//! [`CachingContext`] (memoizing decorator).
//!
//! `resolve` returns `None` when a context does not know a name at all,
//! letting the next context in a chain try. `Some(Value::Nil)` means the
//! name is known but has no value.

pub mod caching;
pub mod event;
pub mod meta;
pub mod native;
pub mod user;

use std::collections::{BTreeMap, HashMap};

use crate::value::Value;

pub use caching::CachingContext;
pub use event::{EventContext, EventData};
pub use meta::MetaContext;
pub use native::{NativeAttributeContext, NativeAttributes};
pub use user::{
    AttributeKind, InMemoryUserAttributes, StoredAttribute, UserAttributeContext,
    UserAttributeSource,
};

/// Capability to resolve a variable name to a value.
pub trait EvaluationContext {
    fn resolve(&mut self, name: &str) -> Option<Value>;
}

impl<T: EvaluationContext + ?Sized> EvaluationContext for &mut T {
    fn resolve(&mut self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }
}

impl<T: EvaluationContext + ?Sized> EvaluationContext for Box<T> {
    fn resolve(&mut self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }
}

/// Fixed variable bindings.
impl EvaluationContext for BTreeMap<String, Value> {
    fn resolve(&mut self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl EvaluationContext for HashMap<String, Value> {
    fn resolve(&mut self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl EvaluationContext for EmptyContext {
    fn resolve(&mut self, _name: &str) -> Option<Value> {
        None
    }
}
