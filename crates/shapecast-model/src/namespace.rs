use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::callable::Callable;
use crate::value::Value;

/// A named bag of members: callables, nested namespaces, or plain values.
#[derive(Clone, Debug)]
pub struct Namespace {
    name: String,
    members: IndexMap<String, Value>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: IndexMap::new(),
        }
    }

    pub fn with_member(mut self, name: impl Into<String>, value: Value) -> Self {
        self.members.insert(name.into(), value);
        self
    }

    /// Registers a callable under its own name.
    pub fn with_callable(self, callable: Callable) -> Self {
        let name = callable.name().to_string();
        self.with_member(name, Value::Callable(callable))
    }

    pub fn with_namespace(self, namespace: Namespace) -> Self {
        let name = namespace.name.clone();
        self.with_member(name, Value::Namespace(Arc::new(namespace)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// The root table symbol paths resolve against. It is the explicit
/// allow-list of everything that can be reached by name: nothing outside it
/// is resolvable.
#[derive(Clone, Debug, Default)]
pub struct NamespaceRegistry {
    roots: FxHashMap<String, Arc<Namespace>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.insert(namespace);
        self
    }

    pub fn insert(&mut self, namespace: Namespace) {
        self.roots.insert(namespace.name.clone(), Arc::new(namespace));
    }

    pub fn get(&self, root: &str) -> Option<&Arc<Namespace>> {
        self.roots.get(root)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
