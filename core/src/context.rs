//! The evaluation context a session threads through every call.

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::query::Connection;
use crate::values::{Function, Value};

/// Name under which the query namespace is bound.
pub const QUERY_ROOT: &str = "r";

/// Long-lived, mutable state shared by successive evaluations of one session.
///
/// Bindings created by evaluated code stay here until the session ends; a
/// failing evaluation keeps whatever it bound before it failed.
pub struct Context {
    bindings: HashMap<String, Value>,
    connection: Arc<dyn Connection>,
    alternate_syntax: bool,
}

impl Context {
    /// A fresh context on `connection`, with `r` already bound.
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        let mut bindings = HashMap::new();
        bindings.insert(QUERY_ROOT.to_string(), Value::Function(Function::QueryRoot));
        Self {
            bindings,
            connection,
            alternate_syntax: false,
        }
    }

    pub fn with_alternate_syntax(mut self, enabled: bool) -> Self {
        self.alternate_syntax = enabled;
        self
    }

    pub fn alternate_syntax(&self) -> bool {
        self.alternate_syntax
    }

    pub fn set_alternate_syntax(&mut self, enabled: bool) {
        self.alternate_syntax = enabled;
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.bindings.keys().collect();
        names.sort();
        f.debug_struct("Context")
            .field("bindings", &names)
            .field("alternate_syntax", &self.alternate_syntax)
            .finish_non_exhaustive()
    }
}
