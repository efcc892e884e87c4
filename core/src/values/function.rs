use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::parser::{Expr, Source};
use crate::query::Query;
use crate::values::Value;

/// Anything evaluated code can call.
#[derive(Clone)]
pub enum Function {
    /// An arrow function written by the user.
    Lambda(Arc<Lambda>),
    /// The `r` namespace itself. Calling it wraps a value like `r.expr`.
    QueryRoot,
    /// A query term bound to its receiver, such as `r.table` or `bikes.filter`.
    Term(Arc<TermMethod>),
}

/// A user function together with the local variables it closed over.
///
/// Top-level bindings are not captured; they are looked up in the context
/// when the body runs, so a function can call itself through its own binding.
#[derive(Clone)]
pub struct Lambda {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Arc<Expr>,
    pub captured: HashMap<String, Value>,
    /// The unit text the function was written in, for stack frames.
    pub source: Arc<Source>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermMethod {
    /// `None` when the term hangs directly off `r`.
    pub receiver: Option<Query>,
    pub name: String,
}

impl Lambda {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl Function {
    pub fn term(receiver: Option<Query>, name: impl Into<String>) -> Self {
        Function::Term(Arc::new(TermMethod {
            receiver,
            name: name.into(),
        }))
    }

    pub fn name(&self) -> &str {
        match self {
            Function::Lambda(lambda) => lambda.display_name(),
            Function::QueryRoot => "r",
            Function::Term(method) => &method.name,
        }
    }

    /// Give an anonymous lambda the name it was first bound to.
    pub fn named(self, name: &str) -> Self {
        match self {
            Function::Lambda(lambda) if lambda.name.is_none() => {
                let mut lambda = Lambda::clone(&lambda);
                lambda.name = Some(name.to_string());
                Function::Lambda(Arc::new(lambda))
            }
            other => other,
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Lambda(a), Function::Lambda(b)) => Arc::ptr_eq(a, b),
            (Function::QueryRoot, Function::QueryRoot) => true,
            (Function::Term(a), Function::Term(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Lambda(lambda) => f
                .debug_struct("Lambda")
                .field("name", &lambda.name)
                .field("params", &lambda.params)
                .finish_non_exhaustive(),
            Function::QueryRoot => write!(f, "QueryRoot"),
            Function::Term(method) => fmt::Debug::fmt(method, f),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Lambda(lambda) if lambda.name.is_none() => write!(f, "[Function (anonymous)]"),
            _ => write!(f, "[Function: {}]", self.name()),
        }
    }
}
