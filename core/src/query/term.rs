//! Deferred query terms.
//!
//! A [`Query`] is an immutable chain of terms built by evaluated code through
//! the `r` namespace. Building a query never touches a connection; the chain
//! only runs when handed to [`Connection::run`](super::Connection::run).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::Datum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Db,
    DbList,
    DbCreate,
    Table,
    TableList,
    TableCreate,
    Expr,
    Range,
    Get,
    Filter,
    Pluck,
    Without,
    OrderBy,
    Limit,
    Skip,
    Nth,
    Count,
    Insert,
    Update,
    Delete,
}

/// Where a term may appear in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Only directly on `r`.
    Root,
    /// On `r` or on a database term.
    RootOrDb,
    /// Only on a previous term.
    Chained,
}

impl TermKind {
    /// Method name as written by evaluated code.
    pub fn name(self) -> &'static str {
        match self {
            TermKind::Db => "db",
            TermKind::DbList => "dbList",
            TermKind::DbCreate => "dbCreate",
            TermKind::Table => "table",
            TermKind::TableList => "tableList",
            TermKind::TableCreate => "tableCreate",
            TermKind::Expr => "expr",
            TermKind::Range => "range",
            TermKind::Get => "get",
            TermKind::Filter => "filter",
            TermKind::Pluck => "pluck",
            TermKind::Without => "without",
            TermKind::OrderBy => "orderBy",
            TermKind::Limit => "limit",
            TermKind::Skip => "skip",
            TermKind::Nth => "nth",
            TermKind::Count => "count",
            TermKind::Insert => "insert",
            TermKind::Update => "update",
            TermKind::Delete => "delete",
        }
    }

    /// Every term, in declaration order.
    pub fn all() -> &'static [TermKind] {
        ALL_TERMS
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_TERMS.iter().copied().find(|kind| kind.name() == name)
    }

    /// Accepted argument counts, inclusive. `None` means unbounded.
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            TermKind::DbList | TermKind::TableList | TermKind::Count | TermKind::Delete => {
                (0, Some(0))
            }
            TermKind::Range => (1, Some(2)),
            TermKind::Pluck | TermKind::Without => (1, None),
            _ => (1, Some(1)),
        }
    }

    fn placement(self) -> Placement {
        match self {
            TermKind::Db | TermKind::DbList | TermKind::DbCreate | TermKind::Expr | TermKind::Range => {
                Placement::Root
            }
            TermKind::Table | TermKind::TableList | TermKind::TableCreate => Placement::RootOrDb,
            _ => Placement::Chained,
        }
    }
}

const ALL_TERMS: &[TermKind] = &[
    TermKind::Db,
    TermKind::DbList,
    TermKind::DbCreate,
    TermKind::Table,
    TermKind::TableList,
    TermKind::TableCreate,
    TermKind::Expr,
    TermKind::Range,
    TermKind::Get,
    TermKind::Filter,
    TermKind::Pluck,
    TermKind::Without,
    TermKind::OrderBy,
    TermKind::Limit,
    TermKind::Skip,
    TermKind::Nth,
    TermKind::Count,
    TermKind::Insert,
    TermKind::Update,
    TermKind::Delete,
];

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub kind: TermKind,
    pub receiver: Option<Query>,
    pub args: Vec<Datum>,
}

/// An unexecuted database operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Query(Arc<Term>);

impl Query {
    pub fn term(&self) -> &Term {
        &self.0
    }

    pub fn kind(&self) -> TermKind {
        self.0.kind
    }

    pub fn receiver(&self) -> Option<&Query> {
        self.0.receiver.as_ref()
    }

    pub fn args(&self) -> &[Datum] {
        &self.0.args
    }
}

/// Errors raised while building a query, before anything is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("unknown query term `{name}`")]
    UnknownTerm { name: String },

    #[error("`{term}` expects {expected} argument(s) but got {found}")]
    Arity {
        term: &'static str,
        expected: String,
        found: usize,
    },

    #[error("`{term}` {message}")]
    Placement { term: &'static str, message: &'static str },
}

/// Build a new query by applying the term `name` to `receiver` (or to `r` when `None`).
pub fn build(receiver: Option<&Query>, name: &str, args: Vec<Datum>) -> Result<Query, QueryError> {
    let kind = TermKind::from_name(name).ok_or_else(|| QueryError::UnknownTerm {
        name: name.to_string(),
    })?;

    match (kind.placement(), receiver) {
        (Placement::Root, Some(_)) => {
            return Err(QueryError::Placement {
                term: kind.name(),
                message: "can only be called on `r`",
            });
        }
        (Placement::RootOrDb, Some(q)) if q.kind() != TermKind::Db => {
            return Err(QueryError::Placement {
                term: kind.name(),
                message: "can only be called on `r` or a database",
            });
        }
        (Placement::Chained, None) => {
            return Err(QueryError::Placement {
                term: kind.name(),
                message: "must be called on a query, not on `r`",
            });
        }
        (Placement::Chained, Some(q)) if q.kind() == TermKind::Db => {
            return Err(QueryError::Placement {
                term: kind.name(),
                message: "cannot be called on a database",
            });
        }
        _ => {}
    }

    let (min, max) = kind.arity();
    if args.len() < min || max.is_some_and(|max| args.len() > max) {
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        return Err(QueryError::Arity {
            term: kind.name(),
            expected,
            found: args.len(),
        });
    }

    Ok(Query(Arc::new(Term {
        kind,
        receiver: receiver.cloned(),
        args,
    })))
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.receiver() {
            Some(receiver) => write!(f, "{}", receiver)?,
            None => write!(f, "r")?,
        }
        write!(f, ".{}(", self.kind().name())?;
        for (i, arg) in self.args().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_chain() {
        let table = build(None, "table", vec![json!("bikes")]).unwrap();
        let filtered = build(Some(&table), "filter", vec![json!({"brand": "Scott"})]).unwrap();

        assert_eq!(filtered.kind(), TermKind::Filter);
        assert_eq!(filtered.receiver(), Some(&table));
        assert_eq!(
            filtered.to_string(),
            r#"r.table("bikes").filter({"brand":"Scott"})"#
        );
    }

    #[test]
    fn test_unknown_term() {
        let err = build(None, "tabel", vec![]).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownTerm {
                name: "tabel".to_string()
            }
        );
    }

    #[test]
    fn test_arity_is_checked() {
        let table = build(None, "table", vec![json!("bikes")]).unwrap();
        let err = build(Some(&table), "count", vec![json!(1)]).unwrap_err();
        assert_eq!(err.to_string(), "`count` expects 0 argument(s) but got 1");

        let err = build(None, "range", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "`range` expects 1 to 2 argument(s) but got 0");

        let err = build(Some(&table), "pluck", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "`pluck` expects at least 1 argument(s) but got 0");
    }

    #[test]
    fn test_placement_is_checked() {
        let db = build(None, "db", vec![json!("test")]).unwrap();
        let table = build(Some(&db), "table", vec![json!("bikes")]).unwrap();

        assert!(build(None, "get", vec![json!(1)]).is_err());
        assert!(build(Some(&table), "db", vec![json!("x")]).is_err());
        assert!(build(Some(&table), "table", vec![json!("x")]).is_err());
        assert!(build(Some(&db), "count", vec![]).is_err());
        assert!(build(Some(&table), "count", vec![]).is_ok());
    }
}
