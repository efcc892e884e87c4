//! An in-process database that understands the query terms built through `r`.
//!
//! Rows are JSON objects keyed by their `id` field. Results mirror the shapes
//! a real server returns (write summaries, `null` for missing rows, streams for
//! table scans) so sessions behave the same against either.

use std::cmp::Ordering;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, json};
use tracing::debug;

use super::{Connection, Cursor, Datum, DriverError, Query, Response, TermKind};

/// Largest sequence `r.range` may produce.
const MAX_RANGE: i64 = 1_000_000;

type Table = IndexMap<String, Datum>;
type Database = IndexMap<String, Table>;

/// A [`Connection`] backed by tables held in memory.
#[derive(Debug)]
pub struct MemoryConnection {
    default_db: String,
    databases: RwLock<IndexMap<String, Database>>,
}

impl MemoryConnection {
    /// An empty store holding only the (empty) default database.
    pub fn new(default_db: impl Into<String>) -> Self {
        let default_db = default_db.into();
        let mut databases = IndexMap::new();
        databases.insert(default_db.clone(), Database::new());
        Self {
            default_db,
            databases: RwLock::new(databases),
        }
    }

    /// A store seeded from `{"db": {"table": [rows...]}}`.
    ///
    /// Rows without an `id` get a generated one.
    pub fn with_data(default_db: impl Into<String>, seed: &Datum) -> Result<Self, DriverError> {
        let connection = Self::new(default_db);
        let dbs = seed
            .as_object()
            .ok_or_else(|| logic("seed data must be an object of databases"))?;

        {
            let mut databases = connection.databases.write();
            for (db_name, tables) in dbs {
                let tables = tables.as_object().ok_or_else(|| {
                    logic(format!("seed database `{}` must be an object of tables", db_name))
                })?;
                let db = databases.entry(db_name.clone()).or_default();
                for (table_name, rows) in tables {
                    let rows = rows.as_array().ok_or_else(|| {
                        logic(format!("seed table `{}` must be an array of rows", table_name))
                    })?;
                    let table = db.entry(table_name.clone()).or_default();
                    let summary = insert_rows(table, rows.clone());
                    if let Some(error) = summary.first_error {
                        return Err(logic(error));
                    }
                }
            }
        }

        Ok(connection)
    }

    pub fn default_db(&self) -> &str {
        &self.default_db
    }

    fn execute(&self, query: &Query) -> Result<Response, DriverError> {
        let mut databases = self.databases.write();
        let mut executor = Executor {
            default_db: &self.default_db,
            databases: &mut *databases,
        };
        let result = executor.eval(query)?;
        executor.finish(result)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn run(&self, query: &Query) -> Result<Response, DriverError> {
        debug!(%query, "Running query in memory");
        self.execute(query)
    }
}

/// Where a set of rows came from, so writes know what to modify.
#[derive(Debug, Clone)]
struct TableRef {
    db: String,
    table: String,
}

/// Intermediate result of evaluating a term chain.
#[derive(Debug)]
enum Eval {
    Db(String),
    Table(TableRef),
    Rows { from: Option<TableRef>, rows: Vec<Datum> },
    Row { from: Option<TableRef>, row: Datum },
    Datum(Datum),
}

struct Executor<'a> {
    default_db: &'a str,
    databases: &'a mut IndexMap<String, Database>,
}

impl Executor<'_> {
    fn eval(&mut self, query: &Query) -> Result<Eval, DriverError> {
        let receiver = match query.receiver() {
            Some(receiver) => Some(self.eval(receiver)?),
            None => None,
        };
        let args = query.args();

        match query.kind() {
            TermKind::Db => {
                let name = string_arg(args, 0, "db")?;
                if !self.databases.contains_key(name) {
                    return Err(DriverError::DbNotFound(name.to_string()));
                }
                Ok(Eval::Db(name.to_string()))
            }
            TermKind::DbList => Ok(Eval::Datum(Datum::Array(
                self.databases.keys().map(|name| json!(name)).collect(),
            ))),
            TermKind::DbCreate => {
                let name = string_arg(args, 0, "dbCreate")?;
                if self.databases.contains_key(name) {
                    return Err(DriverError::DbExists(name.to_string()));
                }
                self.databases.insert(name.to_string(), Database::new());
                Ok(Eval::Datum(json!({ "dbs_created": 1 })))
            }
            TermKind::Table => {
                let db = self.db_name(receiver);
                let table = string_arg(args, 0, "table")?.to_string();
                self.table(&db, &table)?;
                Ok(Eval::Table(TableRef { db, table }))
            }
            TermKind::TableList => {
                let db = self.db_name(receiver);
                let tables = self.db(&db)?;
                Ok(Eval::Datum(Datum::Array(
                    tables.keys().map(|name| json!(name)).collect(),
                )))
            }
            TermKind::TableCreate => {
                let db = self.db_name(receiver);
                let table = string_arg(args, 0, "tableCreate")?;
                let tables = self
                    .databases
                    .get_mut(&db)
                    .ok_or_else(|| DriverError::DbNotFound(db.clone()))?;
                if tables.contains_key(table) {
                    return Err(DriverError::TableExists {
                        db,
                        table: table.to_string(),
                    });
                }
                tables.insert(table.to_string(), Table::new());
                Ok(Eval::Datum(json!({ "tables_created": 1 })))
            }
            TermKind::Expr => Ok(Eval::Datum(arg(args, 0, "expr")?.clone())),
            TermKind::Range => {
                let (start, end) = match args.len() {
                    1 => (0, int_arg(args, 0, "range")?),
                    _ => (int_arg(args, 0, "range")?, int_arg(args, 1, "range")?),
                };
                if end.saturating_sub(start) > MAX_RANGE {
                    return Err(logic(format!(
                        "`range` is limited to {} elements",
                        MAX_RANGE
                    )));
                }
                Ok(Eval::Rows {
                    from: None,
                    rows: (start..end).map(|i| json!(i)).collect(),
                })
            }
            TermKind::Get => {
                let Some(Eval::Table(table_ref)) = receiver else {
                    return Err(logic("`get` can only be called on a table"));
                };
                let key = primary_key(arg(args, 0, "get")?);
                let row = self.table(&table_ref.db, &table_ref.table)?.get(&key).cloned();
                Ok(match row {
                    Some(row) => Eval::Row {
                        from: Some(table_ref),
                        row,
                    },
                    None => Eval::Datum(Datum::Null),
                })
            }
            TermKind::Filter => {
                let predicate = arg(args, 0, "filter")?;
                if !predicate.is_object() {
                    return Err(logic("`filter` expects an object to match rows against"));
                }
                let (from, rows) = self.rows(receiver, "filter")?;
                let rows = rows
                    .into_iter()
                    .filter(|row| matches_subset(row, predicate))
                    .collect();
                Ok(Eval::Rows { from, rows })
            }
            TermKind::Pluck | TermKind::Without => {
                let fields = args
                    .iter()
                    .map(|field| {
                        field.as_str().ok_or_else(|| {
                            logic(format!(
                                "`{}` expects field names, got {}",
                                query.kind().name(),
                                field
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let keep = query.kind() == TermKind::Pluck;
                let apply = |row: Datum| project(row, &fields, keep);
                match receiver {
                    Some(Eval::Row { row, .. }) => Ok(Eval::Datum(apply(row))),
                    Some(Eval::Datum(row @ Datum::Object(_))) => Ok(Eval::Datum(apply(row))),
                    other => {
                        let (_, rows) = self.rows(other, query.kind().name())?;
                        Ok(Eval::Rows {
                            from: None,
                            rows: rows.into_iter().map(apply).collect(),
                        })
                    }
                }
            }
            TermKind::OrderBy => {
                let field = string_arg(args, 0, "orderBy")?;
                let (from, mut rows) = self.rows(receiver, "orderBy")?;
                rows.sort_by(|a, b| {
                    cmp_datum(
                        a.get(field).unwrap_or(&Datum::Null),
                        b.get(field).unwrap_or(&Datum::Null),
                    )
                });
                Ok(Eval::Rows { from, rows })
            }
            TermKind::Limit => {
                let n = count_arg(args, 0, "limit")?;
                let (from, mut rows) = self.rows(receiver, "limit")?;
                rows.truncate(n);
                Ok(Eval::Rows { from, rows })
            }
            TermKind::Skip => {
                let n = count_arg(args, 0, "skip")?;
                let (from, rows) = self.rows(receiver, "skip")?;
                Ok(Eval::Rows {
                    from,
                    rows: rows.into_iter().skip(n).collect(),
                })
            }
            TermKind::Nth => {
                let n = count_arg(args, 0, "nth")?;
                let (from, mut rows) = self.rows(receiver, "nth")?;
                if n >= rows.len() {
                    return Err(logic(format!("Index out of bounds: {}", n)));
                }
                Ok(Eval::Row {
                    from,
                    row: rows.swap_remove(n),
                })
            }
            TermKind::Count => {
                let count = match receiver {
                    Some(Eval::Datum(Datum::String(s))) => s.chars().count(),
                    Some(Eval::Datum(Datum::Object(o))) => o.len(),
                    other => self.rows(other, "count")?.1.len(),
                };
                Ok(Eval::Datum(json!(count)))
            }
            TermKind::Insert => {
                let Some(Eval::Table(table_ref)) = receiver else {
                    return Err(logic("`insert` can only be called on a table"));
                };
                let docs = match arg(args, 0, "insert")? {
                    Datum::Array(docs) => docs.clone(),
                    doc => vec![doc.clone()],
                };
                let table = self.table_mut(&table_ref)?;
                Ok(Eval::Datum(insert_rows(table, docs).into_datum()))
            }
            TermKind::Update => {
                let patch = arg(args, 0, "update")?;
                if !patch.is_object() {
                    return Err(logic("`update` expects an object"));
                }
                let (table_ref, keys) = self.selection(receiver, "update")?;
                let table = self.table_mut(&table_ref)?;
                let mut summary = WriteSummary::default();
                for key in keys {
                    let Some(row) = table.get_mut(&key) else {
                        summary.skipped += 1;
                        continue;
                    };
                    let mut updated = row.clone();
                    merge(&mut updated, patch);
                    if updated.get("id") != row.get("id") {
                        summary.error("Primary key `id` cannot be changed.".to_string());
                    } else if updated == *row {
                        summary.unchanged += 1;
                    } else {
                        *row = updated;
                        summary.replaced += 1;
                    }
                }
                Ok(Eval::Datum(summary.into_datum()))
            }
            TermKind::Delete => {
                let (table_ref, keys) = self.selection(receiver, "delete")?;
                let table = self.table_mut(&table_ref)?;
                let mut summary = WriteSummary::default();
                for key in keys {
                    if table.shift_remove(&key).is_some() {
                        summary.deleted += 1;
                    } else {
                        summary.skipped += 1;
                    }
                }
                Ok(Eval::Datum(summary.into_datum()))
            }
        }
    }

    /// Turn the final evaluation into what the driver hands back.
    fn finish(&self, result: Eval) -> Result<Response, DriverError> {
        match result {
            Eval::Db(_) => Err(logic(
                "Query result must be of type DATUM or STREAM (got DATABASE).",
            )),
            Eval::Table(table_ref) => {
                let rows = self
                    .table(&table_ref.db, &table_ref.table)?
                    .values()
                    .cloned()
                    .collect();
                Ok(Response::Sequence(Cursor::from_rows(rows)))
            }
            Eval::Rows { rows, .. } => Ok(Response::Sequence(Cursor::from_rows(rows))),
            Eval::Row { row, .. } => Ok(Response::Datum(row)),
            Eval::Datum(datum) => Ok(Response::Datum(datum)),
        }
    }

    fn db_name(&self, receiver: Option<Eval>) -> String {
        match receiver {
            Some(Eval::Db(name)) => name,
            _ => self.default_db.to_string(),
        }
    }

    fn db(&self, name: &str) -> Result<&Database, DriverError> {
        self.databases
            .get(name)
            .ok_or_else(|| DriverError::DbNotFound(name.to_string()))
    }

    fn table(&self, db: &str, table: &str) -> Result<&Table, DriverError> {
        self.db(db)?
            .get(table)
            .ok_or_else(|| DriverError::TableNotFound {
                db: db.to_string(),
                table: table.to_string(),
            })
    }

    fn table_mut(&mut self, table_ref: &TableRef) -> Result<&mut Table, DriverError> {
        self.databases
            .get_mut(&table_ref.db)
            .ok_or_else(|| DriverError::DbNotFound(table_ref.db.clone()))?
            .get_mut(&table_ref.table)
            .ok_or_else(|| DriverError::TableNotFound {
                db: table_ref.db.clone(),
                table: table_ref.table.clone(),
            })
    }

    /// Rows of a sequence-like receiver.
    fn rows(
        &self,
        receiver: Option<Eval>,
        term: &str,
    ) -> Result<(Option<TableRef>, Vec<Datum>), DriverError> {
        match receiver {
            Some(Eval::Table(table_ref)) => {
                let rows = self
                    .table(&table_ref.db, &table_ref.table)?
                    .values()
                    .cloned()
                    .collect();
                Ok((Some(table_ref), rows))
            }
            Some(Eval::Rows { from, rows }) => Ok((from, rows)),
            Some(Eval::Datum(Datum::Array(rows))) => Ok((None, rows)),
            Some(other) => Err(logic(format!(
                "`{}` expected a sequence but found {}",
                term,
                describe(&other)
            ))),
            None => Err(logic(format!("`{}` must be called on a query", term))),
        }
    }

    /// Primary keys of a writable receiver.
    fn selection(
        &self,
        receiver: Option<Eval>,
        term: &str,
    ) -> Result<(TableRef, Vec<String>), DriverError> {
        match receiver {
            Some(Eval::Row {
                from: Some(table_ref),
                row,
            }) => Ok((table_ref, row.get("id").map(primary_key).into_iter().collect())),
            // `get` of a missing row: nothing to write.
            Some(Eval::Datum(Datum::Null)) => Err(logic(format!(
                "`{}` found no row to modify",
                term
            ))),
            other => match self.rows(other, term)? {
                (Some(table_ref), rows) => {
                    let keys = rows
                        .iter()
                        .filter_map(|row| row.get("id"))
                        .map(primary_key)
                        .collect();
                    Ok((table_ref, keys))
                }
                (None, _) => Err(logic(format!(
                    "`{}` expected a table selection but found a plain sequence",
                    term
                ))),
            },
        }
    }
}

#[derive(Debug, Default)]
struct WriteSummary {
    inserted: usize,
    replaced: usize,
    unchanged: usize,
    deleted: usize,
    skipped: usize,
    errors: usize,
    first_error: Option<String>,
    generated_keys: Vec<String>,
}

impl WriteSummary {
    fn error(&mut self, message: String) {
        self.errors += 1;
        self.first_error.get_or_insert(message);
    }

    fn into_datum(self) -> Datum {
        let mut result = Map::new();
        result.insert("deleted".to_string(), json!(self.deleted));
        result.insert("errors".to_string(), json!(self.errors));
        if let Some(first_error) = self.first_error {
            result.insert("first_error".to_string(), json!(first_error));
        }
        if !self.generated_keys.is_empty() {
            result.insert("generated_keys".to_string(), json!(self.generated_keys));
        }
        result.insert("inserted".to_string(), json!(self.inserted));
        result.insert("replaced".to_string(), json!(self.replaced));
        result.insert("skipped".to_string(), json!(self.skipped));
        result.insert("unchanged".to_string(), json!(self.unchanged));
        Datum::Object(result)
    }
}

fn insert_rows(table: &mut Table, docs: Vec<Datum>) -> WriteSummary {
    let mut summary = WriteSummary::default();
    for mut doc in docs {
        if !doc.is_object() {
            summary.error(format!("Expected type OBJECT but found {}.", type_name(&doc)));
            continue;
        }
        let Some(fields) = doc.as_object_mut() else {
            continue;
        };
        let id = match fields.get("id").cloned() {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                fields.insert("id".to_string(), json!(id));
                summary.generated_keys.push(id.clone());
                json!(id)
            }
        };
        let key = primary_key(&id);
        if table.contains_key(&key) {
            summary.error(format!("Duplicate primary key `id`: {}", id));
            continue;
        }
        table.insert(key, doc);
        summary.inserted += 1;
    }
    summary
}

/// Rows are keyed by the canonical JSON text of their `id`.
fn primary_key(id: &Datum) -> String {
    match id {
        Datum::Number(n) => match n.as_f64() {
            // `1` and `1.0` name the same row.
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Whether `row` contains every field of `predicate`, comparing nested
/// objects as subsets too.
fn matches_subset(row: &Datum, predicate: &Datum) -> bool {
    match (row, predicate) {
        (Datum::Object(row), Datum::Object(predicate)) => predicate.iter().all(|(key, expected)| {
            row.get(key)
                .is_some_and(|actual| matches_subset(actual, expected))
        }),
        (actual, expected) => cmp_datum(actual, expected) == Ordering::Equal,
    }
}

/// Recursively merge `patch` into `target`.
fn merge(target: &mut Datum, patch: &Datum) {
    match (target, patch) {
        (Datum::Object(target), Datum::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge(existing, value)
                    }
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

fn project(row: Datum, fields: &[&str], keep: bool) -> Datum {
    match row {
        Datum::Object(mut object) => {
            object.retain(|key, _| fields.contains(&key.as_str()) == keep);
            Datum::Object(object)
        }
        other => other,
    }
}

/// Total order over datums: arrays, booleans, null, numbers, objects, strings.
pub(crate) fn cmp_datum(a: &Datum, b: &Datum) -> Ordering {
    fn rank(d: &Datum) -> u8 {
        match d {
            Datum::Array(_) => 0,
            Datum::Bool(_) => 1,
            Datum::Null => 2,
            Datum::Number(_) => 3,
            Datum::Object(_) => 4,
            Datum::String(_) => 5,
        }
    }

    match (a, b) {
        (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
        (Datum::Number(a), Datum::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Datum::String(a), Datum::String(b)) => a.cmp(b),
        (Datum::Array(a), Datum::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(a, b)| cmp_datum(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Datum::Object(a), Datum::Object(b)) => {
            let mut a: Vec<_> = a.iter().collect();
            let mut b: Vec<_> = b.iter().collect();
            a.sort_by(|x, y| x.0.cmp(y.0));
            b.sort_by(|x, y| x.0.cmp(y.0));
            a.iter()
                .zip(&b)
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| cmp_datum(va, vb)))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len()))
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn type_name(d: &Datum) -> &'static str {
    match d {
        Datum::Null => "NULL",
        Datum::Bool(_) => "BOOL",
        Datum::Number(_) => "NUMBER",
        Datum::String(_) => "STRING",
        Datum::Array(_) => "ARRAY",
        Datum::Object(_) => "OBJECT",
    }
}

fn describe(eval: &Eval) -> String {
    match eval {
        Eval::Db(name) => format!("database `{}`", name),
        Eval::Table(t) => format!("table `{}.{}`", t.db, t.table),
        Eval::Rows { .. } => "a sequence".to_string(),
        Eval::Row { .. } => "a single row".to_string(),
        Eval::Datum(d) => type_name(d).to_string(),
    }
}

fn logic(message: impl Into<String>) -> DriverError {
    DriverError::Logic(message.into())
}

fn arg<'a>(args: &'a [Datum], index: usize, term: &str) -> Result<&'a Datum, DriverError> {
    args.get(index)
        .ok_or_else(|| logic(format!("`{}` is missing argument {}", term, index + 1)))
}

fn string_arg<'a>(args: &'a [Datum], index: usize, term: &str) -> Result<&'a str, DriverError> {
    let value = arg(args, index, term)?;
    value.as_str().ok_or_else(|| {
        logic(format!(
            "`{}` expected type STRING but found {}",
            term,
            type_name(value)
        ))
    })
}

fn int_arg(args: &[Datum], index: usize, term: &str) -> Result<i64, DriverError> {
    let value = arg(args, index, term)?;
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 => Ok(f as i64),
        _ => Err(logic(format!(
            "`{}` expected an integer but found {}",
            term, value
        ))),
    }
}

fn count_arg(args: &[Datum], index: usize, term: &str) -> Result<usize, DriverError> {
    let n = int_arg(args, index, term)?;
    usize::try_from(n).map_err(|_| logic(format!("`{}` expected a non-negative integer", term)))
}
