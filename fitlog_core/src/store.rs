//! Table store boundary.
//!
//! All persistence goes through [`TableStore`]: a generic tabular store
//! addressed by table name with equality-filtered `select`, batch `insert`
//! returning generated ids, and filtered `delete`. Rows are JSON objects;
//! typed access is layered on top through the [`Record`] trait.
//!
//! Two implementations are provided: [`MemoryStore`] and the file-backed
//! [`crate::jsonl::JsonlStore`].

use crate::{Error, RecordId, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A single stored row
pub type Row = Map<String, Value>;

/// Sort direction for [`Query::order_by`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Equality filters plus optional ordering and limit
#[derive(Clone, Debug, Default)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order_by: Vec<(String, Order)>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only rows whose `column` equals `value`
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    /// Sort by `column`, replacing any earlier ordering
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.order_by = vec![(column.to_string(), order)];
        self
    }

    /// Break ties left by the previous sort keys
    pub fn then_by(mut self, column: &str, order: Order) -> Self {
        self.order_by.push((column.to_string(), order));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Whether a row satisfies every equality filter
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(column, expected)| row.get(column).is_some_and(|v| values_equal(v, expected)))
    }

    /// Filter, order (stable) and limit a set of rows
    pub fn apply(&self, rows: Vec<Row>) -> Vec<Row> {
        let mut rows: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).collect();

        if !self.order_by.is_empty() {
            rows.sort_by(|a, b| {
                self.order_by
                    .iter()
                    .map(|(column, order)| {
                        let ord = compare_values(a.get(column), b.get(column));
                        match order {
                            Order::Asc => ord,
                            Order::Desc => ord.reverse(),
                        }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        rows
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Total order over JSON scalars; missing and null sort first
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Generic tabular persistence
pub trait TableStore {
    /// Rows of `table` matching the query; a missing table is empty
    fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>>;

    /// Insert rows, returning them as stored (with generated `id`)
    fn insert(&mut self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Delete rows matching the query's filters, returning how many went.
    /// A query without filters is rejected rather than clearing the table.
    fn delete(&mut self, table: &str, query: &Query) -> Result<usize>;
}

/// A typed row living in a named table
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: &'static str;

    fn id(&self) -> Option<RecordId>;
}

pub(crate) fn to_row<T: Serialize>(record: &T) -> Result<Row> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        other => Err(Error::Store(format!(
            "record serialized to {} instead of an object",
            other
        ))),
    }
}

fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Highest `id` present in a set of rows (0 when empty)
pub(crate) fn max_id(rows: &[Row]) -> RecordId {
    rows.iter()
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .max()
        .unwrap_or(0)
}

/// Stamp consecutive ids starting after `last`
pub(crate) fn assign_ids(last: RecordId, rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .zip(last + 1..)
        .map(|(mut row, id)| {
            row.insert("id".into(), Value::from(id));
            row
        })
        .collect()
}

pub(crate) fn check_delete(query: &Query) -> Result<()> {
    if query.has_filters() {
        Ok(())
    } else {
        Err(Error::Store("delete requires at least one filter".into()))
    }
}

/// Insert one record and return it with its generated id
pub fn insert<T, S>(store: &mut S, record: &T) -> Result<T>
where
    T: Record,
    S: TableStore + ?Sized,
{
    let mut stored = insert_many(store, std::slice::from_ref(record))?;
    stored
        .pop()
        .ok_or_else(|| Error::Store(format!("insert into {} returned no rows", T::TABLE)))
}

/// Insert a batch of records in one call
pub fn insert_many<T, S>(store: &mut S, records: &[T]) -> Result<Vec<T>>
where
    T: Record,
    S: TableStore + ?Sized,
{
    let rows = records.iter().map(to_row).collect::<Result<Vec<_>>>()?;
    store
        .insert(T::TABLE, rows)?
        .into_iter()
        .map(from_row)
        .collect()
}

/// Select typed records
pub fn select<T, S>(store: &S, query: &Query) -> Result<Vec<T>>
where
    T: Record,
    S: TableStore + ?Sized,
{
    store
        .select(T::TABLE, query)?
        .into_iter()
        .map(from_row)
        .collect()
}

/// Delete a record by id; `Error::NotFound` if nothing matched
pub fn delete_by_id<T, S>(store: &mut S, id: RecordId) -> Result<()>
where
    T: Record,
    S: TableStore + ?Sized,
{
    let removed = store.delete(T::TABLE, &Query::new().eq("id", id))?;
    if removed == 0 {
        return Err(Error::NotFound { table: T::TABLE, id });
    }
    tracing::debug!("Deleted {} row {}", T::TABLE, id);
    Ok(())
}

/// Delete one of a user's records by id.
///
/// Rows owned by someone else are treated as missing.
pub fn delete_owned<T, S>(store: &mut S, user_id: &str, id: RecordId) -> Result<()>
where
    T: Record,
    S: TableStore + ?Sized,
{
    let removed = store.delete(T::TABLE, &Query::new().eq("id", id).eq("user_id", user_id))?;
    if removed == 0 {
        return Err(Error::NotFound { table: T::TABLE, id });
    }
    tracing::debug!("Deleted {} row {} for {}", T::TABLE, id, user_id);
    Ok(())
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<Row>>,
    last_ids: HashMap<String, RecordId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently in a table
    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

impl TableStore for MemoryStore {
    fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let rows = self.tables.get(table).cloned().unwrap_or_default();
        Ok(query.apply(rows))
    }

    fn insert(&mut self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let last = self.last_ids.entry(table.to_string()).or_insert(0);
        let stored = assign_ids(*last, rows);
        *last += stored.len() as RecordId;

        self.tables
            .entry(table.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        Ok(stored)
    }

    fn delete(&mut self, table: &str, query: &Query) -> Result<usize> {
        check_delete(query)?;
        let Some(rows) = self.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok(before - rows.len())
    }
}
