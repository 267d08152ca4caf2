use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{PgPool, types::Json};
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicBool, AtomicI64, Ordering as AtomicOrdering},
    },
};

use crate::error::StoreError;

/// Table
///
/// The closed set of tables the site reads and edits. Table names never come from
/// user input, so they can be interpolated into SQL safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profile,
    Education,
    Experiences,
    Projects,
    Skills,
    Certifications,
    Messages,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Profile => "profile",
            Table::Education => "education",
            Table::Experiences => "experiences",
            Table::Projects => "projects",
            Table::Skills => "skills",
            Table::Certifications => "certifications",
            Table::Messages => "messages",
        }
    }
}

/// Sort order for `TableStore::list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub ascending: bool,
}

impl OrderBy {
    pub const fn asc(column: &'static str) -> Self {
        Self { column, ascending: true }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self { column, ascending: false }
    }
}

/// TableStore
///
/// Contract of the hosted table store. Records travel as JSON objects keyed by column
/// name; every record carries a numeric `id` assigned by the store.
///
/// No operation panics across this boundary: callers inspect the `Result`.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// All rows of `table`, optionally ordered.
    async fn list(&self, table: Table, order: Option<OrderBy>) -> Result<Vec<Value>, StoreError>;

    /// The single row of a one-row table (lowest id wins if there are several).
    async fn get_single(&self, table: Table) -> Result<Option<Value>, StoreError>;

    /// Inserts `record` (any `id` key is ignored) and returns the stored row.
    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError>;

    /// Applies the fields of `patch` to row `id`. `Ok(None)` when no such row exists.
    async fn update(&self, table: Table, id: i64, patch: Value) -> Result<Option<Value>, StoreError>;

    /// Deletes row `id`. Returns whether a row was removed.
    async fn delete(&self, table: Table, id: i64) -> Result<bool, StoreError>;
}

/// StoreState
///
/// The concrete type used to share the store across the application state.
pub type StoreState = Arc<dyn TableStore>;

fn into_object(table: Table, record: Value) -> Result<Map<String, Value>, StoreError> {
    match record {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        _ => Err(StoreError::NotAnObject(table.name())),
    }
}

fn check_ident(name: &str) -> Result<&str, StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidColumn(name.to_string()))
    }
}

// --- Postgres ---

/// PostgresStore
///
/// `TableStore` backed by Postgres (the hosted platform's database). Rows are read with
/// `to_jsonb` and written with `jsonb_populate_record`, so one implementation serves
/// every table without per-entity SQL.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `("a", "b")` and `(p."a", p."b")` for the keys of `record`.
    fn columns(record: &Map<String, Value>) -> Result<(String, String), StoreError> {
        let mut targets = Vec::with_capacity(record.len());
        let mut sources = Vec::with_capacity(record.len());
        for key in record.keys() {
            let column = check_ident(key)?;
            targets.push(format!("\"{column}\""));
            sources.push(format!("p.\"{column}\""));
        }
        Ok((targets.join(", "), sources.join(", ")))
    }
}

#[async_trait]
impl TableStore for PostgresStore {
    async fn list(&self, table: Table, order: Option<OrderBy>) -> Result<Vec<Value>, StoreError> {
        let mut sql = format!("SELECT to_jsonb(t) FROM {} t", table.name());
        if let Some(order) = order {
            let column = check_ident(order.column)?;
            let direction = if order.ascending { "ASC" } else { "DESC" };
            sql.push_str(&format!(" ORDER BY t.\"{column}\" {direction}"));
        }

        let rows = sqlx::query_scalar::<_, Value>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_single(&self, table: Table) -> Result<Option<Value>, StoreError> {
        let sql = format!(
            "SELECT to_jsonb(t) FROM {} t ORDER BY t.id ASC LIMIT 1",
            table.name()
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let record = into_object(table, record)?;
        if record.is_empty() {
            return Err(StoreError::EmptyRecord(table.name()));
        }
        let (targets, sources) = Self::columns(&record)?;
        let name = table.name();

        // Unlisted columns keep their defaults (serial id, created_at, ...).
        let sql = format!(
            "INSERT INTO {name} AS r ({targets}) \
             SELECT {sources} FROM jsonb_populate_record(NULL::{name}, $1) AS p \
             RETURNING to_jsonb(r)"
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Json(&record))
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(&self, table: Table, id: i64, patch: Value) -> Result<Option<Value>, StoreError> {
        let patch = into_object(table, patch)?;
        let name = table.name();
        if patch.is_empty() {
            let sql = format!("SELECT to_jsonb(t) FROM {name} t WHERE t.id = $1");
            let row = sqlx::query_scalar::<_, Value>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            return Ok(row);
        }
        let (targets, sources) = Self::columns(&patch)?;

        // Populating from the current row keeps every column the patch leaves out.
        let sql = format!(
            "UPDATE {name} AS r SET ({targets}) = \
             (SELECT {sources} FROM jsonb_populate_record(r, $2) AS p) \
             WHERE r.id = $1 RETURNING to_jsonb(r)"
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .bind(Json(&patch))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, table: Table, id: i64) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", table.name());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-memory ---

/// One recorded store call, for asserting which operation a caller issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List(Table),
    GetSingle(Table),
    Insert(Table),
    Update(Table, i64),
    Delete(Table, i64),
}

/// MemoryStore
///
/// In-process `TableStore` used by the test suite. It keeps every call it receives and
/// can be switched into a failing mode to exercise the error paths of its callers.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Map<String, Value>>>>,
    next_id: AtomicI64,
    failing: AtomicBool,
    calls: Mutex<Vec<StoreCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation returns `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Inserts rows directly, bypassing the call log. Rows without an `id` get one.
    pub fn seed(&self, table: Table, rows: Vec<Value>) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let entries = tables.entry(table).or_default();
        for row in rows {
            if let Value::Object(mut map) = row {
                match map.get("id").and_then(Value::as_i64) {
                    Some(id) => {
                        self.next_id.fetch_max(id, AtomicOrdering::SeqCst);
                    }
                    None => {
                        map.insert("id".into(), Value::from(self.allocate_id()));
                    }
                }
                entries.push(map);
            }
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Raw rows of `table` in insertion order.
    pub fn rows(&self, table: Table) -> Vec<Value> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(&table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        Ok(())
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn list(&self, table: Table, order: Option<OrderBy>) -> Result<Vec<Value>, StoreError> {
        self.record(StoreCall::List(table))?;
        let mut rows = self.rows(table);
        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(order.column), b.get(order.column));
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }
        Ok(rows)
    }

    async fn get_single(&self, table: Table) -> Result<Option<Value>, StoreError> {
        self.record(StoreCall::GetSingle(table))?;
        let mut rows = self.rows(table);
        rows.sort_by(|a, b| compare_values(a.get("id"), b.get("id")));
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        self.record(StoreCall::Insert(table))?;
        let mut record = into_object(table, record)?;
        if record.is_empty() {
            return Err(StoreError::EmptyRecord(table.name()));
        }
        record.insert("id".into(), Value::from(self.allocate_id()));

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.entry(table).or_default().push(record.clone());
        Ok(Value::Object(record))
    }

    async fn update(&self, table: Table, id: i64, patch: Value) -> Result<Option<Value>, StoreError> {
        self.record(StoreCall::Update(table, id))?;
        let patch = into_object(table, patch)?;

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| row.get("id").and_then(Value::as_i64) == Some(id)));

        Ok(row.map(|row| {
            row.extend(patch);
            Value::Object(row.clone())
        }))
    }

    async fn delete(&self, table: Table, id: i64) -> Result<bool, StoreError> {
        self.record(StoreCall::Delete(table, id))?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let Some(rows) = tables.get_mut(&table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|row| row.get("id").and_then(Value::as_i64) != Some(id));
        Ok(rows.len() < before)
    }
}
