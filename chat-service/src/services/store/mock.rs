//! In-memory data store for tests.

use super::{DataStore, Query, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

/// Table-per-key store that applies `Query` filters the way PostgREST does
/// for equality and ordering. Rows without an `id` get a sequential one.
#[derive(Default)]
pub struct MockDataStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl MockDataStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with an API error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Seed a table directly.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.entry(table.to_string()).or_default().extend(rows);
        }
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .ok()
            .and_then(|tables| tables.get(table).cloned())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Api {
                status: 500,
                message: "mock store failure".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Network("mock store poisoned".to_string()))
    }
}

/// Filter values arrive as strings, so compare against the rendered cell.
fn cell_matches(row: &Value, column: &str, expected: &str) -> bool {
    match row.get(column) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

fn matches(row: &Value, query: &Query) -> bool {
    query
        .filters
        .iter()
        .all(|(column, value)| cell_matches(row, column, value))
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, StoreError> {
    value
        .as_object()
        .ok_or_else(|| StoreError::InvalidPayload("expected a JSON object".to_string()))
}

#[async_trait]
impl DataStore for MockDataStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.check()?;
        let tables = self.lock()?;

        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches(r, query)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn select_single(&self, table: &str, query: &Query) -> Result<Value, StoreError> {
        let mut rows = self.select(table, query).await?;
        if rows.len() == 1 {
            Ok(rows.remove(0))
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn insert(&self, table: &str, record: &Value) -> Result<Vec<Value>, StoreError> {
        self.check()?;
        let mut row = as_object(record)?.clone();
        if !row.contains_key("id") {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
            row.insert("id".to_string(), Value::from(id));
        }

        let row = Value::Object(row);
        self.lock()?
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        Ok(vec![row])
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        changes: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.check()?;
        let changes = as_object(changes)?;
        let mut tables = self.lock()?;

        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches(r, query)) {
                if let Some(fields) = row.as_object_mut() {
                    for (key, value) in changes {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<(), StoreError> {
        self.check()?;
        if let Some(rows) = self.lock()?.get_mut(table) {
            rows.retain(|r| !matches(r, query));
        }
        Ok(())
    }
}
