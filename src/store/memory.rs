//! In-process table store.
//!
//! Mirrors the subset of `PostgREST` behaviour the API relies on: equality
//! filters, single-column ordering, limit/offset, column projection,
//! server-assigned `id`s and unique constraints (reported as `409`). Used by the
//! test-suite and for local runs without a hosted Data Service.

use super::{DataService, Direction, Filter, Query, Row, StoreError, StoreFuture};
use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        RwLock,
    },
};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    unique: Vec<(String, String)>,
    offline: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the unique keys of the `users` table.
    #[must_use]
    pub fn with_user_constraints() -> Self {
        Self::new()
            .with_unique(super::USERS, "phone")
            .with_unique(super::USERS, "device_id")
    }

    #[must_use]
    pub fn with_unique(mut self, table: &str, column: &str) -> Self {
        self.unique.push((table.to_string(), column.to_string()));
        self
    }

    /// Simulate a connectivity failure for every subsequent call.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Snapshot of a table, in insertion order.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .map(|tables| tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Unreachable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn select_rows(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.check_online()?;
        let tables = self.tables.read().map_err(poisoned)?;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some(order) = &query.order {
            // stable sort keeps insertion order for ties
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, &query.columns))
            .collect())
    }

    fn insert_row(&self, table: &str, mut row: Row) -> Result<Row, StoreError> {
        self.check_online()?;
        if !matches!(row.get("id"), Some(Value::String(_))) {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut tables = self.tables.write().map_err(poisoned)?;
        let rows = tables.entry(table.to_string()).or_default();
        self.check_unique(table, rows, &row, None)?;
        rows.push(row.clone());
        Ok(row)
    }

    fn update_rows(
        &self,
        table: &str,
        patch: &Row,
        filters: &[Filter],
    ) -> Result<Vec<Row>, StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let targets: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches_all(row, filters))
            .map(|(index, _)| index)
            .collect();

        for &index in &targets {
            let mut candidate = rows[index].clone();
            for (column, value) in patch {
                candidate.insert(column.clone(), value.clone());
            }
            self.check_unique(table, rows, &candidate, Some(index))?;
        }

        let mut updated = Vec::with_capacity(targets.len());
        for index in targets {
            for (column, value) in patch {
                rows[index].insert(column.clone(), value.clone());
            }
            updated.push(rows[index].clone());
        }
        Ok(updated)
    }

    fn delete_rows(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        let (deleted, kept): (Vec<Row>, Vec<Row>) = rows
            .drain(..)
            .partition(|row| matches_all(row, filters));
        *rows = kept;
        Ok(deleted)
    }

    fn check_unique(
        &self,
        table: &str,
        rows: &[Row],
        candidate: &Row,
        skip: Option<usize>,
    ) -> Result<(), StoreError> {
        for (_, column) in self.unique.iter().filter(|(t, _)| t == table) {
            let Some(value) = candidate.get(column).filter(|value| !value.is_null()) else {
                continue;
            };
            let duplicate = rows
                .iter()
                .enumerate()
                .any(|(index, row)| Some(index) != skip && row.get(column) == Some(value));
            if duplicate {
                return Err(StoreError::Rejected {
                    status: 409,
                    message: format!("duplicate key value violates unique constraint on {table}.{column}"),
                });
            }
        }
        Ok(())
    }
}

impl DataService for MemoryStore {
    fn select<'a>(&'a self, table: &'a str, query: &'a Query) -> StoreFuture<'a, Vec<Row>> {
        Box::pin(async move { self.select_rows(table, query) })
    }

    fn insert<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, Row> {
        Box::pin(async move { self.insert_row(table, row) })
    }

    fn update<'a>(
        &'a self,
        table: &'a str,
        patch: Row,
        filters: &'a [Filter],
    ) -> StoreFuture<'a, Vec<Row>> {
        Box::pin(async move { self.update_rows(table, &patch, filters) })
    }

    fn delete<'a>(&'a self, table: &'a str, filters: &'a [Filter]) -> StoreFuture<'a, Vec<Row>> {
        Box::pin(async move { self.delete_rows(table, filters) })
    }

    fn health(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check_online() })
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unreachable("memory store lock poisoned".to_string())
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|filter| row.get(&filter.column).is_some_and(|value| loose_eq(value, &filter.value)))
}

// PostgREST compares the textual form of a filter, so `eq.3` matches both 3 and "3".
fn loose_eq(stored: &Value, expected: &Value) -> bool {
    match (stored, expected) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::String(a), other) | (other, Value::String(a)) => *a == other.to_string(),
        (a, b) => a == b,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

fn project(row: Row, columns: &[String]) -> Row {
    if columns.is_empty() {
        return row;
    }
    row.into_iter()
        .filter(|(column, _)| columns.iter().any(|wanted| wanted == column))
        .collect()
}
