//! Data Service access.
//!
//! Every persistent entity lives in a remote, `PostgREST` style table store. The
//! [`DataService`] trait is the seam between handlers and that store: handlers
//! build a [`Query`] or a list of [`Filter`]s, the service returns raw [`Row`]s,
//! and [`decode`] turns those rows into typed records right at the boundary.
//!
//! [`DataStore`] is what gets injected into the router. It may be unconfigured,
//! in which case every access fails with [`StoreError::Unconfigured`] and the API
//! layer answers `503`.

pub mod memory;
pub mod postgrest;
pub mod timestamp;

pub use memory::MemoryStore;
pub use postgrest::{PostgrestClient, PostgrestConfig};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::{fmt, future::Future, pin::Pin, sync::Arc};
use thiserror::Error;

pub const USERS: &str = "users";
pub const EMERGENCY_CONTACTS: &str = "emergency_contacts";
pub const LOCATIONS: &str = "locations";
pub const REPORTS: &str = "reports";

/// A single table row as returned by the Data Service.
pub type Row = Map<String, Value>;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data service is not configured")]
    Unconfigured,
    #[error("data service request timed out")]
    Timeout,
    #[error("data service unreachable: {0}")]
    Unreachable(String),
    #[error("data service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected data service payload: {0}")]
    Decode(String),
}

impl StoreError {
    /// Unique-constraint violations are reported by `PostgREST` as `409 Conflict`.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Rejected { status: 409, .. })
    }
}

/// Equality filter on one column (`column=eq.value` on the wire).
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Render the filter value the way `PostgREST` expects it after `eq.`.
    #[must_use]
    pub fn param_value(&self) -> String {
        match &self.value {
            Value::String(value) => value.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub columns: Vec<String>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Restrict the returned columns. An empty projection means every column.
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|column| (*column).to_string()).collect();
        self
    }
}

/// Generic table-store operations.
///
/// Empty result sets are not errors; only transport, timeout and upstream
/// rejections are.
pub trait DataService: Send + Sync {
    fn select<'a>(&'a self, table: &'a str, query: &'a Query) -> StoreFuture<'a, Vec<Row>>;

    /// Insert one row and return it as stored (including server-assigned columns).
    fn insert<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, Row>;

    /// Patch every row matching all filters and return the updated rows.
    fn update<'a>(
        &'a self,
        table: &'a str,
        patch: Row,
        filters: &'a [Filter],
    ) -> StoreFuture<'a, Vec<Row>>;

    fn delete<'a>(&'a self, table: &'a str, filters: &'a [Filter]) -> StoreFuture<'a, Vec<Row>>;

    fn health(&self) -> StoreFuture<'_, ()>;
}

/// Shared handle to the configured Data Service, if any.
#[derive(Clone, Default)]
pub struct DataStore {
    inner: Option<Arc<dyn DataService>>,
}

impl DataStore {
    #[must_use]
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self {
            inner: Some(service),
        }
    }

    #[must_use]
    pub fn unconfigured() -> Self {
        Self { inner: None }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.inner.is_some()
    }

    /// Borrow the Data Service.
    ///
    /// # Errors
    /// Returns [`StoreError::Unconfigured`] when no Data Service was set up at startup.
    pub fn get(&self) -> Result<&dyn DataService, StoreError> {
        self.inner.as_deref().ok_or(StoreError::Unconfigured)
    }
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Convert a raw row into a typed record.
///
/// # Errors
/// Returns [`StoreError::Decode`] when required columns are missing, have the
/// wrong type, or the row carries columns the record does not know about.
pub fn decode<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|err| StoreError::Decode(err.to_string()))
}

/// Decode every row of a result set.
///
/// # Errors
/// Fails on the first row that does not decode.
pub fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(decode).collect()
}

/// Convert a typed value into a row for insert or update.
///
/// # Errors
/// Returns [`StoreError::Decode`] if the value does not serialize into a JSON object.
pub fn encode<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(StoreError::Decode(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(err) => Err(StoreError::Decode(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        id: String,
        count: i64,
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn filter_param_value_strips_string_quotes() {
        assert_eq!(Filter::eq("phone", "010-1").param_value(), "010-1");
        assert_eq!(Filter::eq("count", 3).param_value(), "3");
        assert_eq!(Filter::eq("flag", true).param_value(), "true");
    }

    #[test]
    fn query_builder_collects_parts() {
        let query = Query::new()
            .eq("user_id", "u1")
            .order_by("reported_at", Direction::Desc)
            .limit(10)
            .offset(5)
            .select(&["id", "status"]);
        assert_eq!(query.filters, vec![Filter::eq("user_id", "u1")]);
        assert_eq!(
            query.order,
            Some(Order {
                column: "reported_at".to_string(),
                direction: Direction::Desc
            })
        );
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
        assert_eq!(query.columns, vec!["id".to_string(), "status".to_string()]);
    }

    #[test]
    fn decode_rejects_missing_and_unknown_columns() {
        let ok: Result<Sample, _> = decode(row(json!({"id": "a", "count": 1})));
        assert_eq!(
            ok.ok(),
            Some(Sample {
                id: "a".to_string(),
                count: 1
            })
        );

        let missing: Result<Sample, _> = decode(row(json!({"id": "a"})));
        assert!(matches!(missing, Err(StoreError::Decode(_))));

        let unknown: Result<Sample, _> = decode(row(json!({"id": "a", "count": 1, "extra": 2})));
        assert!(matches!(unknown, Err(StoreError::Decode(_))));
    }

    #[test]
    fn unconfigured_store_fails() {
        let store = DataStore::unconfigured();
        assert!(!store.is_configured());
        assert!(matches!(store.get(), Err(StoreError::Unconfigured)));
    }

    #[test]
    fn conflict_detection() {
        let err = StoreError::Rejected {
            status: 409,
            message: "duplicate key".to_string(),
        };
        assert!(err.is_conflict());
        assert!(!StoreError::Timeout.is_conflict());
    }
}
