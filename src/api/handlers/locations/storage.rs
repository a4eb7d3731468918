//! `locations` table access. Rows are append-only.

use crate::store::{
    decode, decode_all, encode, timestamp, DataService, Direction, Query, Row, StoreError,
    LOCATIONS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LOCATION_COLUMNS: &[&str] = &[
    "id",
    "device_id",
    "user_id",
    "latitude",
    "longitude",
    "accuracy",
    "altitude",
    "speed",
    "heading",
    "timestamp",
];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LocationRecord {
    pub id: String,
    pub device_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewLocation {
    pub device_id: String,
    pub user_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TimestampOnly {
    #[serde(with = "timestamp")]
    timestamp: DateTime<Utc>,
}

/// # Errors
/// Propagates Data Service failures.
pub async fn insert_location(
    store: &dyn DataService,
    location: &NewLocation,
) -> Result<LocationRecord, StoreError> {
    let row = store.insert(LOCATIONS, encode(location)?).await?;
    decode(project(row))
}

/// Pings of a device, newest first.
///
/// # Errors
/// Propagates Data Service failures.
pub async fn list_locations(
    store: &dyn DataService,
    device_id: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<LocationRecord>, StoreError> {
    let query = Query::new()
        .select(LOCATION_COLUMNS)
        .eq("device_id", device_id)
        .order_by("timestamp", Direction::Desc)
        .limit(limit)
        .offset(offset);
    decode_all(store.select(LOCATIONS, &query).await?)
}

/// Every ping time of a device, oldest first.
///
/// # Errors
/// Propagates Data Service failures.
pub async fn location_timestamps(
    store: &dyn DataService,
    device_id: &str,
) -> Result<Vec<DateTime<Utc>>, StoreError> {
    let query = Query::new()
        .select(&["timestamp"])
        .eq("device_id", device_id)
        .order_by("timestamp", Direction::Asc);
    let rows: Vec<TimestampOnly> = decode_all(store.select(LOCATIONS, &query).await?)?;
    Ok(rows.into_iter().map(|row| row.timestamp).collect())
}

fn project(row: Row) -> Row {
    row.into_iter()
        .filter(|(column, _)| LOCATION_COLUMNS.contains(&column.as_str()))
        .collect()
}
