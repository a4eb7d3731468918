//! `reports` table access.

use super::{
    lifecycle::ReportStatus,
    types::{EmergencyType, ReportType},
};
use crate::store::{
    decode, decode_all, encode, timestamp, DataService, Direction, Filter, Query, Row,
    StoreError, REPORTS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const REPORT_COLUMNS: &[&str] = &[
    "id",
    "user_id",
    "device_id",
    "type",
    "emergency_type",
    "status",
    "location_latitude",
    "location_longitude",
    "location_address",
    "sensor_data",
    "accident_probability",
    "voice_file_url",
    "video_file_url",
    "description",
    "reported_at",
    "updated_at",
];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReportRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub emergency_type: Option<EmergencyType>,
    pub status: ReportStatus,
    pub location_latitude: f64,
    pub location_longitude: f64,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub sensor_data: Option<Value>,
    #[serde(default)]
    pub accident_probability: Option<f64>,
    #[serde(default)]
    pub voice_file_url: Option<String>,
    #[serde(default)]
    pub video_file_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "timestamp")]
    pub reported_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Columns written on insert; `id` is assigned by the Data Service.
#[derive(Clone, Debug, Serialize)]
pub struct NewReport {
    pub user_id: String,
    pub device_id: Option<String>,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub emergency_type: Option<EmergencyType>,
    pub status: ReportStatus,
    pub location_latitude: f64,
    pub location_longitude: f64,
    pub location_address: Option<String>,
    pub sensor_data: Option<Value>,
    pub accident_probability: Option<f64>,
    pub voice_file_url: Option<String>,
    pub video_file_url: Option<String>,
    pub description: Option<String>,
    #[serde(with = "timestamp")]
    pub reported_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// # Errors
/// Propagates Data Service failures.
pub async fn insert_report(
    store: &dyn DataService,
    report: &NewReport,
) -> Result<ReportRecord, StoreError> {
    let row = store.insert(REPORTS, encode(report)?).await?;
    decode(project(row))
}

/// First report matching every filter.
///
/// # Errors
/// Propagates Data Service failures.
pub async fn find_report(
    store: &dyn DataService,
    filters: Vec<Filter>,
) -> Result<Option<ReportRecord>, StoreError> {
    let query = Query {
        filters,
        ..Query::new().select(REPORT_COLUMNS).limit(1)
    };
    store
        .select(REPORTS, &query)
        .await?
        .into_iter()
        .next()
        .map(decode)
        .transpose()
}

/// Conditional update: only rows matching every filter change.
///
/// # Errors
/// Propagates Data Service failures.
pub async fn update_reports(
    store: &dyn DataService,
    patch: Row,
    filters: &[Filter],
) -> Result<Vec<ReportRecord>, StoreError> {
    let rows = store.update(REPORTS, patch, filters).await?;
    decode_all(rows.into_iter().map(project).collect())
}

/// Reports of one user, newest first.
///
/// # Errors
/// Propagates Data Service failures.
pub async fn list_reports(
    store: &dyn DataService,
    user_id: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<ReportRecord>, StoreError> {
    let query = Query::new()
        .select(REPORT_COLUMNS)
        .eq("user_id", user_id)
        .order_by("reported_at", Direction::Desc)
        .limit(limit)
        .offset(offset);
    decode_all(store.select(REPORTS, &query).await?)
}

fn project(row: Row) -> Row {
    row.into_iter()
        .filter(|(column, _)| REPORT_COLUMNS.contains(&column.as_str()))
        .collect()
}
