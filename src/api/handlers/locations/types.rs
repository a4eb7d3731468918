use super::storage::LocationRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct LocationUpdateRequest {
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// GPS accuracy in meters
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Altitude in meters
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Speed in m/s
    #[serde(default)]
    pub speed: Option<f64>,
    /// Heading in degrees
    #[serde(default)]
    pub heading: Option<f64>,
    /// Device clock; defaults to the server time
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeviceParams {
    pub device_id: String,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocationHistoryParams {
    pub device_id: String,
    /// Page size, 1-100 (default 20)
    pub limit: Option<usize>,
    /// Rows to skip (default 0)
    pub offset: Option<usize>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationResponse {
    pub id: String,
    pub device_id: String,
    pub user_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<LocationRecord> for LocationResponse {
    fn from(record: LocationRecord) -> Self {
        Self {
            id: record.id,
            device_id: record.device_id,
            user_id: record.user_id,
            latitude: record.latitude,
            longitude: record.longitude,
            accuracy: record.accuracy,
            altitude: record.altitude,
            speed: record.speed,
            heading: record.heading,
            timestamp: record.timestamp,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LocationStats {
    pub total_count: usize,
    pub first_record: Option<DateTime<Utc>>,
    pub last_record: Option<DateTime<Utc>>,
}
