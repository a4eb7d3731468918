use super::{lifecycle::ReportStatus, storage::ReportRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Manual,
    AutoDetection,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyType {
    Collision,
    EngineFailure,
    Fire,
    MedicalEmergency,
    ManOverboard,
    Other,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct EmergencyReportRequest {
    #[serde(default)]
    pub emergency_type: Option<EmergencyType>,
    pub location_latitude: f64,
    pub location_longitude: f64,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub sensor_data: Option<Value>,
    #[serde(default)]
    pub voice_file_url: Option<String>,
    #[serde(default)]
    pub video_file_url: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct AutoDetectionRequest {
    pub device_id: String,
    pub location_latitude: f64,
    pub location_longitude: f64,
    pub accident_probability: f64,
    #[serde(default)]
    pub emergency_type: Option<EmergencyType>,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub sensor_data: Option<Value>,
    #[serde(default)]
    pub voice_file_url: Option<String>,
    #[serde(default)]
    pub video_file_url: Option<String>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Page size, 1-100 (default 10)
    pub limit: Option<usize>,
    /// Rows to skip (default 0)
    pub offset: Option<usize>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReportResponse {
    pub id: String,
    pub user_id: String,
    pub device_id: Option<String>,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub emergency_type: Option<EmergencyType>,
    pub status: ReportStatus,
    pub location_latitude: f64,
    pub location_longitude: f64,
    pub location_address: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub sensor_data: Option<Value>,
    pub accident_probability: Option<f64>,
    pub voice_file_url: Option<String>,
    pub video_file_url: Option<String>,
    pub description: Option<String>,
    pub reported_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReportRecord> for ReportResponse {
    fn from(record: ReportRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            device_id: record.device_id,
            report_type: record.report_type,
            emergency_type: record.emergency_type,
            status: record.status,
            location_latitude: record.location_latitude,
            location_longitude: record.location_longitude,
            location_address: record.location_address,
            sensor_data: record.sensor_data,
            accident_probability: record.accident_probability,
            voice_file_url: record.voice_file_url,
            video_file_url: record.video_file_url,
            description: record.description,
            reported_at: record.reported_at,
            updated_at: record.updated_at,
        }
    }
}
