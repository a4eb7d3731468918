//! Report state machine and lifecycle operations.
//!
//! ```text
//! pending ──► processing ──► dispatched ──► completed
//!    │            │              │
//!    └────────────┴──────────────┴────────► cancelled
//! ```
//!
//! `pending` may also jump straight to `dispatched` or `completed`, and
//! `processing` straight to `completed`. `completed` and `cancelled` are
//! terminal. Every status write is conditioned on the status it was validated
//! against, so two racing writers cannot both move the same report.

use super::{
    storage::{find_report, insert_report, list_reports, update_reports, NewReport, ReportRecord},
    types::{EmergencyType, ReportType},
};
use crate::{
    api::{
        error::ApiError,
        handlers::{
            auth::storage::{find_user_by_device, UserRecord},
            validate_coordinates,
        },
    },
    store::{timestamp, DataService, Filter, Row},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::info;
use utoipa::ToSchema;

pub const DEVICE_NOT_ONBOARDED: &str = "device not onboarded";
pub const REPORT_NOT_FOUND: &str = "report not found";
pub const ONLY_PENDING_CANCEL: &str = "only pending reports can be cancelled";

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Processing,
    Dispatched,
    Completed,
    Cancelled,
}

impl ReportStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Dispatched,
        Self::Completed,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Dispatched => "dispatched",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Pending,
                Self::Processing | Self::Dispatched | Self::Completed | Self::Cancelled
            ) | (
                Self::Processing,
                Self::Dispatched | Self::Completed | Self::Cancelled
            ) | (Self::Dispatched, Self::Completed | Self::Cancelled)
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Errors
/// [`ApiError::InvalidTransition`] when the graph has no `from -> to` edge.
pub fn check_transition(from: ReportStatus, to: ReportStatus) -> Result<(), ApiError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ApiError::InvalidTransition(format!(
            "cannot change report status from {from} to {to}"
        )))
    }
}

/// Who is filing a report.
#[derive(Clone, Copy, Debug)]
pub enum Submitter<'a> {
    /// Authenticated user (bearer tier).
    User(&'a UserRecord),
    /// Onboarded device identified only by its id (auto-detection).
    Device(&'a str),
}

#[derive(Clone, Debug)]
pub struct ReportDraft {
    pub report_type: ReportType,
    pub emergency_type: Option<EmergencyType>,
    pub location_latitude: f64,
    pub location_longitude: f64,
    pub location_address: Option<String>,
    pub description: Option<String>,
    pub sensor_data: Option<Value>,
    pub accident_probability: Option<f64>,
    pub voice_file_url: Option<String>,
    pub video_file_url: Option<String>,
}

impl ReportDraft {
    fn validate(&self) -> Result<(), ApiError> {
        validate_coordinates(self.location_latitude, self.location_longitude)?;

        match (self.report_type, self.accident_probability) {
            (ReportType::AutoDetection, None) => Err(ApiError::validation(
                "accident_probability is required for auto-detection reports",
            )),
            (ReportType::AutoDetection, Some(p)) if !(0.0..=1.0).contains(&p) => Err(
                ApiError::validation("accident_probability must be between 0.0 and 1.0"),
            ),
            (ReportType::Manual, Some(_)) => Err(ApiError::validation(
                "accident_probability is only accepted for auto-detection reports",
            )),
            _ => Ok(()),
        }
    }
}

/// Field patch for dispatch tooling. `None` leaves a column untouched.
#[derive(Clone, Debug, Default)]
pub struct ReportPatch {
    pub status: Option<ReportStatus>,
    pub location_address: Option<String>,
    pub description: Option<String>,
    pub sensor_data: Option<Value>,
    pub voice_file_url: Option<String>,
    pub video_file_url: Option<String>,
}

impl ReportPatch {
    fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.location_address.is_none()
            && self.description.is_none()
            && self.sensor_data.is_none()
            && self.voice_file_url.is_none()
            && self.video_file_url.is_none()
    }

    fn into_row(self, now: DateTime<Utc>) -> Row {
        let mut row = Row::new();
        if let Some(status) = self.status {
            row.insert("status".to_string(), Value::from(status.as_str()));
        }
        let text_columns = [
            ("location_address", self.location_address),
            ("description", self.description),
            ("voice_file_url", self.voice_file_url),
            ("video_file_url", self.video_file_url),
        ];
        for (column, value) in text_columns {
            if let Some(value) = value {
                row.insert(column.to_string(), Value::String(value));
            }
        }
        if let Some(sensor_data) = self.sensor_data {
            row.insert("sensor_data".to_string(), sensor_data);
        }
        row.insert(
            "updated_at".to_string(),
            Value::String(timestamp::format(&now)),
        );
        row
    }
}

/// File a new `pending` report.
///
/// # Errors
/// [`ApiError::Validation`] for out-of-range input, [`ApiError::NotFound`]
/// when a device submitter has not been onboarded, store errors otherwise.
pub async fn create(
    store: &dyn DataService,
    submitter: Submitter<'_>,
    draft: ReportDraft,
    now: DateTime<Utc>,
) -> Result<ReportRecord, ApiError> {
    draft.validate()?;

    let (user_id, device_id) = match submitter {
        Submitter::User(user) => (user.id.clone(), user.device_id.clone()),
        Submitter::Device(device_id) => {
            let user = find_user_by_device(store, device_id)
                .await?
                .ok_or_else(|| ApiError::not_found(DEVICE_NOT_ONBOARDED))?;
            (user.id, Some(device_id.to_string()))
        }
    };

    let report = insert_report(
        store,
        &NewReport {
            user_id,
            device_id,
            report_type: draft.report_type,
            emergency_type: draft.emergency_type,
            status: ReportStatus::Pending,
            location_latitude: draft.location_latitude,
            location_longitude: draft.location_longitude,
            location_address: draft.location_address,
            sensor_data: draft.sensor_data,
            accident_probability: draft.accident_probability,
            voice_file_url: draft.voice_file_url,
            video_file_url: draft.video_file_url,
            description: draft.description,
            reported_at: now,
            updated_at: now,
        },
    )
    .await?;

    info!(report_id = %report.id, user_id = %report.user_id, report_type = ?report.report_type, "report created");

    Ok(report)
}

/// Cancel a `pending` report owned by `owner_id`.
///
/// # Errors
/// [`ApiError::NotFound`] when the report does not exist or belongs to someone
/// else; [`ApiError::InvalidTransition`] when it is no longer `pending`.
pub async fn cancel(
    store: &dyn DataService,
    report_id: &str,
    owner_id: &str,
    now: DateTime<Utc>,
) -> Result<ReportRecord, ApiError> {
    let filters = [
        Filter::eq("id", report_id),
        Filter::eq("user_id", owner_id),
        Filter::eq("status", ReportStatus::Pending.as_str()),
    ];
    let patch = ReportPatch {
        status: Some(ReportStatus::Cancelled),
        ..ReportPatch::default()
    };

    if let Some(report) = update_reports(store, patch.into_row(now), &filters)
        .await?
        .into_iter()
        .next()
    {
        info!(report_id = %report.id, "report cancelled");
        return Ok(report);
    }

    // nothing matched: tell "not yours / missing" apart from "not pending"
    match get_status(store, report_id, owner_id).await {
        Ok(_) => Err(ApiError::InvalidTransition(ONLY_PENDING_CANCEL.to_string())),
        Err(err) => Err(err),
    }
}

/// Fetch a report scoped to its owner.
///
/// # Errors
/// [`ApiError::NotFound`] when absent or owned by someone else.
pub async fn get_status(
    store: &dyn DataService,
    report_id: &str,
    owner_id: &str,
) -> Result<ReportRecord, ApiError> {
    find_report(
        store,
        vec![Filter::eq("id", report_id), Filter::eq("user_id", owner_id)],
    )
    .await?
    .ok_or_else(|| ApiError::not_found(REPORT_NOT_FOUND))
}

/// Apply a generic patch, enforcing the transition graph when `status` is set.
///
/// # Errors
/// [`ApiError::Validation`] for an empty patch, [`ApiError::NotFound`],
/// [`ApiError::InvalidTransition`], or [`ApiError::Conflict`] when the status
/// changed between the read and the write.
pub async fn update(
    store: &dyn DataService,
    report_id: &str,
    patch: ReportPatch,
    now: DateTime<Utc>,
) -> Result<ReportRecord, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::validation("no updates provided"));
    }

    let current = find_report(store, vec![Filter::eq("id", report_id)])
        .await?
        .ok_or_else(|| ApiError::not_found(REPORT_NOT_FOUND))?;

    if let Some(next) = patch.status {
        check_transition(current.status, next)?;
    }

    let filters = [
        Filter::eq("id", report_id),
        Filter::eq("status", current.status.as_str()),
    ];
    let updated = update_reports(store, patch.into_row(now), &filters)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Conflict("report was modified concurrently".to_string()))?;

    if updated.status != current.status {
        info!(report_id = %updated.id, from = %current.status, to = %updated.status, "report status changed");
    }

    Ok(updated)
}

/// Reports of `owner_id`, newest first.
///
/// # Errors
/// Propagates store errors.
pub async fn list_history(
    store: &dyn DataService,
    owner_id: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<ReportRecord>, ApiError> {
    Ok(list_reports(store, owner_id, limit, offset).await?)
}
