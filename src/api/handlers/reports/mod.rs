//! Emergency report endpoints.
//!
//! Flow Overview:
//! 1) Manual reports, status, cancel and history require a bearer token and are
//!    scoped to the caller's user id.
//! 2) Auto-detection reports are submitted by device id; the device must have
//!    completed onboarding. They can create reports but never read or change them.
//! 3) All status changes go through [`lifecycle`].

pub mod lifecycle;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    http::HeaderMap,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

use self::{
    lifecycle::{ReportDraft, Submitter},
    types::{
        AutoDetectionRequest, EmergencyReportRequest, HistoryParams, ReportResponse, ReportType,
        DEFAULT_HISTORY_LIMIT,
    },
};
use super::{auth::principal::require_auth, auth::AuthState, auth::types::optional, page_size};
use crate::{
    api::error::{ApiError, ErrorBody},
    store::DataStore,
};

#[utoipa::path(
    post,
    path = "/reports/emergency",
    request_body = EmergencyReportRequest,
    responses(
        (status = 200, description = "Report filed as pending", body = ReportResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip_all)]
pub async fn create_emergency_report(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
    payload: Result<Json<EmergencyReportRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let user = require_auth(&headers, &auth, &store).await?;
    let Json(request) = payload?;

    let draft = ReportDraft {
        report_type: ReportType::Manual,
        emergency_type: request.emergency_type,
        location_latitude: request.location_latitude,
        location_longitude: request.location_longitude,
        location_address: optional(request.location_address),
        description: optional(request.description),
        sensor_data: request.sensor_data,
        accident_probability: None,
        voice_file_url: optional(request.voice_file_url),
        video_file_url: optional(request.video_file_url),
    };

    let report = lifecycle::create(store.get()?, Submitter::User(&user), draft, Utc::now()).await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    post,
    path = "/reports/auto-detection",
    request_body = AutoDetectionRequest,
    responses(
        (status = 200, description = "Auto-detected accident filed as pending", body = ReportResponse),
        (status = 404, description = "Device not onboarded", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody),
    ),
    tag = "reports"
)]
#[instrument(skip_all)]
pub async fn create_auto_detection_report(
    Extension(store): Extension<DataStore>,
    payload: Result<Json<AutoDetectionRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Json(request) = payload?;
    let device_id = request.device_id.trim().to_string();
    if device_id.is_empty() {
        return Err(ApiError::validation("device_id must not be empty"));
    }

    let draft = ReportDraft {
        report_type: ReportType::AutoDetection,
        emergency_type: request.emergency_type,
        location_latitude: request.location_latitude,
        location_longitude: request.location_longitude,
        location_address: optional(request.location_address),
        description: None,
        sensor_data: request.sensor_data,
        accident_probability: Some(request.accident_probability),
        voice_file_url: optional(request.voice_file_url),
        video_file_url: optional(request.video_file_url),
    };

    let report =
        lifecycle::create(store.get()?, Submitter::Device(&device_id), draft, Utc::now()).await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    put,
    path = "/reports/{id}/cancel",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report cancelled", body = ReportResponse),
        (status = 400, description = "Report is no longer pending", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody),
        (status = 404, description = "Report not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip_all)]
pub async fn cancel_report(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let user = require_auth(&headers, &auth, &store).await?;
    let Path(id) = id?;
    let report = lifecycle::cancel(store.get()?, id.trim(), &user.id, Utc::now()).await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    get,
    path = "/reports/status/{id}",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Current report state", body = ReportResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody),
        (status = 404, description = "Report not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip_all)]
pub async fn report_status(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let user = require_auth(&headers, &auth, &store).await?;
    let Path(id) = id?;
    let report = lifecycle::get_status(store.get()?, id.trim(), &user.id).await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    get,
    path = "/reports/history",
    params(HistoryParams),
    responses(
        (status = 200, description = "Caller's reports, newest first", body = [ReportResponse]),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody),
        (status = 422, description = "Invalid pagination", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reports"
)]
#[instrument(skip_all)]
pub async fn report_history(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<ReportResponse>>, ApiError> {
    let user = require_auth(&headers, &auth, &store).await?;
    let Query(params) = params?;
    let limit = page_size(params.limit, DEFAULT_HISTORY_LIMIT)?;
    let offset = params.offset.unwrap_or(0);

    let reports = lifecycle::list_history(store.get()?, &user.id, limit, offset).await?;
    Ok(Json(reports.into_iter().map(ReportResponse::from).collect()))
}
