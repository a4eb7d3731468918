//! GPS ping ingest and queries.
//!
//! Pings are keyed by device id and need no token: the app reports its position
//! before (and independently of) any login. When the device has been onboarded
//! the ping is also tagged with the owning user id.

pub mod storage;
pub mod types;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    Extension, Json,
};
use chrono::Utc;
use tracing::{debug, instrument};

use self::{
    storage::{insert_location, list_locations, location_timestamps, NewLocation},
    types::{
        DeviceParams, LocationHistoryParams, LocationResponse, LocationStats,
        LocationUpdateRequest, DEFAULT_HISTORY_LIMIT,
    },
};
use super::{auth::storage::find_user_by_device, auth::types::required, page_size, validate_coordinates};
use crate::{
    api::error::{ApiError, ErrorBody},
    store::DataStore,
};

const NO_LOCATION: &str = "no location recorded";

#[utoipa::path(
    post,
    path = "/location/update",
    request_body = LocationUpdateRequest,
    responses(
        (status = 200, description = "Ping stored", body = LocationResponse),
        (status = 422, description = "Invalid input", body = ErrorBody),
        (status = 503, description = "Data service unavailable", body = ErrorBody),
    ),
    tag = "locations"
)]
#[instrument(skip_all)]
pub async fn update_location(
    Extension(store): Extension<DataStore>,
    payload: Result<Json<LocationUpdateRequest>, JsonRejection>,
) -> Result<Json<LocationResponse>, ApiError> {
    let Json(request) = payload?;
    let device_id = required("device_id", &request.device_id)?;
    validate_coordinates(request.latitude, request.longitude)?;

    let store = store.get()?;
    let user_id = find_user_by_device(store, &device_id)
        .await?
        .map(|user| user.id);
    if user_id.is_none() {
        debug!("location ping from device {} without a profile", device_id);
    }

    let location = NewLocation {
        device_id,
        user_id,
        latitude: request.latitude,
        longitude: request.longitude,
        accuracy: request.accuracy,
        altitude: request.altitude,
        speed: request.speed,
        heading: request.heading,
        timestamp: request.timestamp.unwrap_or_else(Utc::now),
    };

    let stored = insert_location(store, &location).await?;
    Ok(Json(stored.into()))
}

#[utoipa::path(
    get,
    path = "/location/current",
    params(DeviceParams),
    responses(
        (status = 200, description = "Most recent ping", body = LocationResponse),
        (status = 404, description = "No ping recorded for the device", body = ErrorBody),
    ),
    tag = "locations"
)]
#[instrument(skip_all)]
pub async fn current_location(
    Extension(store): Extension<DataStore>,
    params: Result<Query<DeviceParams>, QueryRejection>,
) -> Result<Json<LocationResponse>, ApiError> {
    let Query(params) = params?;
    let device_id = required("device_id", &params.device_id)?;

    list_locations(store.get()?, &device_id, 1, 0)
        .await?
        .into_iter()
        .next()
        .map(|location| Json(location.into()))
        .ok_or_else(|| ApiError::not_found(NO_LOCATION))
}

#[utoipa::path(
    get,
    path = "/location/history",
    params(LocationHistoryParams),
    responses(
        (status = 200, description = "Pings, newest first", body = [LocationResponse]),
        (status = 422, description = "Invalid pagination", body = ErrorBody),
    ),
    tag = "locations"
)]
#[instrument(skip_all)]
pub async fn location_history(
    Extension(store): Extension<DataStore>,
    params: Result<Query<LocationHistoryParams>, QueryRejection>,
) -> Result<Json<Vec<LocationResponse>>, ApiError> {
    let Query(params) = params?;
    let device_id = required("device_id", &params.device_id)?;
    let limit = page_size(params.limit, DEFAULT_HISTORY_LIMIT)?;
    let offset = params.offset.unwrap_or(0);

    let locations = list_locations(store.get()?, &device_id, limit, offset).await?;
    Ok(Json(
        locations.into_iter().map(LocationResponse::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/location/stats",
    params(DeviceParams),
    responses(
        (status = 200, description = "Ping count and time span", body = LocationStats),
    ),
    tag = "locations"
)]
#[instrument(skip_all)]
pub async fn location_stats(
    Extension(store): Extension<DataStore>,
    params: Result<Query<DeviceParams>, QueryRejection>,
) -> Result<Json<LocationStats>, ApiError> {
    let Query(params) = params?;
    let device_id = required("device_id", &params.device_id)?;

    let timestamps = location_timestamps(store.get()?, &device_id).await?;
    Ok(Json(LocationStats {
        total_count: timestamps.len(),
        first_record: timestamps.first().copied(),
        last_record: timestamps.last().copied(),
    }))
}
