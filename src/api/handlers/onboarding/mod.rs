//! Device-first onboarding and profile management.
//!
//! Flow Overview:
//! 1) `setup` creates a user keyed by device id (no password) plus up to two
//!    emergency contacts, then issues a bearer token for that user.
//! 2) The profile can be read by device id without a token.
//! 3) Replacing the profile requires the bearer token of the device owner;
//!    any other caller sees `404`.

pub mod types;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    http::HeaderMap,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument};

use self::types::{OnboardingRequest, OnboardingResponse, ProfileUpdateRequest};
use super::auth::{
    principal::require_auth,
    storage::{
        find_user_by_device, find_user_by_phone, insert_contacts, insert_user, list_contacts,
        replace_contacts, update_profile, NewUser, ProfileUpdate,
    },
    types::{optional, phone, required, UserResponse, TOKEN_TYPE},
    AuthState,
};
use crate::{
    api::error::{ApiError, ErrorBody},
    store::{DataService, DataStore, Filter, StoreError, EMERGENCY_CONTACTS, USERS},
};

const DEVICE_TAKEN: &str = "device already registered";
const PHONE_TAKEN: &str = "phone number already registered";
const DEVICE_UNKNOWN: &str = "device not onboarded";
const ONBOARDED: &str = "onboarding complete";

#[utoipa::path(
    post,
    path = "/onboarding/setup",
    request_body = OnboardingRequest,
    responses(
        (status = 200, description = "Device onboarded, bearer token issued", body = OnboardingResponse),
        (status = 409, description = "Device or phone already registered", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody),
    ),
    tag = "onboarding"
)]
#[instrument(skip_all)]
pub async fn setup(
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
    payload: Result<Json<OnboardingRequest>, JsonRejection>,
) -> Result<Json<OnboardingResponse>, ApiError> {
    let Json(request) = payload?;
    onboard(&auth, store.get()?, &request).await.map(Json)
}

/// Create the device user and its contacts. If a contact cannot be stored the
/// user row is removed again, so the device can retry the whole setup.
///
/// # Errors
/// [`ApiError::Conflict`] when the device or the phone already has a user.
pub async fn onboard(
    auth: &AuthState,
    store: &dyn DataService,
    request: &OnboardingRequest,
) -> Result<OnboardingResponse, ApiError> {
    let device_id = required("device_id", &request.device_id)?;
    let name = required("name", &request.name)?;
    let phone = phone(&request.phone)?;

    if find_user_by_device(store, &device_id).await?.is_some() {
        return Err(ApiError::Conflict(DEVICE_TAKEN.to_string()));
    }
    if find_user_by_phone(store, &phone).await?.is_some() {
        return Err(ApiError::Conflict(PHONE_TAKEN.to_string()));
    }

    let now = Utc::now();
    let new_user = NewUser {
        name,
        phone,
        device_id: Some(device_id.clone()),
        password_hash: None,
        boat_name: optional(request.boat_name.clone()),
        boat_number: optional(request.boat_number.clone()),
        created_at: now,
    };

    let user = match insert_user(store, &new_user).await {
        Ok(user) => user,
        // lost a race with a concurrent setup
        Err(err) if err.is_conflict() => {
            let reason = if find_user_by_device(store, &device_id).await?.is_some() {
                DEVICE_TAKEN
            } else {
                PHONE_TAKEN
            };
            return Err(ApiError::Conflict(reason.to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    if let Err(err) = insert_contacts(store, &user.id, &request.contacts(), now).await {
        error!(user_id = %user.id, device_id = %device_id, "storing emergency contacts failed, undoing onboarding: {err}");
        discard_user(store, &user.id).await;
        return Err(err.into());
    }
    info!("onboarded device {} as user {}", device_id, user.id);

    let access_token = auth.tokens().issue(&user.id)?;
    Ok(OnboardingResponse {
        device_id,
        user_id: user.id,
        message: ONBOARDED.to_string(),
        access_token,
        token_type: TOKEN_TYPE.to_string(),
    })
}

async fn discard_user(store: &dyn DataService, user_id: &str) {
    let filters = [Filter::eq("user_id", user_id)];
    let contacts = store.delete(EMERGENCY_CONTACTS, &filters).await;
    let filters = [Filter::eq("id", user_id)];
    let user = store.delete(USERS, &filters).await;

    if let Some(err) = [contacts, user].into_iter().find_map(Result::err) {
        error!(user_id = %user_id, "onboarding rollback failed, user may be left without contacts: {err}");
    }
}

fn phone_conflict(err: StoreError) -> ApiError {
    if err.is_conflict() {
        ApiError::Conflict(PHONE_TAKEN.to_string())
    } else {
        err.into()
    }
}

#[utoipa::path(
    get,
    path = "/onboarding/profile/{device_id}",
    params(("device_id" = String, Path, description = "Device id")),
    responses(
        (status = 200, description = "Profile with emergency contacts", body = UserResponse),
        (status = 404, description = "Device not onboarded", body = ErrorBody),
    ),
    tag = "onboarding"
)]
#[instrument(skip_all)]
pub async fn get_profile(
    Extension(store): Extension<DataStore>,
    device_id: Result<Path<String>, PathRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(device_id) = device_id?;
    let store = store.get()?;

    let user = find_user_by_device(store, device_id.trim())
        .await?
        .ok_or_else(|| ApiError::not_found(DEVICE_UNKNOWN))?;
    let contacts = list_contacts(store, &user.id).await?;
    Ok(Json(UserResponse::new(user, contacts)))
}

#[utoipa::path(
    put,
    path = "/onboarding/profile/{device_id}",
    params(("device_id" = String, Path, description = "Device id")),
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody),
        (status = 404, description = "Device not onboarded or not owned by the caller", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "onboarding"
)]
#[instrument(skip_all)]
pub async fn put_profile(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
    device_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let caller = require_auth(&headers, &auth, &store).await?;
    let Path(device_id) = device_id?;
    let Json(request) = payload?;
    let device_id = device_id.trim();

    if let Some(echoed) = optional(request.device_id.clone()) {
        if echoed != device_id {
            return Err(ApiError::validation("device_id does not match the path"));
        }
    }

    if caller.device_id.as_deref() != Some(device_id) {
        return Err(ApiError::not_found(DEVICE_UNKNOWN));
    }

    let update = ProfileUpdate {
        name: required("name", &request.name)?,
        phone: phone(&request.phone)?,
        boat_name: optional(request.boat_name.clone()),
        boat_number: optional(request.boat_number.clone()),
    };

    let store = store.get()?;
    let user = update_profile(store, &caller.id, &update)
        .await
        .map_err(phone_conflict)?
        .ok_or_else(|| ApiError::not_found(DEVICE_UNKNOWN))?;
    let contacts = replace_contacts(store, &user.id, &request.contacts(), Utc::now()).await?;
    Ok(Json(UserResponse::new(user, contacts)))
}
