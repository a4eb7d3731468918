//! Phone/password registration.
//!
//! Flow Overview:
//! 1) Validate name, phone and password.
//! 2) Reject phones that already have an account (`409`, nothing written).
//! 3) Hash the password on the blocking pool and insert the user.
//! 4) Issue a bearer token for the new user id.

use axum::{extract::rejection::JsonRejection, Extension, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    state::AuthState,
    storage::{find_user_by_phone, insert_user, NewUser},
    types::{optional, phone, required, RegisterRequest, TokenResponse},
};
use crate::{
    api::error::{ApiError, ErrorBody},
    store::{DataService, DataStore},
};

const PHONE_TAKEN: &str = "phone number already registered";

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, bearer token issued", body = TokenResponse),
        (status = 409, description = "Phone number already registered", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody),
        (status = 503, description = "Data service unavailable", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, store, payload))]
pub async fn register(
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    register_user(&auth, store.get()?, request).await.map(Json)
}

/// # Errors
/// [`ApiError::Validation`] for bad input, [`ApiError::Conflict`] for a taken
/// phone number, store errors otherwise.
pub async fn register_user(
    auth: &AuthState,
    store: &dyn DataService,
    request: RegisterRequest,
) -> Result<TokenResponse, ApiError> {
    let name = required("name", &request.name)?;
    let phone = phone(&request.phone)?;
    if request.password.is_empty() {
        return Err(ApiError::validation("password must not be empty"));
    }

    if find_user_by_phone(store, &phone).await?.is_some() {
        return Err(ApiError::Conflict(PHONE_TAKEN.to_string()));
    }

    let password_hash = auth.passwords().spawn_hash(request.password).await?;

    let new_user = NewUser {
        name,
        phone,
        device_id: None,
        password_hash: Some(password_hash),
        boat_name: optional(request.boat_name),
        boat_number: optional(request.boat_number),
        created_at: Utc::now(),
    };

    // a concurrent registration can still win the unique key
    let user = insert_user(store, &new_user).await.map_err(|err| {
        if err.is_conflict() {
            ApiError::Conflict(PHONE_TAKEN.to_string())
        } else {
            ApiError::from(err)
        }
    })?;

    info!(user_id = %user.id, "user registered");

    let token = auth.tokens().issue(&user.id)?;
    Ok(TokenResponse::bearer(token, user.id))
}
