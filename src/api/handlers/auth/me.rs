//! Endpoints for the authenticated caller.

use axum::{http::HeaderMap, Extension, Json};
use std::sync::Arc;
use tracing::instrument;

use super::{
    principal::require_auth,
    state::AuthState,
    storage::list_contacts,
    types::{TokenResponse, UserResponse},
};
use crate::{
    api::error::{ApiError, ErrorBody},
    store::DataStore,
};

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user with emergency contacts", body = UserResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn me(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = require_auth(&headers, &auth, &store).await?;
    let contacts = list_contacts(store.get()?, &user.id).await?;
    Ok(Json(UserResponse::new(user, contacts)))
}

/// Issue a fresh token; the presented one stays valid until its own expiry.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New bearer token", body = TokenResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = require_auth(&headers, &auth, &store).await?;
    let token = auth.tokens().issue(&user.id)?;
    Ok(Json(TokenResponse::bearer(token, user.id)))
}
