use axum::{extract::rejection::JsonRejection, Extension, Json};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    state::AuthState,
    storage::{find_user_by_phone, UserRecord},
    types::{LoginRequest, TokenResponse},
};
use crate::{
    api::error::{ApiError, ErrorBody},
    store::{DataService, DataStore},
};

/// Shared by every login failure.
const INVALID_CREDENTIALS: &str = "invalid phone number or password";

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, bearer token issued", body = TokenResponse),
        (status = 401, description = "Invalid phone number or password", body = ErrorBody),
        (status = 503, description = "Data service unavailable", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, store, payload))]
pub async fn login(
    Extension(auth): Extension<Arc<AuthState>>,
    Extension(store): Extension<DataStore>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    login_user(&auth, store.get()?, &request).await.map(Json)
}

/// # Errors
/// [`ApiError::Unauthorized`] when the credentials do not match an account.
pub async fn login_user(
    auth: &AuthState,
    store: &dyn DataService,
    request: &LoginRequest,
) -> Result<TokenResponse, ApiError> {
    let user = authenticate(auth, store, request.phone.trim(), &request.password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let token = auth.tokens().issue(&user.id)?;
    Ok(TokenResponse::bearer(token, user.id))
}

/// Look the phone up and check the password. Device-only accounts (no hash)
/// never authenticate with a password. Unknown phones and device-only accounts
/// still pay for one bcrypt verification.
///
/// # Errors
/// Propagates Data Service failures; a mismatch is `Ok(None)`.
pub async fn authenticate(
    auth: &AuthState,
    store: &dyn DataService,
    phone: &str,
    password: &str,
) -> Result<Option<UserRecord>, ApiError> {
    let Some(user) = find_user_by_phone(store, phone).await? else {
        debug!("login for unknown phone");
        auth.verify_password(password, None).await;
        return Ok(None);
    };

    let Some(hash) = user.password_hash.clone() else {
        debug!(user_id = %user.id, "login for account without password");
        auth.verify_password(password, None).await;
        return Ok(None);
    };

    if auth.verify_password(password, Some(hash)).await {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}
