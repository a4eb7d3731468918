//! Bearer-token gate for protected routes.
//!
//! Flow Overview: read the `Authorization` header, verify the token, load the
//! user named by its subject. Token problems and unknown subjects are `401`;
//! Data Service failures keep their own status (`503`/`500`).

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::debug;

use super::{
    state::AuthState,
    storage::{find_user_by_id, UserRecord},
};
use crate::{api::error::ApiError, store::DataStore};

/// Resolve the bearer token of a request into the stored user.
///
/// # Errors
/// [`ApiError::Unauthorized`] for a missing/invalid/expired token or an unknown
/// user; store errors are converted as usual.
pub async fn require_auth(
    headers: &HeaderMap,
    auth: &AuthState,
    store: &DataStore,
) -> Result<UserRecord, ApiError> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("not authenticated".to_string()))?;

    let claims = auth.tokens().verify(&token)?;

    match find_user_by_id(store.get()?, &claims.sub).await? {
        Some(user) => Ok(user),
        None => {
            debug!("token subject {} has no user", claims.sub);
            Err(ApiError::Unauthorized("user not found".to_string()))
        }
    }
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
