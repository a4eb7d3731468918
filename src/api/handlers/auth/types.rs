use super::storage::{ContactRecord, UserRecord};
use crate::api::error::ApiError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use utoipa::ToSchema;

pub const TOKEN_TYPE: &str = "bearer";

static PHONE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn phone_pattern() -> Option<&'static Regex> {
    PHONE_PATTERN
        .get_or_init(|| Regex::new(r"^\+?[0-9]+(-[0-9]+)*$").ok())
        .as_ref()
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub boat_name: Option<String>,
    #[serde(default)]
    pub boat_number: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: String,
}

impl TokenResponse {
    #[must_use]
    pub fn bearer(access_token: String, user_id: String) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            user_id,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContactResponse {
    pub name: String,
    pub phone: String,
    pub relationship: Option<String>,
}

impl From<ContactRecord> for ContactResponse {
    fn from(record: ContactRecord) -> Self {
        Self {
            name: record.name,
            phone: record.phone,
            relationship: record.relationship,
        }
    }
}

/// Public view of a user. The password hash never leaves the service.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub device_id: Option<String>,
    pub boat_name: Option<String>,
    pub boat_number: Option<String>,
    pub emergency_contacts: Vec<ContactResponse>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    #[must_use]
    pub fn new(user: UserRecord, contacts: Vec<ContactRecord>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            phone: user.phone,
            device_id: user.device_id,
            boat_name: user.boat_name,
            boat_number: user.boat_number,
            emergency_contacts: contacts.into_iter().map(ContactResponse::from).collect(),
            created_at: user.created_at,
        }
    }
}

/// Trim, rejecting empty values.
///
/// # Errors
/// Returns [`ApiError::Validation`] naming the field.
pub fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trim, mapping blank strings to `None`.
#[must_use]
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Digits with optional `-` separators and an optional leading `+`.
pub fn valid_phone(phone: &str) -> bool {
    phone_pattern().is_some_and(|re| re.is_match(phone))
}

/// # Errors
/// Returns [`ApiError::Validation`] for an empty or malformed phone number.
pub fn phone(value: &str) -> Result<String, ApiError> {
    let phone = required("phone", value)?;
    if valid_phone(&phone) {
        Ok(phone)
    } else {
        Err(ApiError::validation("phone must contain digits and dashes only"))
    }
}
