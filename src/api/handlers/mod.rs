//! API handlers and shared request validation.

pub mod auth;
pub mod health;
pub mod locations;
pub mod onboarding;
pub mod reports;
pub mod root;

#[cfg(test)]
pub(crate) mod test_support;

use crate::api::error::ApiError;

pub const MAX_PAGE_SIZE: usize = 100;

/// Latitude within [-90, 90], longitude within [-180, 180].
///
/// # Errors
/// Returns [`ApiError::Validation`] for out-of-range or non-finite values.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ApiError::validation("latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ApiError::validation(
            "longitude must be between -180 and 180",
        ));
    }
    Ok(())
}

/// Resolve an optional `limit` query parameter.
///
/// # Errors
/// Returns [`ApiError::Validation`] outside `1..=MAX_PAGE_SIZE`.
pub fn page_size(limit: Option<usize>, default: usize) -> Result<usize, ApiError> {
    match limit {
        None => Ok(default),
        Some(limit) if (1..=MAX_PAGE_SIZE).contains(&limit) => Ok(limit),
        Some(_) => Err(ApiError::validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_bounds() {
        assert!(validate_coordinates(0.0, 0.0).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert!(validate_coordinates(90.1, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn page_size_defaults_and_bounds() {
        assert_eq!(page_size(None, 20), Ok(20));
        assert_eq!(page_size(Some(1), 20), Ok(1));
        assert_eq!(page_size(Some(100), 20), Ok(100));
        assert!(page_size(Some(0), 20).is_err());
        assert!(page_size(Some(101), 20).is_err());
    }
}
