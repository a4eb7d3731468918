use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::handlers::auth::{storage::NewContact, types::optional};

#[derive(ToSchema, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct OnboardingRequest {
    /// Identifier generated by the app on first launch
    pub device_id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub boat_name: Option<String>,
    #[serde(default)]
    pub boat_number: Option<String>,
    #[serde(default)]
    pub emergency_contact_1_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_1_phone: Option<String>,
    #[serde(default)]
    pub emergency_contact_2_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_2_phone: Option<String>,
}

/// Replacement profile. `device_id` may be echoed back but must match the path.
#[derive(ToSchema, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub boat_name: Option<String>,
    #[serde(default)]
    pub boat_number: Option<String>,
    #[serde(default)]
    pub emergency_contact_1_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_1_phone: Option<String>,
    #[serde(default)]
    pub emergency_contact_2_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_2_phone: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OnboardingResponse {
    pub device_id: String,
    pub user_id: String,
    pub message: String,
    pub access_token: String,
    pub token_type: String,
}

/// Flattened contact slots; a slot missing its name or phone is dropped.
#[must_use]
pub fn contact_slots(slots: [(Option<String>, Option<String>); 2]) -> Vec<NewContact> {
    slots
        .into_iter()
        .filter_map(|(name, phone)| match (optional(name), optional(phone)) {
            (Some(name), Some(phone)) => Some(NewContact {
                name,
                phone,
                relationship: None,
            }),
            _ => None,
        })
        .collect()
}

impl OnboardingRequest {
    #[must_use]
    pub fn contacts(&self) -> Vec<NewContact> {
        contact_slots([
            (
                self.emergency_contact_1_name.clone(),
                self.emergency_contact_1_phone.clone(),
            ),
            (
                self.emergency_contact_2_name.clone(),
                self.emergency_contact_2_phone.clone(),
            ),
        ])
    }
}

impl ProfileUpdateRequest {
    #[must_use]
    pub fn contacts(&self) -> Vec<NewContact> {
        contact_slots([
            (
                self.emergency_contact_1_name.clone(),
                self.emergency_contact_1_phone.clone(),
            ),
            (
                self.emergency_contact_2_name.clone(),
                self.emergency_contact_2_phone.clone(),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_slots_are_skipped() {
        let contacts = contact_slots([
            (Some("Mother".to_string()), Some(" ".to_string())),
            (Some(" Brother ".to_string()), Some("010-9".to_string())),
        ]);
        assert_eq!(
            contacts,
            vec![NewContact {
                name: "Brother".to_string(),
                phone: "010-9".to_string(),
                relationship: None,
            }]
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let body = r#"{"device_id":"d","name":"n","phone":"1","boat_info":"x"}"#;
        assert!(serde_json::from_str::<OnboardingRequest>(body).is_err());
    }
}
