//! `users` and `emergency_contacts` table access.
//!
//! Rows are decoded into [`UserRecord`] / [`ContactRecord`] immediately; every
//! select names its columns explicitly so upstream schema additions do not
//! break decoding.

use crate::store::{
    self, decode, decode_all, encode, timestamp, DataService, Direction, Filter, Query,
    StoreError, EMERGENCY_CONTACTS, USERS,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const USER_COLUMNS: &[&str] = &[
    "id",
    "name",
    "phone",
    "device_id",
    "password_hash",
    "boat_name",
    "boat_number",
    "created_at",
];

pub const CONTACT_COLUMNS: &[&str] = &["id", "user_id", "name", "phone", "relationship", "created_at"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub boat_name: Option<String>,
    #[serde(default)]
    pub boat_number: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Columns written when a user is created; `id` is assigned by the Data Service.
#[derive(Clone, Debug, Serialize)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub device_id: Option<String>,
    pub password_hash: Option<String>,
    pub boat_name: Option<String>,
    pub boat_number: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: String,
    pub boat_name: Option<String>,
    pub boat_number: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContactRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub relationship: Option<String>,
}

#[derive(Serialize)]
struct ContactInsert<'a> {
    user_id: &'a str,
    name: &'a str,
    phone: &'a str,
    relationship: Option<&'a str>,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
}

async fn find_user_by(
    store: &dyn DataService,
    column: &str,
    value: &str,
) -> Result<Option<UserRecord>, StoreError> {
    let query = Query::new()
        .select(USER_COLUMNS)
        .eq(column, value)
        .limit(1);
    store
        .select(USERS, &query)
        .await?
        .into_iter()
        .next()
        .map(decode)
        .transpose()
}

/// # Errors
/// Propagates Data Service failures.
pub async fn find_user_by_id(
    store: &dyn DataService,
    id: &str,
) -> Result<Option<UserRecord>, StoreError> {
    find_user_by(store, "id", id).await
}

/// # Errors
/// Propagates Data Service failures.
pub async fn find_user_by_phone(
    store: &dyn DataService,
    phone: &str,
) -> Result<Option<UserRecord>, StoreError> {
    find_user_by(store, "phone", phone).await
}

/// # Errors
/// Propagates Data Service failures.
pub async fn find_user_by_device(
    store: &dyn DataService,
    device_id: &str,
) -> Result<Option<UserRecord>, StoreError> {
    find_user_by(store, "device_id", device_id).await
}

/// # Errors
/// Propagates Data Service failures, including unique-key conflicts.
pub async fn insert_user(store: &dyn DataService, user: &NewUser) -> Result<UserRecord, StoreError> {
    let row = store.insert(USERS, encode(user)?).await?;
    decode(project(row, USER_COLUMNS))
}

/// Returns `None` when no user matched.
///
/// # Errors
/// Propagates Data Service failures.
pub async fn update_profile(
    store: &dyn DataService,
    user_id: &str,
    update: &ProfileUpdate,
) -> Result<Option<UserRecord>, StoreError> {
    let filters = [Filter::eq("id", user_id)];
    store
        .update(USERS, encode(update)?, &filters)
        .await?
        .into_iter()
        .next()
        .map(|row| decode(project(row, USER_COLUMNS)))
        .transpose()
}

/// Contacts in the order they were added.
///
/// # Errors
/// Propagates Data Service failures.
pub async fn list_contacts(
    store: &dyn DataService,
    user_id: &str,
) -> Result<Vec<ContactRecord>, StoreError> {
    let query = Query::new()
        .select(CONTACT_COLUMNS)
        .eq("user_id", user_id)
        .order_by("created_at", Direction::Asc);
    decode_all(store.select(EMERGENCY_CONTACTS, &query).await?)
}

/// Each contact gets its own `created_at`, one microsecond after the previous
/// one, so listing by `created_at` reproduces the given order.
///
/// # Errors
/// Propagates Data Service failures. Contacts inserted before a failure stay.
pub async fn insert_contacts(
    store: &dyn DataService,
    user_id: &str,
    contacts: &[NewContact],
    now: DateTime<Utc>,
) -> Result<Vec<ContactRecord>, StoreError> {
    let mut inserted = Vec::with_capacity(contacts.len());
    let mut created_at = now;
    for contact in contacts {
        let row = encode(&ContactInsert {
            user_id,
            name: &contact.name,
            phone: &contact.phone,
            relationship: contact.relationship.as_deref(),
            created_at,
        })?;
        created_at = created_at
            .checked_add_signed(Duration::microseconds(1))
            .ok_or_else(|| StoreError::Decode("contact timestamp out of range".to_string()))?;
        let stored = store.insert(EMERGENCY_CONTACTS, row).await?;
        inserted.push(decode(project(stored, CONTACT_COLUMNS))?);
    }
    Ok(inserted)
}

/// Drop every contact of the user and insert the given list.
///
/// # Errors
/// Propagates Data Service failures.
pub async fn replace_contacts(
    store: &dyn DataService,
    user_id: &str,
    contacts: &[NewContact],
    now: DateTime<Utc>,
) -> Result<Vec<ContactRecord>, StoreError> {
    let filters = [Filter::eq("user_id", user_id)];
    store.delete(EMERGENCY_CONTACTS, &filters).await?;
    insert_contacts(store, user_id, contacts, now).await
}

// Write responses echo the full row; keep only the columns the record knows.
fn project(row: store::Row, columns: &[&str]) -> store::Row {
    row.into_iter()
        .filter(|(column, _)| columns.contains(&column.as_str()))
        .collect()
}
