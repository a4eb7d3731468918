//! # BadaCall (Maritime Emergency Reporting Backend)
//!
//! `badacall` is the HTTP backend behind the BadaCall mobile app. Boat operators
//! onboard a device, stream GPS pings, and raise emergency reports either by hand
//! or through on-device accident detection.
//!
//! ## Storage
//!
//! The service keeps no authoritative state in-process. Every request maps to one
//! or two table operations against a `PostgREST` compatible Data Service
//! (`users`, `emergency_contacts`, `locations`, `reports`). When the Data Service
//! is not configured, every dependent endpoint answers `503 Service Unavailable`.
//!
//! ## Authentication
//!
//! Phone/password accounts use bcrypt hashes. Successful registration, login and
//! onboarding issue an HMAC-signed JWT (`HS256` by default, 30 minute lifetime)
//! that is presented as `Authorization: Bearer <token>`.
//!
//! ## Report Lifecycle
//!
//! Reports start `pending` and move forward through `processing`, `dispatched`
//! and `completed`. Only the owner of a `pending` report can cancel it; `completed`
//! and `cancelled` are terminal.

pub mod api;
pub mod cli;
pub mod keepalive;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
