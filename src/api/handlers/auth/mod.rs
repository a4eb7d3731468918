//! Phone/password accounts and bearer tokens.
//!
//! Registration and login both end in a [`types::TokenResponse`]; protected
//! routes resolve the caller through [`principal::require_auth`].

pub mod login;
pub mod me;
pub mod password;
pub mod principal;
pub mod register;
pub mod state;
pub mod storage;
pub mod token;
pub mod types;

pub use state::{AuthConfig, AuthState};

#[cfg(test)]
mod tests;
