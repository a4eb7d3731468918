//! Command-line argument dispatch.
//!
//! Parses validated CLI arguments into the server action, resolving the
//! profile-dependent token secret along the way.

use crate::{
    api::handlers::auth::AuthConfig,
    cli::{
        actions::{server::Args, Action},
        commands::{auth, data_service, keepalive, ARG_CORS_ORIGIN, ARG_PORT, ARG_PROFILE},
    },
    store::PostgrestConfig,
};
use anyhow::{bail, Result};
use rand::{distributions::Alphanumeric, Rng};
use secrecy::SecretString;
use std::time::Duration;
use tracing::warn;

const EPHEMERAL_SECRET_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Production,
}

impl Profile {
    #[must_use]
    pub fn from_arg(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if arguments are inconsistent, or the production profile
/// has no token secret.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let profile = Profile::from_arg(matches.get_one::<String>(ARG_PROFILE).map(String::as_str));
    let cors_origin = matches
        .get_one::<String>(ARG_CORS_ORIGIN)
        .cloned()
        .unwrap_or_else(|| "*".to_string());

    let data_opts = data_service::Options::parse(matches)?;
    let auth_opts = auth::Options::parse(matches)?;
    let keepalive_opts = keepalive::Options::parse(matches)?;

    let data_service = match (data_opts.url, data_opts.key) {
        (Some(url), Some(key)) => Some(
            PostgrestConfig::new(url, key)
                .with_timeout(Duration::from_secs(data_opts.timeout_seconds)),
        ),
        _ => None,
    };

    let secret = resolve_secret(profile, auth_opts.secret)?;
    let auth = AuthConfig::new(secret)
        .with_algorithm(auth_opts.algorithm)
        .with_token_ttl_minutes(auth_opts.token_ttl_minutes)
        .with_bcrypt_cost(auth_opts.bcrypt_cost);

    Ok(Action::Server(Args {
        port,
        profile,
        data_service,
        auth,
        keepalive_url: keepalive_opts.url,
        keepalive_interval: Duration::from_secs(keepalive_opts.interval_seconds),
        cors_origin,
    }))
}

fn resolve_secret(profile: Profile, secret: Option<SecretString>) -> Result<SecretString> {
    match (secret, profile) {
        (Some(secret), _) => Ok(secret),
        (None, Profile::Production) => {
            bail!("missing required argument: --{} (production profile)", auth::ARG_JWT_SECRET)
        }
        (None, Profile::Development) => {
            warn!("No token secret configured; using an ephemeral one, tokens will not survive a restart");
            let secret: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(EPHEMERAL_SECRET_LEN)
                .map(char::from)
                .collect();
            Ok(SecretString::from(secret))
        }
    }
}
