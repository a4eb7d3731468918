use crate::{
    api::{self, handlers::auth::{AuthConfig, AuthState}},
    cli::{dispatch::Profile, telemetry},
    keepalive,
    store::{DataStore, PostgrestClient, PostgrestConfig},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub profile: Profile,
    pub data_service: Option<PostgrestConfig>,
    pub auth: AuthConfig,
    pub keepalive_url: Option<Url>,
    pub keepalive_interval: Duration,
    pub cors_origin: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the auth configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    info!("Starting badacall ({:?} profile)", args.profile);

    let store = match args.data_service {
        Some(config) => {
            info!("Data service: {}", config.url);
            let client = PostgrestClient::new(config).context("Failed to build data service client")?;
            DataStore::new(Arc::new(client))
        }
        None => {
            warn!("No data service configured; data endpoints will answer 503");
            DataStore::unconfigured()
        }
    };

    let auth = Arc::new(AuthState::new(&args.auth).context("Invalid auth configuration")?);

    let keepalive = match &args.keepalive_url {
        Some(url) => Some(keepalive::spawn(url, args.keepalive_interval)?),
        None => None,
    };

    let result = api::new(args.port, store, auth, &args.cors_origin).await;

    if let Some(handle) = keepalive {
        handle.abort();
    }

    telemetry::shutdown_tracer();

    result
}
