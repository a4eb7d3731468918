//! Periodic self-ping that keeps an idle deployment awake.
//!
//! The task runs on its own, fire-and-forget: failures are logged and the next
//! tick happens on schedule.

use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use reqwest::{Client, StatusCode};
use tokio::{
    task::JoinHandle,
    time::{sleep, Duration},
};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_INTERVAL_SECONDS: u64 = 600;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `{base}/health`
///
/// # Errors
/// Returns an error if the base URL cannot be joined.
pub fn health_url(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("health")
        .with_context(|| format!("Invalid keep-alive URL: {base}"))
}

/// Issue one ping, returning the status code of the response.
///
/// # Errors
/// Returns an error on transport failure.
#[instrument(skip(client))]
pub async fn ping_once(client: &Client, url: &Url) -> Result<StatusCode> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("keep-alive request to {url} failed"))?;
    Ok(response.status())
}

/// Spawn the ping loop.
///
/// # Errors
/// Returns an error if the URL is unusable or the HTTP client cannot be built.
pub fn spawn(base: &Url, interval: Duration) -> Result<JoinHandle<()>> {
    let url = health_url(base)?;
    let client = Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build keep-alive client")?;

    info!(
        "Keep-alive pinging {} every {} seconds",
        url,
        interval.as_secs()
    );

    Ok(tokio::spawn(async move {
        // jittered first ping
        let mut rng = StdRng::from_entropy();
        let max_offset = (interval.as_millis() / 10).max(1);
        let offset = rng.gen_range(0..max_offset);
        sleep(Duration::from_millis(u64::try_from(offset).unwrap_or(0))).await;

        loop {
            match ping_once(&client, &url).await {
                Ok(status) if status.is_success() => debug!("Keep-alive ok: {}", status),
                Ok(status) => warn!("Keep-alive got status {}", status),
                Err(e) => warn!("Keep-alive failed: {:#}", e),
            }

            sleep(interval).await;
        }
    }))
}
