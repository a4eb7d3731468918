use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use url::Url;

use crate::keepalive::DEFAULT_INTERVAL_SECONDS;

pub const ARG_KEEPALIVE_URL: &str = "keepalive-url";
pub const ARG_KEEPALIVE_INTERVAL: &str = "keepalive-interval-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: Option<Url>,
    pub interval_seconds: u64,
}

impl Options {
    /// Parse keep-alive arguments from matches.
    ///
    /// # Errors
    /// Returns an error for a malformed URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let url = matches
            .get_one::<String>(ARG_KEEPALIVE_URL)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid --{ARG_KEEPALIVE_URL}")))
            .transpose()?;

        Ok(Self {
            url,
            interval_seconds: matches
                .get_one::<u64>(ARG_KEEPALIVE_INTERVAL)
                .copied()
                .unwrap_or(DEFAULT_INTERVAL_SECONDS),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_KEEPALIVE_URL)
                .long(ARG_KEEPALIVE_URL)
                .help("Public base URL to self-ping; disabled when unset")
                .env("BADACALL_KEEPALIVE_URL"),
        )
        .arg(
            Arg::new(ARG_KEEPALIVE_INTERVAL)
                .long(ARG_KEEPALIVE_INTERVAL)
                .help("Seconds between self-pings")
                .env("BADACALL_KEEPALIVE_INTERVAL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
