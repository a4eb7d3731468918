use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

use crate::store::postgrest::DEFAULT_TIMEOUT_SECONDS;

pub const ARG_DATA_SERVICE_URL: &str = "data-service-url";
pub const ARG_DATA_SERVICE_KEY: &str = "data-service-key";
pub const ARG_DATA_SERVICE_TIMEOUT: &str = "data-service-timeout-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    /// `None` leaves the service running with every data endpoint answering 503.
    pub url: Option<Url>,
    pub key: Option<SecretString>,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse Data Service arguments from matches.
    ///
    /// # Errors
    /// Returns an error for a malformed URL, or a URL without an API key.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let url = get_non_empty(ARG_DATA_SERVICE_URL)
            .map(|raw| {
                Url::parse(raw.trim()).with_context(|| format!("invalid --{ARG_DATA_SERVICE_URL}"))
            })
            .transpose()?;
        let key = get_non_empty(ARG_DATA_SERVICE_KEY).map(SecretString::from);

        if url.is_some() && key.is_none() {
            anyhow::bail!("missing required argument: --{ARG_DATA_SERVICE_KEY}");
        }

        Ok(Self {
            url,
            key,
            timeout_seconds: matches
                .get_one::<u64>(ARG_DATA_SERVICE_TIMEOUT)
                .copied()
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DATA_SERVICE_URL)
                .long(ARG_DATA_SERVICE_URL)
                .help("Base URL of the PostgREST compatible Data Service")
                .long_help(
                    "Base URL of the PostgREST compatible Data Service (for example a Supabase project URL).\n\nWhen unset the server still starts, but every endpoint that touches stored data answers 503.",
                )
                .env("SUPABASE_URL"),
        )
        .arg(
            Arg::new(ARG_DATA_SERVICE_KEY)
                .long(ARG_DATA_SERVICE_KEY)
                .help("Data Service API key")
                .env("SUPABASE_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_DATA_SERVICE_TIMEOUT)
                .long(ARG_DATA_SERVICE_TIMEOUT)
                .help("Per-request timeout for Data Service calls")
                .env("BADACALL_DATA_SERVICE_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
