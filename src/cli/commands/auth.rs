use clap::{Arg, ArgMatches, Command};
use jsonwebtoken::Algorithm;
use secrecy::SecretString;

use crate::api::handlers::auth::{password, token};

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_ALGORITHM: &str = "jwt-algorithm";
pub const ARG_TOKEN_TTL_MINUTES: &str = "token-ttl-minutes";
pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";

#[derive(Debug, Clone)]
pub struct Options {
    pub secret: Option<SecretString>,
    pub algorithm: Algorithm,
    pub token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error for an unsupported signing algorithm.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let algorithm = matches
            .get_one::<String>(ARG_JWT_ALGORITHM)
            .map_or(token::DEFAULT_ALGORITHM, String::as_str);

        Ok(Self {
            secret: matches
                .get_one::<String>(ARG_JWT_SECRET)
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .map(SecretString::from),
            algorithm: token::parse_algorithm(algorithm)?,
            token_ttl_minutes: matches
                .get_one::<i64>(ARG_TOKEN_TTL_MINUTES)
                .copied()
                .unwrap_or(token::DEFAULT_TTL_MINUTES),
            bcrypt_cost: matches
                .get_one::<u32>(ARG_BCRYPT_COST)
                .copied()
                .unwrap_or(password::DEFAULT_COST),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HMAC secret used to sign bearer tokens")
                .long_help(
                    "HMAC secret used to sign bearer tokens.\n\nRequired in the production profile. In development an empty value is replaced by a random per-process secret, so tokens do not survive a restart.",
                )
                .env("BADACALL_JWT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_JWT_ALGORITHM)
                .long(ARG_JWT_ALGORITHM)
                .help("Token signing algorithm")
                .env("BADACALL_JWT_ALGORITHM")
                .default_value(token::DEFAULT_ALGORITHM)
                .value_parser(["HS256", "HS384", "HS512"]),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_MINUTES)
                .long(ARG_TOKEN_TTL_MINUTES)
                .help("Bearer token lifetime in minutes (1 to 525600)")
                .env("BADACALL_TOKEN_TTL_MINUTES")
                .default_value("30")
                .value_parser(clap::value_parser!(i64).range(1..=token::MAX_TTL_MINUTES)),
        )
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long(ARG_BCRYPT_COST)
                .help("bcrypt work factor for new password hashes")
                .env("BADACALL_BCRYPT_COST")
                .default_value("12")
                .value_parser(clap::value_parser!(u32).range(
                    i64::from(password::MIN_COST)..=i64::from(password::MAX_COST),
                )),
        )
}
