pub mod auth;
pub mod data_service;
pub mod keepalive;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_PROFILE: &str = "profile";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("badacall")
        .about("Emergency reporting backend for boat operators")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("BADACALL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_PROFILE)
                .long(ARG_PROFILE)
                .help("Deployment profile")
                .long_help(
                    "Deployment profile. `production` refuses to start without a token signing secret.",
                )
                .default_value("development")
                .env("BADACALL_PROFILE")
                .value_parser(["development", "production"]),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Allowed CORS origins: `*` or a comma separated list")
                .default_value("*")
                .env("BADACALL_CORS_ORIGIN"),
        );

    let command = data_service::with_args(command);
    let command = auth::with_args(command);
    let command = keepalive::with_args(command);
    logging::with_args(command)
}
