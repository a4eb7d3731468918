use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVELS: [(&str, Option<Level>); 5] = [
    ("error", None),
    ("warn", Some(Level::WARN)),
    ("info", Some(Level::INFO)),
    ("debug", Some(Level::DEBUG)),
    ("trace", Some(Level::TRACE)),
];

fn parse_verbosity(value: &str) -> Result<u8, String> {
    let value = value.trim().to_ascii_lowercase();
    if let Ok(count) = value.parse::<u8>() {
        return Ok(count.min(4));
    }
    LEVELS
        .iter()
        .position(|(name, _)| *name == value)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level '{value}' (error, warn, info, debug, trace)"))
}

/// Tracing level for a verbosity count; `None` keeps the default (`ERROR`).
#[must_use]
pub fn level_for(verbosity: u8) -> Option<Level> {
    LEVELS[usize::from(verbosity.min(4))].1
}

/// Level requested on the command line or through `BADACALL_LOG_LEVEL`.
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    level_for(matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("BADACALL_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(ValueParser::from(parse_verbosity)),
    )
}
