use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Parse the command line, set up logging and build the [`Action`] to run.
///
/// # Errors
///
/// Returns an error if argument parsing, telemetry initialization, or action dispatch fails
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(commands::logging::level(&matches))?;

    dispatch::handler(&matches)
}
