use clap::{Arg, ArgMatches, Command};
use std::{path::PathBuf, time::Duration};

pub const ARG_BOOTSTRAP_TIMEOUT: &str = "bootstrap-timeout";
pub const ARG_ROUTES: &str = "routes";

#[derive(Debug, Clone)]
pub struct Options {
    pub bootstrap_timeout: Duration,
    pub routes: Option<PathBuf>,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the bootstrap timeout is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let seconds = matches
            .get_one::<u64>(ARG_BOOTSTRAP_TIMEOUT)
            .copied()
            .unwrap_or(10);
        if seconds == 0 {
            anyhow::bail!("--{ARG_BOOTSTRAP_TIMEOUT} must be greater than zero");
        }

        Ok(Self {
            bootstrap_timeout: Duration::from_secs(seconds),
            routes: matches
                .get_one::<String>(ARG_ROUTES)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BOOTSTRAP_TIMEOUT)
                .long(ARG_BOOTSTRAP_TIMEOUT)
                .help("Seconds to wait for the session bootstrap before assuming signed out")
                .env("TOTC_BOOTSTRAP_TIMEOUT")
                .default_value("10")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_ROUTES)
                .long(ARG_ROUTES)
                .help("JSON route table replacing the built-in routes")
                .env("TOTC_ROUTES")
                .global(true),
        )
}
