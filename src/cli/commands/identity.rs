use crate::identity::credentials::CredentialCache;
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use std::path::PathBuf;
use url::Url;

pub const ARG_SUPABASE_URL: &str = "supabase-url";
pub const ARG_ANON_KEY: &str = "anon-key";
pub const ARG_CREDENTIALS: &str = "credentials";
pub const ARG_NO_PERSIST: &str = "no-persist";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: Url,
    pub anon_key: SecretString,
    /// `None` when persistence is disabled.
    pub credentials: Option<PathBuf>,
}

impl Options {
    /// Parse identity service arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the URL or key is missing, or the URL is not http(s).
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(raw_url) = get_non_empty(ARG_SUPABASE_URL) else {
            anyhow::bail!("missing required argument: --{ARG_SUPABASE_URL}");
        };
        let url = Url::parse(raw_url.trim())
            .map_err(|e| anyhow::anyhow!("invalid --{ARG_SUPABASE_URL} {raw_url:?}: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("--{ARG_SUPABASE_URL} must use http or https");
        }

        let Some(anon_key) = get_non_empty(ARG_ANON_KEY) else {
            anyhow::bail!("missing required argument: --{ARG_ANON_KEY}");
        };

        let credentials = if matches.get_flag(ARG_NO_PERSIST) {
            None
        } else {
            Some(
                get_non_empty(ARG_CREDENTIALS)
                    .map_or_else(CredentialCache::default_path, PathBuf::from),
            )
        };

        Ok(Self {
            url,
            anon_key: SecretString::from(anon_key),
            credentials,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SUPABASE_URL)
                .long(ARG_SUPABASE_URL)
                .help("Identity service base URL, example: https://<project>.supabase.co")
                .env("TOTC_SUPABASE_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_ANON_KEY)
                .long(ARG_ANON_KEY)
                .help("Public (anon) API key of the identity service")
                .env("TOTC_SUPABASE_ANON_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_CREDENTIALS)
                .long(ARG_CREDENTIALS)
                .help("Credential cache file (default: $HOME/.totc/credentials.json)")
                .env("TOTC_CREDENTIALS")
                .global(true),
        )
        .arg(
            Arg::new(ARG_NO_PERSIST)
                .long(ARG_NO_PERSIST)
                .help("Keep the session in memory only")
                .env("TOTC_NO_PERSIST")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with(ARG_CREDENTIALS),
        )
}
