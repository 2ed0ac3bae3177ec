pub mod identity;
pub mod logging;
pub mod session;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const CMD_LOGIN: &str = "login";
pub const CMD_REGISTER: &str = "register";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_WHOAMI: &str = "whoami";
pub const CMD_VISIT: &str = "visit";
pub const CMD_NAV: &str = "nav";
pub const CMD_ROUTES: &str = "routes";

fn email_arg() -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email address")
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new("password")
        .short('p')
        .long("password")
        .help("Account password")
        .env("TOTC_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

fn subcommands() -> Vec<Command> {
    vec![
        Command::new(CMD_LOGIN)
            .about("Sign in with email and password")
            .arg(email_arg())
            .arg(password_arg()),
        Command::new(CMD_REGISTER)
            .about("Create an account and its profile")
            .arg(email_arg())
            .arg(password_arg())
            .arg(
                Arg::new("full-name")
                    .short('n')
                    .long("full-name")
                    .help("Full name shown on the profile")
                    .required(true),
            )
            .arg(Arg::new("phone").long("phone").help("Phone number"))
            .arg(
                Arg::new("role")
                    .short('r')
                    .long("role")
                    .help("Account type")
                    .default_value("student")
                    .value_parser(["student", "instructor"]),
            ),
        Command::new(CMD_LOGOUT).about("Sign out and forget the cached session"),
        Command::new(CMD_WHOAMI).about("Show the restored session"),
        Command::new(CMD_VISIT)
            .about("Resolve a path against the route table and the current session")
            .arg(
                Arg::new("path")
                    .help("Path to open, example: /lesson/3/1")
                    .required(true),
            )
            .arg(
                Arg::new("follow")
                    .short('f')
                    .long("follow")
                    .help("Keep listening for session changes and re-evaluate the path")
                    .action(ArgAction::SetTrue),
            ),
        Command::new(CMD_NAV).about("List navigation links for the current session"),
        Command::new(CMD_ROUTES).about("Print the route table"),
    ]
}

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

    let command = Command::new("totc")
        .about("TOTC session and access-control client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommands(subcommands());

    let command = identity::with_args(command);
    let command = session::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const CLEAN_ENV: [(&str, Option<&str>); 9] = [
        ("TOTC_SUPABASE_URL", None),
        ("TOTC_SUPABASE_ANON_KEY", None),
        ("TOTC_CREDENTIALS", None),
        ("TOTC_NO_PERSIST", None),
        ("TOTC_BOOTSTRAP_TIMEOUT", None),
        ("TOTC_ROUTES", None),
        ("TOTC_LOG_LEVEL", None),
        ("TOTC_LOG_JSON", None),
        ("TOTC_PASSWORD", None),
    ];

    fn env_with(
        overrides: &[(&'static str, &'static str)],
    ) -> Vec<(&'static str, Option<&'static str>)> {
        CLEAN_ENV
            .iter()
            .map(|(key, _)| {
                let value = overrides
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| *value);
                (*key, value)
            })
            .collect()
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "totc");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("TOTC session and access-control client".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_login_args() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches = new().get_matches_from(vec![
                "totc",
                "--supabase-url",
                "https://project.supabase.co",
                "--anon-key",
                "anon",
                "login",
                "--email",
                "ana@totc.dev",
                "--password",
                "secret",
            ]);

            assert_eq!(matches.subcommand_name(), Some(CMD_LOGIN));
            let sub = matches.subcommand_matches(CMD_LOGIN);
            assert_eq!(
                sub.and_then(|m| m.get_one::<String>("email")).cloned(),
                Some("ana@totc.dev".to_string())
            );
            assert_eq!(
                matches.get_one::<String>(identity::ARG_SUPABASE_URL).cloned(),
                Some("https://project.supabase.co".to_string())
            );
        });
    }

    #[test]
    fn test_global_args_after_subcommand() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches = new().get_matches_from(vec![
                "totc",
                "whoami",
                "--supabase-url",
                "http://localhost:54321",
                "-vv",
            ]);
            let sub = matches.subcommand_matches(CMD_WHOAMI);
            assert_eq!(
                sub.and_then(|m| m.get_one::<String>(identity::ARG_SUPABASE_URL))
                    .cloned(),
                Some("http://localhost:54321".to_string())
            );
            assert_eq!(
                sub.and_then(|m| m.get_one::<u8>(logging::ARG_VERBOSITY)).copied(),
                Some(2)
            );
        });
    }

    #[test]
    fn test_check_env() {
        let vars = env_with(&[
            ("TOTC_SUPABASE_URL", "https://project.supabase.co"),
            ("TOTC_SUPABASE_ANON_KEY", "anon"),
            ("TOTC_CREDENTIALS", "/tmp/totc-credentials.json"),
            ("TOTC_BOOTSTRAP_TIMEOUT", "3"),
            ("TOTC_ROUTES", "/etc/totc/routes.json"),
            ("TOTC_LOG_LEVEL", "info"),
            ("TOTC_LOG_JSON", "true"),
        ]);
        temp_env::with_vars(vars, || {
            let matches = new().get_matches_from(vec!["totc", "nav"]);

            assert_eq!(matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(), Some(2));
            assert!(matches.get_flag(logging::ARG_LOG_JSON));

            let identity = identity::Options::parse(&matches)
                .unwrap_or_else(|e| panic!("identity options should parse: {e}"));
            assert_eq!(identity.url.as_str(), "https://project.supabase.co/");
            assert_eq!(
                identity.credentials,
                Some("/tmp/totc-credentials.json".into())
            );

            let session = session::Options::parse(&matches)
                .unwrap_or_else(|e| panic!("session options should parse: {e}"));
            assert_eq!(session.bootstrap_timeout, Duration::from_secs(3));
            assert_eq!(session.routes, Some("/etc/totc/routes.json".into()));
        });
    }

    #[test]
    fn test_password_from_env() {
        let vars = env_with(&[("TOTC_PASSWORD", "from-env")]);
        temp_env::with_vars(vars, || {
            let matches = new().get_matches_from(vec![
                "totc",
                "login",
                "--email",
                "ana@totc.dev",
            ]);
            let sub = matches.subcommand_matches(CMD_LOGIN);
            assert_eq!(
                sub.and_then(|m| m.get_one::<String>("password")).cloned(),
                Some("from-env".to_string())
            );
        });
    }

    #[test]
    fn test_no_persist_disables_cache() {
        let vars = env_with(&[
            ("TOTC_SUPABASE_URL", "https://project.supabase.co"),
            ("TOTC_SUPABASE_ANON_KEY", "anon"),
            ("TOTC_NO_PERSIST", "true"),
        ]);
        temp_env::with_vars(vars, || {
            let matches = new().get_matches_from(vec!["totc", "whoami"]);
            let identity = identity::Options::parse(&matches)
                .unwrap_or_else(|e| panic!("identity options should parse: {e}"));
            assert_eq!(identity.credentials, None);
        });
    }

    #[test]
    fn test_identity_options_require_url_and_key() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches = new().get_matches_from(vec!["totc", "whoami"]);
            assert!(identity::Options::parse(&matches).is_err());

            let matches = new().get_matches_from(vec![
                "totc",
                "--supabase-url",
                "ftp://project.supabase.co",
                "--anon-key",
                "anon",
                "whoami",
            ]);
            assert!(identity::Options::parse(&matches).is_err());
        });
    }

    #[test]
    fn test_register_rejects_admin_role() {
        temp_env::with_vars(CLEAN_ENV, || {
            let result = new().try_get_matches_from(vec![
                "totc",
                "register",
                "--email",
                "ana@totc.dev",
                "--password",
                "secret",
                "--full-name",
                "Ana",
                "--role",
                "admin",
            ]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_zero_bootstrap_timeout_is_rejected() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches =
                new().get_matches_from(vec!["totc", "--bootstrap-timeout", "0", "routes"]);
            assert!(session::Options::parse(&matches).is_err());
        });
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            let vars = env_with(&[("TOTC_LOG_LEVEL", level)]);
            temp_env::with_vars(vars, || {
                let matches = new().get_matches_from(vec!["totc", "routes"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars(CLEAN_ENV, || {
                let mut args = vec!["totc".to_string(), "routes".to_string()];
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}
