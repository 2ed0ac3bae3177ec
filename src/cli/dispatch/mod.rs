//! Maps validated CLI arguments to an [`Action`].

use crate::cli::actions::{Action, Context};
use crate::cli::commands::{
    identity, session, CMD_LOGIN, CMD_LOGOUT, CMD_NAV, CMD_REGISTER, CMD_ROUTES, CMD_VISIT,
    CMD_WHOAMI,
};
use crate::session::{Credentials, NewAccount, Role};
use anyhow::{anyhow, Context as _, Result};
use clap::ArgMatches;
use secrecy::SecretString;

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn context(matches: &ArgMatches) -> Result<Context> {
    Ok(Context {
        identity: identity::Options::parse(matches)?,
        session: session::Options::parse(matches)?,
    })
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let Some((name, sub)) = matches.subcommand() else {
        return Err(anyhow!("missing subcommand"));
    };

    let action = match name {
        CMD_LOGIN => Action::Login {
            context: context(sub)?,
            credentials: Credentials {
                email: required(sub, "email")?,
                password: SecretString::from(required(sub, "password")?),
            },
        },
        CMD_REGISTER => {
            let role = required(sub, "role")?
                .parse::<Role>()
                .context("invalid --role")?;
            Action::Register {
                context: context(sub)?,
                account: NewAccount {
                    email: required(sub, "email")?,
                    password: SecretString::from(required(sub, "password")?),
                    full_name: required(sub, "full-name")?,
                    phone: sub.get_one::<String>("phone").cloned(),
                    role,
                },
            }
        }
        CMD_LOGOUT => Action::Logout {
            context: context(sub)?,
        },
        CMD_WHOAMI => Action::Whoami {
            context: context(sub)?,
        },
        CMD_VISIT => Action::Visit {
            context: context(sub)?,
            path: required(sub, "path")?,
            follow: sub.get_flag("follow"),
        },
        CMD_NAV => Action::Nav {
            context: context(sub)?,
        },
        CMD_ROUTES => Action::Routes {
            session: session::Options::parse(sub)?,
        },
        other => return Err(anyhow!("unknown subcommand: {other}")),
    };

    Ok(action)
}
