pub mod navigate;
pub mod session;

// Internal "interpreter" for `Action`.
mod run;

use crate::cli::commands::{identity, session as session_opts};
use crate::session::{Credentials, NewAccount};

/// Settings shared by every action that talks to the identity service.
#[derive(Debug, Clone)]
pub struct Context {
    pub identity: identity::Options,
    pub session: session_opts::Options,
}

#[derive(Debug)]
pub enum Action {
    Login {
        context: Context,
        credentials: Credentials,
    },
    Register {
        context: Context,
        account: NewAccount,
    },
    Logout {
        context: Context,
    },
    Whoami {
        context: Context,
    },
    Visit {
        context: Context,
        path: String,
        follow: bool,
    },
    Nav {
        context: Context,
    },
    Routes {
        session: session_opts::Options,
    },
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
