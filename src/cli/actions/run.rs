use crate::cli::actions::{navigate, session, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login {
            context,
            credentials,
        } => session::login(&context, &credentials).await,
        Action::Register { context, account } => session::register(&context, &account).await,
        Action::Logout { context } => session::logout(&context).await,
        Action::Whoami { context } => session::whoami(&context).await,
        Action::Visit {
            context,
            path,
            follow,
        } => navigate::visit(&context, &path, follow).await,
        Action::Nav { context } => navigate::nav(&context).await,
        Action::Routes { session } => navigate::routes(&session).await,
    }
}
