use crate::cli::actions::{session::connect, Context};
use crate::cli::commands::session::Options;
use crate::session::{nav_links, routes::Access, Navigation, RedirectReason, RouteTable};
use anyhow::{Context as _, Result};
use std::fmt::Write as _;
use tracing::info;

/// Built-in routes, or the table from `--routes`.
///
/// # Errors
/// Returns an error if the route file cannot be read or is invalid.
pub async fn load_routes(options: &Options) -> Result<RouteTable> {
    let Some(path) = &options.routes else {
        return Ok(RouteTable::default());
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read route file: {}", path.display()))?;
    let table = RouteTable::from_json(&raw)
        .with_context(|| format!("Invalid route file: {}", path.display()))?;
    info!(path = %path.display(), routes = table.routes().len(), "loaded route table");
    Ok(table)
}

#[must_use]
pub fn render(navigation: &Navigation) -> String {
    match navigation {
        Navigation::Pending => "pending: waiting for session".to_string(),
        Navigation::Render { path, params } => {
            let mut out = format!("render {path}");
            for (name, value) in params {
                let _ = write!(out, " {name}={value}");
            }
            out
        }
        Navigation::Redirect { to, reason } => {
            let reason = match reason {
                RedirectReason::Unauthenticated => "sign-in required",
                RedirectReason::WrongRole => "wrong role",
                RedirectReason::UnknownPath => "unknown path",
            };
            format!("redirect {to} ({reason})")
        }
    }
}

/// # Errors
/// Returns an error if the route table or identity client cannot be set up.
pub async fn visit(context: &Context, path: &str, follow: bool) -> Result<()> {
    let routes = load_routes(&context.session).await?;
    let (client, facade) = connect(context)?;

    if !follow {
        facade.initialize().await;
        println!("{}", render(&facade.navigate(&routes, path)));
        return Ok(());
    }

    // Listen before bootstrapping so no notification is missed.
    let _subscription = facade.subscribe();
    let mut changes = facade.watch();
    println!("{}", render(&facade.navigate(&routes, path)));

    facade.initialize().await;
    let _auto_refresh = client.spawn_auto_refresh();

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render(&facade.navigate(&routes, path)));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    Ok(())
}

/// # Errors
/// Returns an error if the identity client cannot be built.
pub async fn nav(context: &Context) -> Result<()> {
    let (_, facade) = connect(context)?;
    let session = facade.initialize().await;
    for link in nav_links(&session) {
        println!("{link}");
    }
    Ok(())
}

/// # Errors
/// Returns an error if the route file cannot be loaded.
pub async fn routes(options: &Options) -> Result<()> {
    let table = load_routes(options).await?;
    for route in table.routes() {
        let access = match route.access {
            Access::Public => "public".to_string(),
            Access::Protected(requirement) => match requirement.required_role {
                Some(role) => format!("role: {role}"),
                None => "authenticated".to_string(),
            },
        };
        println!("{:<32} {access}", route.path);
    }
    Ok(())
}
