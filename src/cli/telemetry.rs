use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Json,
}

fn filter(verbosity_level: Level) -> Result<EnvFilter> {
    Ok(EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("hyper_util=error".parse()?)
        .add_directive("reqwest=warn".parse()?))
}

/// Initialize logging on stderr; stdout is reserved for command output.
/// `RUST_LOG` directives override the verbosity level.
///
/// # Errors
///
/// Returns an error if the subscriber is already set or a directive is invalid
pub fn init(verbosity_level: Option<Level>, format: Format) -> Result<()> {
    let filter = filter(verbosity_level.unwrap_or(Level::ERROR))?;

    match format {
        Format::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(false)
                .with_writer(std::io::stderr);
            let subscriber = Registry::default().with(fmt_layer).with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        Format::Text => {
            let fmt_layer = fmt::layer()
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(false)
                .with_target(false)
                .with_writer(std::io::stderr);
            let subscriber = Registry::default().with(fmt_layer).with(filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_default_level() {
        temp_env::with_var("RUST_LOG", None::<&str>, || {
            let filter = filter(Level::DEBUG).map(|f| f.to_string());
            assert!(matches!(filter, Ok(ref f) if f.contains("debug")));
        });
    }

    #[test]
    fn test_filter_honours_rust_log() {
        temp_env::with_var("RUST_LOG", Some("totc=trace"), || {
            let filter = filter(Level::ERROR).map(|f| f.to_string());
            assert!(matches!(filter, Ok(ref f) if f.contains("totc=trace")));
        });
    }
}
