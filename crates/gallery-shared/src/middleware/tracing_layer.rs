use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `GALLERY_LOG_FORMAT=json|pretty` wins; otherwise production logs as JSON.
    fn from_env() -> Self {
        Self::resolve(
            std::env::var("GALLERY_LOG_FORMAT").ok().as_deref(),
            std::env::var("GALLERY_ENV").ok().as_deref(),
        )
    }

    fn resolve(format: Option<&str>, env: Option<&str>) -> Self {
        match format.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | Some("text") => LogFormat::Pretty,
            _ if env == Some("production") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn default_directives(service_name: &str) -> String {
    let service_target = service_name.replace('-', "_");
    format!("info,{service_target}=debug,gallery_store=debug,tower_http=debug")
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// Calling it twice keeps the first subscriber.
pub fn init_tracing(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name)));

    let format = LogFormat::from_env();
    let installed = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(service = service_name, format = ?format, "tracing initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_format_beats_environment() {
        assert_eq!(LogFormat::resolve(Some("JSON"), None), LogFormat::Json);
        assert_eq!(LogFormat::resolve(Some("pretty"), Some("production")), LogFormat::Pretty);
        assert_eq!(LogFormat::resolve(None, Some("production")), LogFormat::Json);
        assert_eq!(LogFormat::resolve(None, Some("development")), LogFormat::Pretty);
    }

    #[test]
    fn service_name_becomes_a_target() {
        assert_eq!(
            default_directives("gallery-import"),
            "info,gallery_import=debug,gallery_store=debug,tower_http=debug"
        );
    }
}
