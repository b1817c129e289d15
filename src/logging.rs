use crate::config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this twice is harmless:
/// the second subscriber is ignored.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Warning: logging already initialized ({})", e);
    }
}

/// Our crates log at `level`, dependencies (wgpu, winit, ...) only warnings.
fn default_directives(level: &str) -> String {
    format!(
        "warn,live_mnist={level},live_mnist_app={level},network={level},preprocess={level}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        let directives = default_directives("debug");
        assert!(directives.contains("network=debug"));
        assert!(EnvFilter::try_new(directives).is_ok());
    }
}
