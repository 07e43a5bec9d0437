//! Centralised tracing initialisation for the harvester binaries.
//!
//! Call [`init_tracing`] once at program start. Logs go to stderr so that
//! JSON written to stdout stays machine-readable.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose logs follow the requested level; everything else
/// (HTTP stack, runtime) is held at `warn`.
const HARVEST_TARGETS: &[&str] = &["bfc_core", "bfc_build", "bfc_tracker", "bfc"];

/// Default filter directives for `level`.
pub fn default_directives(level: Level) -> String {
    let mut directives = String::from("warn");
    for target in HARVEST_TARGETS {
        directives.push_str(&format!(",{target}={}", level.as_str().to_lowercase()));
    }
    directives
}

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON log lines.
/// * `level`: verbosity for harvester crates when `RUST_LOG` is not set.
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_level_to_harvester_crates() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("bfc_core=debug"));
        assert!(directives.contains("bfc_build=debug"));
        assert!(directives.contains("bfc=debug"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
