//! Tracing setup for the vendorgen binary.
//!
//! Native tool output can be long, so per-file events are logged at DEBUG
//! and only stage transitions at INFO. Events go to stderr; stdout is kept
//! for reports.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives used when `RUST_LOG` is unset. Subprocess plumbing
/// stays at WARN unless DEBUG was asked for.
pub fn default_directives(level: Level) -> String {
    let native = if level >= Level::DEBUG {
        level
    } else {
        Level::WARN
    };
    format!(
        "{level},vendorgen_native={native}",
        level = level.as_str().to_lowercase(),
        native = native.as_str().to_lowercase()
    )
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With `json`, events are written
/// as newline-delimited JSON. Only the first call in a process has an effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer).try_init().ok();
    }
}
