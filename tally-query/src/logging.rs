//! Logging infrastructure for Tally.
//!
//! Structured logging controlled by environment variables.
//!
//! # Environment Variables
//!
//! - `TALLY_DEBUG=true` / `TALLY_DEBUG=1` - Enable debug logging
//! - `TALLY_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `TALLY_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use tally_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```
//!
//! Inside the crate, the standard tracing macros are used with structured
//! fields, e.g. `debug!(model = %model, association = %name, "preloading counts")`.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Variable enabling debug logging.
pub const DEBUG_VAR: &str = "TALLY_DEBUG";
/// Variable overriding the log level.
pub const LOG_LEVEL_VAR: &str = "TALLY_LOG_LEVEL";
/// Variable selecting the output format.
pub const LOG_FORMAT_VAR: &str = "TALLY_LOG_FORMAT";

fn truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Check if debug logging is enabled via `TALLY_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR).map(|v| truthy(&v)).unwrap_or(false)
}

/// Resolve a log level from raw `TALLY_DEBUG` / `TALLY_LOG_LEVEL` values.
///
/// Unknown levels fall back to the debug switch: "debug" when it is on,
/// "warn" otherwise.
pub fn resolve_log_level(debug: Option<&str>, level: Option<&str>) -> &'static str {
    let fallback = if debug.is_some_and(truthy) { "debug" } else { "warn" };
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

/// Get the configured log level from the environment.
pub fn get_log_level() -> &'static str {
    let debug = env::var(DEBUG_VAR).ok();
    let level = env::var(LOG_LEVEL_VAR).ok();
    resolve_log_level(debug.as_deref(), level.as_deref())
}

/// Resolve an output format name; anything unknown is "json".
pub fn resolve_log_format(format: Option<&str>) -> &'static str {
    match format.map(str::to_lowercase).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// Get the configured log format from `TALLY_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    resolve_log_format(env::var(LOG_FORMAT_VAR).ok().as_deref())
}

/// Initialize the Tally logging system from the environment.
///
/// This should be called once at application startup. Subsequent calls are
/// no-ops, and nothing is installed unless `TALLY_DEBUG` or
/// `TALLY_LOG_LEVEL` is set.
pub fn init() {
    if !is_debug_enabled() && env::var(LOG_LEVEL_VAR).is_err() {
        return;
    }
    init_with_level(get_log_level());
}

/// Initialize logging with an explicit level, ignoring `TALLY_LOG_LEVEL`.
pub fn init_with_level(level: &str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!(
                "tally={},tally_query={},tally_sqlite={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            // A subscriber installed by the host application wins.
            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level = level, format = get_log_format(), "Tally logging initialized");
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        {
            let _ = level;
        }
    });
}
