//! Logger setup for native and browser builds.

use crate::config::LogLevel;

/// Install the global logger at `level`.
///
/// Calling this more than once keeps the first logger.
#[cfg(not(target_arch = "wasm32"))]
pub fn init(level: LogLevel) {
    let result = env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .format_timestamp_millis()
        .try_init();
    if result.is_err() {
        log::debug!("Logger already initialised");
    }
}

/// Install the global logger at `level`, writing to the browser console.
#[cfg(target_arch = "wasm32")]
pub fn init(level: LogLevel) {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(level.to_level()).is_err() {
        log::debug!("Logger already initialised");
    }
}
