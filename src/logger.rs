//! This module provides a built-in logger implementation.
//!
//! The built-in logger implementation uses the `env_logger` crate. It is
//! enabled by the Cargo feature `builtin_env_logger`, which is enabled by
//! default. When enabled, it is initialized in [`crate::Heap::init`] and will
//! show logs of level INFO or lower (the lower, the more important).
//!
//! This gives a convenient out-of-the-box experience for embedders: they see
//! allocation and collection logs without any configuration, and can tune log
//! levels with the usual `RUST_LOG` environment variable. An embedder that
//! already has its own logging setup can disable the `builtin_env_logger`
//! feature and register its own implementation with the `log` crate before
//! calling `init`.

/// Attempt to init an `env_logger` for this crate. Does nothing if the
/// `builtin_env_logger` feature is disabled.
pub(crate) fn try_init() {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            let result = env_logger::try_init_from_env(
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            );

            match result {
                Ok(()) => {
                    log::debug!("convgc initialized the logger.");
                }
                Err(e) => {
                    // `log::SetLoggerError` is only raised when a logger has already been set.
                    log::debug!("convgc failed to initialize the built-in env_logger: {e}");
                }
            }
        } else {
            log::debug!("convgc didn't initialize the built-in env_logger. The Cargo feature \"builtin_env_logger\" is not enabled.");
        }
    }
}
