pub use tracing::{debug, error, info, trace, warn};

/// Log at info level in debug-mode builds, but debug level in release-mode
/// builds. For diagnostics interesting during development without spamming
/// production logs.
#[macro_export]
macro_rules! debug_info {
	($($x:tt)+) => {
		if cfg!(debug_assertions) {
			::tracing::info!($($x)+);
		} else {
			::tracing::debug!($($x)+);
		}
	}
}

/// Log at warn level in debug-mode builds, but debug level in release-mode
/// builds.
#[macro_export]
macro_rules! debug_warn {
	($($x:tt)+) => {
		if cfg!(debug_assertions) {
			::tracing::warn!($($x)+);
		} else {
			::tracing::debug!($($x)+);
		}
	}
}

/// Log at error level in debug-mode builds, but debug level in release-mode
/// builds.
#[macro_export]
macro_rules! debug_error {
	($($x:tt)+) => {
		if cfg!(debug_assertions) {
			::tracing::error!($($x)+);
		} else {
			::tracing::debug!($($x)+);
		}
	}
}
