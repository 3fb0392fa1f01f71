use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch as stamped onto rows and events.
#[inline]
#[must_use]
pub fn now_millis() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or(Duration::ZERO)
		.as_millis()
		.try_into()
		.unwrap_or(i64::MAX)
}

/// Seconds since the unix epoch.
#[inline]
#[must_use]
pub fn now_secs() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or(Duration::ZERO)
		.as_secs()
		.try_into()
		.unwrap_or(i64::MAX)
}
