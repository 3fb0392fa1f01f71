use std::{borrow::Cow, convert::Infallible, sync::PoisonError};

use axum::response::{IntoResponse, Response};
use http::StatusCode;

#[derive(thiserror::Error)]
pub enum Error {
	// std
	#[error(transparent)]
	Fmt(#[from] std::fmt::Error),
	#[error(transparent)]
	FromUtf8(#[from] std::string::FromUtf8Error),
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	ParseInt(#[from] std::num::ParseIntError),
	#[error(transparent)]
	Utf8(#[from] std::str::Utf8Error),

	// third-party
	#[error(transparent)]
	Figment(#[from] figment::error::Error),
	#[error(transparent)]
	Http(#[from] http::Error),
	#[error("Join error: {0}")]
	JoinError(#[from] tokio::task::JoinError),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error("Mutex poisoned: {0}")]
	Poison(Cow<'static, str>),

	// scrawl
	#[error("{0}")]
	BadRequest(Cow<'static, str>),
	#[error("There was a problem with the '{0}' directive in your configuration: {1}")]
	Config(&'static str, Cow<'static, str>),
	#[error("{0}")]
	Conflict(Cow<'static, str>),
	#[error("{0}")]
	Database(Cow<'static, str>),
	#[error("{0}")]
	Forbidden(Cow<'static, str>),
	#[error("{0}")]
	NotFound(Cow<'static, str>),
	#[error("{0}")]
	Unauthorized(Cow<'static, str>),

	// unique / untyped
	#[error("{0}")]
	Err(Cow<'static, str>),
}

impl Error {
	#[inline]
	#[must_use]
	pub fn from_errno() -> Self { Self::Io(std::io::Error::last_os_error()) }

	/// Sanitizes public-facing errors that can leak sensitive information.
	pub fn sanitized_message(&self) -> String {
		match self {
			| Self::Database(..) => String::from("Database error occurred."),
			| Self::Io(..) => String::from("I/O error occurred."),
			| _ => self.message(),
		}
	}

	/// Generate the error message string.
	pub fn message(&self) -> String { format!("{self}") }

	/// Returns the HTTP error code or closest approximation based on error
	/// variant.
	pub fn status_code(&self) -> StatusCode {
		match self {
			| Self::BadRequest(..) | Self::Json(..) => StatusCode::BAD_REQUEST,
			| Self::Unauthorized(..) => StatusCode::UNAUTHORIZED,
			| Self::Forbidden(..) => StatusCode::FORBIDDEN,
			| Self::NotFound(..) => StatusCode::NOT_FOUND,
			| Self::Conflict(..) => StatusCode::CONFLICT,
			| _ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Returns true for "not found" errors. Often used as a special case to
	/// eliminate a contained Option with a Result where Ok(None) is instead
	/// Err(e) if e.is_not_found().
	#[inline]
	pub fn is_not_found(&self) -> bool { self.status_code() == StatusCode::NOT_FOUND }
}

impl std::fmt::Debug for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.message())
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = self.status_code();
		let body = serde_json::json!({ "error": self.sanitized_message() });

		(status, axum::Json(body)).into_response()
	}
}

impl<T> From<PoisonError<T>> for Error {
	#[cold]
	#[inline(never)]
	fn from(e: PoisonError<T>) -> Self { Self::Poison(e.to_string().into()) }
}

#[allow(clippy::fallible_impl_from)]
impl From<Infallible> for Error {
	#[cold]
	#[inline(never)]
	fn from(_e: Infallible) -> Self {
		panic!("infallible error should never exist");
	}
}

/// Construct an Error from a formatting expression. A variant name may prefix
/// the format arguments to select that variant, otherwise the untyped variant
/// is used.
#[macro_export]
macro_rules! err {
	(Config($directive:literal, $($args:tt)+)) => {
		$crate::Error::Config($directive, format!($($args)+).into())
	};

	($variant:ident($($args:tt)+)) => {
		$crate::Error::$variant(format!($($args)+).into())
	};

	($($args:tt)+) => {
		$crate::Error::Err(format!($($args)+).into())
	};
}

/// Shortcut for Err(err!(..))
#[macro_export]
macro_rules! Err {
	($($args:tt)+) => {
		Err($crate::err!($($args)+))
	};
}

#[cfg(test)]
mod tests {
	use super::Error;

	#[test]
	fn variant_formatting() {
		let e = crate::err!(Forbidden("no access to room {}", "general"));
		assert!(matches!(e, Error::Forbidden(_)));
		assert_eq!(e.message(), "no access to room general");
	}

	#[test]
	fn untyped_formatting() {
		let e = crate::err!("unexpected {}", 42);
		assert!(matches!(e, Error::Err(_)));
		assert_eq!(e.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn sanitizes_database_errors() {
		let e = crate::err!(Database("secret path /var/db leaked"));
		assert_eq!(e.sanitized_message(), "Database error occurred.");
	}
}
