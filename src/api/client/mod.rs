pub mod media;
pub mod replay;
pub mod session;
pub mod users;

use http::{HeaderMap, header::AUTHORIZATION};
use scrawl_core::{Result, err};

/// Extract the bearer token from the Authorization header.
pub(crate) fn bearer(headers: &HeaderMap) -> Result<&str> {
	headers
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "))
		.filter(|token| !token.is_empty())
		.ok_or_else(|| err!(Unauthorized("missing bearer token")))
}

#[cfg(test)]
mod tests {
	use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};

	use super::bearer;

	#[test]
	fn extracts_bearer_tokens() {
		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
		assert_eq!(bearer(&headers).unwrap(), "abc123");
	}

	#[test]
	fn rejects_missing_or_malformed() {
		assert!(bearer(&HeaderMap::new()).is_err());

		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
		assert!(bearer(&headers).is_err());

		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
		assert!(bearer(&headers).is_err());
	}
}
