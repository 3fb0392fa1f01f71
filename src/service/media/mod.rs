use std::sync::Arc;

use hmac::{Hmac, Mac};
use scrawl_core::{Err, Result, Server, err};
use sha2::{Digest, Sha256};
use url::Url;

use crate::service;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Pre-signed blob URLs against an S3-compatible store, SigV4 query
/// signing. Only `host` is a signed header so clients stay free to set
/// content headers on the PUT themselves.
pub struct Service {
	server: Arc<Server>,
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self { server: args.server.clone() }))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	#[inline]
	#[must_use]
	pub fn enabled(&self) -> bool { !self.server.config.blob_endpoint.is_empty() }

	/// Pre-sign an upload. The object key is namespaced under the room.
	pub fn presign_put(&self, key: &str) -> Result<String> {
		let expires = self.server.config.upload_url_lifetime_secs;
		self.presign("PUT", key, expires)
	}

	pub fn presign_get(&self, key: &str) -> Result<String> {
		let expires = self.server.config.download_url_lifetime_secs;
		self.presign("GET", key, expires)
	}

	fn presign(&self, method: &str, key: &str, expires_secs: u64) -> Result<String> {
		let config = &self.server.config;
		if !self.enabled() {
			return Err!(NotFound("blob store is not configured"));
		}

		let endpoint = Url::parse(&config.blob_endpoint)
			.map_err(|e| err!(Config("blob_endpoint", "not a valid URL: {e}")))?;
		let host = endpoint
			.host_str()
			.map(|host| match endpoint.port() {
				| Some(port) => format!("{host}:{port}"),
				| None => host.to_owned(),
			})
			.ok_or_else(|| err!(Config("blob_endpoint", "missing a host")))?;

		let canonical_uri = format!(
			"/{}/{}",
			uri_encode(&config.blob_bucket, false),
			uri_encode(key, false)
		);

		let now = chrono::Utc::now();
		let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
		let datestamp = now.format("%Y%m%d").to_string();
		let scope = format!("{datestamp}/{}/s3/aws4_request", config.blob_region);
		let credential = format!("{}/{scope}", config.blob_access_key);

		// already in canonical (alphabetical) order
		let canonical_query = format!(
			"X-Amz-Algorithm={ALGORITHM}\
			&X-Amz-Credential={}\
			&X-Amz-Date={amz_date}\
			&X-Amz-Expires={expires_secs}\
			&X-Amz-SignedHeaders=host",
			uri_encode(&credential, true),
		);

		let canonical_request = format!(
			"{method}\n{canonical_uri}\n{canonical_query}\nhost:{host}\n\nhost\n{UNSIGNED_PAYLOAD}"
		);

		let string_to_sign = format!(
			"{ALGORITHM}\n{amz_date}\n{scope}\n{}",
			hex(&Sha256::digest(canonical_request.as_bytes()))
		);

		let secret = format!("AWS4{}", config.blob_secret_key);
		let k_date = sign(secret.as_bytes(), datestamp.as_bytes());
		let k_region = sign(&k_date, config.blob_region.as_bytes());
		let k_service = sign(&k_region, b"s3");
		let k_signing = sign(&k_service, b"aws4_request");
		let signature = hex(&sign(&k_signing, string_to_sign.as_bytes()));

		Ok(format!(
			"{}://{host}{canonical_uri}?{canonical_query}&X-Amz-Signature={signature}",
			endpoint.scheme(),
		))
	}
}

fn sign(key: &[u8], data: &[u8]) -> Vec<u8> {
	let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
	mac.update(data);
	mac.finalize().into_bytes().to_vec()
}

fn hex(bytes: &[u8]) -> String {
	bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
		use std::fmt::Write;
		write!(out, "{byte:02x}").expect("writing to a String cannot fail");
		out
	})
}

/// RFC 3986 encoding with the AWS unreserved set. Slashes survive in object
/// keys (`encode_slash = false`) but not inside query values.
fn uri_encode(input: &str, encode_slash: bool) -> String {
	let mut out = String::with_capacity(input.len());
	for byte in input.bytes() {
		match byte {
			| b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' =>
				out.push(byte as char),
			| b'/' if !encode_slash => out.push('/'),
			| _ => {
				use std::fmt::Write;
				write!(out, "%{byte:02X}").expect("writing to a String cannot fail");
			},
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use scrawl_core::{Config, Server};

	use super::{Service, hex, uri_encode};
	use crate::{Args, OnceServices, Service as _};

	async fn media(endpoint: &str) -> Arc<Service> {
		let mut path = std::env::temp_dir();
		path.push(format!(
			"scrawl-media-test-{}.db",
			scrawl_core::utils::rand::string(8)
		));
		let config = Config {
			database_path: path,
			blob_endpoint: endpoint.to_owned(),
			blob_bucket: "whiteboard-media".to_owned(),
			blob_access_key: "AKIDEXAMPLE".to_owned(),
			blob_secret_key: "secret".to_owned(),
			..Config::default()
		};
		let server = Arc::new(Server::new(config, None));
		let db = scrawl_database::Database::open(&server).await.unwrap();
		let once = Arc::new(OnceServices::default());

		Service::build(&Args { server: &server, db: &db, services: &once }).unwrap()
	}

	#[test]
	fn aws_uri_encoding() {
		assert_eq!(uri_encode("rooms/r1/img.png", false), "rooms/r1/img.png");
		assert_eq!(uri_encode("rooms/r1/img.png", true), "rooms%2Fr1%2Fimg.png");
		assert_eq!(uri_encode("a b+c", true), "a%20b%2Bc");
	}

	#[test]
	fn hex_is_lowercase() {
		assert_eq!(hex(&[0x00, 0xff, 0x0a]), "00ff0a");
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn presigned_url_carries_signature() {
		let media = media("https://blobs.example.com").await;
		let url = media.presign_put("rooms/r1/cat.png").unwrap();

		assert!(url.starts_with("https://blobs.example.com/whiteboard-media/rooms/r1/cat.png?"));
		assert!(url.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
		assert!(url.contains("X-Amz-SignedHeaders=host"));
		assert!(url.contains("X-Amz-Signature="));
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn disabled_without_endpoint() {
		let media = media("").await;
		assert!(!media.enabled());
		assert!(media.presign_get("k").is_err());
	}
}
