use std::{net::SocketAddr, path::PathBuf};

use figment::{
	Figment,
	providers::{Env, Format, Toml},
};
use serde::Deserialize;

use crate::{Result, debug_warn, err, utils};

/// Server configuration, merged from built-in defaults, an optional TOML
/// file, and `SCRAWL_*` environment variables (in increasing precedence).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Address to bind.
	pub address: String,

	/// Port to bind. A port of 0 asks the OS for an ephemeral port.
	pub port: u16,

	/// Path of the SQLite database file.
	pub database_path: PathBuf,

	/// Busy timeout handed to the store driver; readers and the writer wait
	/// this long on a locked database before giving up.
	pub db_busy_timeout_ms: u64,

	/// Number of pooled read connections.
	pub db_read_connections: usize,

	/// Origins allowed by CORS. Empty permits none.
	pub allowed_origins: Vec<String>,

	/// OAuth client id expected in the `aud` claim of IdP id-tokens. When
	/// empty, IdP verification is disabled and only session tokens are
	/// accepted.
	pub idp_client_id: String,

	/// Issuer expected in IdP id-tokens.
	pub idp_issuer: String,

	/// JWKS document used to verify IdP id-token signatures.
	pub idp_jwks_url: String,

	/// HMAC secret signing session tokens. When empty a random per-process
	/// secret is generated; sessions then do not survive a restart.
	pub session_secret: String,

	/// Session token lifetime.
	pub session_lifetime_secs: u64,

	/// S3-compatible blob store endpoint. Empty disables the media surface.
	pub blob_endpoint: String,

	pub blob_region: String,

	pub blob_bucket: String,

	pub blob_access_key: String,

	pub blob_secret_key: String,

	/// Largest blob accepted for a pre-signed upload.
	pub upload_max_bytes: u64,

	pub upload_url_lifetime_secs: u64,

	pub download_url_lifetime_secs: u64,

	/// Idle lifetime of an unfinished stroke in the buffer.
	pub stroke_ttl_secs: u64,

	/// Cadence of the stroke buffer garbage collector.
	pub stroke_gc_interval_secs: u64,

	/// Cadence of transport-level keepalive pings.
	pub keepalive_interval_secs: u64,

	/// Capacity of the persistence actor's job queue; overflow is dropped
	/// and counted.
	pub persist_queue_capacity: usize,

	/// Capacity of each member's send queue; overflow evicts the member.
	pub send_queue_capacity: usize,

	/// Log filter directives.
	pub log: String,

	pub log_colors: bool,

	pub log_thread_ids: bool,

	/// Room the synthetic stroke emitter burns into. Empty disables it.
	pub emitter_room: String,

	pub emitter_strokes: u64,

	pub emitter_updates_per_stroke: u64,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			address: "0.0.0.0".to_owned(),
			port: 8080,
			database_path: PathBuf::from("scrawl.db"),
			db_busy_timeout_ms: 5_000,
			db_read_connections: 4,
			allowed_origins: Vec::new(),
			idp_client_id: String::new(),
			idp_issuer: "https://accounts.google.com".to_owned(),
			idp_jwks_url: "https://www.googleapis.com/oauth2/v3/certs".to_owned(),
			session_secret: String::new(),
			session_lifetime_secs: 7 * 24 * 3600,
			blob_endpoint: String::new(),
			blob_region: "us-east-1".to_owned(),
			blob_bucket: String::new(),
			blob_access_key: String::new(),
			blob_secret_key: String::new(),
			upload_max_bytes: 10 * 1024 * 1024,
			upload_url_lifetime_secs: 15 * 60,
			download_url_lifetime_secs: 3600,
			stroke_ttl_secs: 600,
			stroke_gc_interval_secs: 60,
			keepalive_interval_secs: 54,
			persist_queue_capacity: 10_000,
			send_queue_capacity: 256,
			log: "info".to_owned(),
			log_colors: true,
			log_thread_ids: false,
			emitter_room: String::new(),
			emitter_strokes: 100,
			emitter_updates_per_stroke: 10,
		}
	}
}

impl Config {
	/// Load the configuration, merging the optional TOML file and the
	/// environment over the defaults.
	pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
		let mut figment = Figment::new();
		if let Some(path) = path {
			figment = figment.merge(Toml::file_exact(path));
		}

		let config = figment
			.merge(Env::prefixed("SCRAWL_").split("__"))
			.extract::<Self>()?;

		Ok(config)
	}

	/// Validate and finalize; called once before the server starts.
	pub fn check(&mut self) -> Result {
		if self.session_secret.is_empty() {
			debug_warn!("session_secret is empty; sessions will not survive a restart");
			self.session_secret = utils::rand::string(48);
		}

		if self.stroke_ttl_secs == 0 {
			return Err(err!(Config(
				"stroke_ttl_secs",
				"must be greater than zero"
			)));
		}

		if self.persist_queue_capacity == 0 || self.send_queue_capacity == 0 {
			return Err(err!(Config(
				"persist_queue_capacity",
				"queue capacities must be greater than zero"
			)));
		}

		if !self.blob_endpoint.is_empty() && self.blob_bucket.is_empty() {
			return Err(err!(Config(
				"blob_bucket",
				"required when blob_endpoint is set"
			)));
		}

		Ok(())
	}

	pub fn listen_addr(&self) -> Result<SocketAddr> {
		format!("{}:{}", self.address, self.port)
			.parse()
			.map_err(|e| err!(Config("address", "not a bindable address: {e}")))
	}

	#[inline]
	#[must_use]
	pub fn emitter_enabled(&self) -> bool { !self.emitter_room.is_empty() }
}

#[cfg(test)]
mod tests {
	use super::Config;

	#[test]
	fn defaults_are_sane() {
		let config = Config::default();
		assert_eq!(config.port, 8080);
		assert_eq!(config.stroke_ttl_secs, 600);
		assert_eq!(config.keepalive_interval_secs, 54);
		assert_eq!(config.persist_queue_capacity, 10_000);
	}

	#[test]
	fn check_fills_session_secret() {
		let mut config = Config::default();
		config.check().expect("default config is valid");
		assert!(!config.session_secret.is_empty());
	}

	#[test]
	fn check_rejects_zero_ttl() {
		let mut config = Config { stroke_ttl_secs: 0, ..Config::default() };
		assert!(config.check().is_err());
	}
}
