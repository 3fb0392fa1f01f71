use std::{
	collections::HashMap,
	sync::Arc,
	time::{Duration, Instant},
};

use jsonwebtoken::{
	Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use scrawl_core::{Err, Error, Result, Server, debug, debug_warn, err, utils::time};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::service;

const JWKS_REFRESH_BACKOFF: Duration = Duration::from_secs(60);
const SESSION_ISSUER: &str = "scrawl";

/// Verified identity data extracted from a token.
#[derive(Clone, Debug, Default)]
pub struct Identity {
	pub user_id: String,
	pub name: String,
	pub given_name: String,
	pub email: String,
	pub picture: String,
}

/// Token verification and session minting. Two token shapes are accepted
/// everywhere a token appears: our own HS256 session tokens, and RS256
/// id-tokens from the external IdP (verified against its JWKS document).
pub struct Service {
	server: Arc<Server>,
	http: reqwest::Client,
	jwks: RwLock<JwksCache>,
	session_encoding: EncodingKey,
	session_decoding: DecodingKey,
}

#[derive(Default)]
struct JwksCache {
	keys: HashMap<String, DecodingKey>,
	fetched: Option<Instant>,
}

#[derive(Deserialize)]
struct JwksDocument {
	keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
	#[serde(default)]
	kid: String,
	#[serde(default)]
	kty: String,
	#[serde(default)]
	n: String,
	#[serde(default)]
	e: String,
}

#[derive(Deserialize, Serialize)]
struct SessionClaims {
	sub: String,
	#[serde(default)]
	name: String,
	#[serde(default)]
	given_name: String,
	#[serde(default)]
	email: String,
	#[serde(default)]
	picture: String,
	iss: String,
	iat: i64,
	exp: i64,
}

#[derive(Deserialize)]
struct IdTokenClaims {
	sub: String,
	#[serde(default)]
	name: String,
	#[serde(default)]
	given_name: String,
	#[serde(default)]
	email: String,
	#[serde(default)]
	picture: String,
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		let secret = args.server.config.session_secret.as_bytes();

		Ok(Arc::new(Self {
			server: args.server.clone(),
			http: reqwest::Client::new(),
			jwks: RwLock::new(JwksCache::default()),
			session_encoding: EncodingKey::from_secret(secret),
			session_decoding: DecodingKey::from_secret(secret),
		}))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Verify any accepted token shape. Session tokens are tried first;
	/// they are ours and cheap. IdP id-tokens are the fallback.
	pub async fn verify(&self, token: &str) -> Result<Identity> {
		match self.verify_session(token) {
			| Ok(identity) => Ok(identity),
			| Err(_) => self.verify_id_token(token).await,
		}
	}

	/// Verify one of our own session tokens.
	pub fn verify_session(&self, token: &str) -> Result<Identity> {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.set_issuer(&[SESSION_ISSUER]);

		let data = decode::<SessionClaims>(token, &self.session_decoding, &validation)
			.map_err(unauthorized)?;

		let claims = data.claims;
		Ok(Identity {
			user_id: claims.sub,
			name: claims.name,
			given_name: claims.given_name,
			email: claims.email,
			picture: claims.picture,
		})
	}

	/// Verify an id-token against the external IdP's published keys.
	pub async fn verify_id_token(&self, token: &str) -> Result<Identity> {
		let config = &self.server.config;
		if config.idp_client_id.is_empty() {
			return Err!(Unauthorized("identity provider verification is not configured"));
		}

		let header = decode_header(token).map_err(unauthorized)?;
		let kid = header
			.kid
			.ok_or_else(|| err!(Unauthorized("id-token is missing a key id")))?;

		let key = self.signing_key(&kid).await?;

		let mut validation = Validation::new(Algorithm::RS256);
		validation.set_audience(&[&config.idp_client_id]);
		validation.set_issuer(&[&config.idp_issuer]);

		let data = decode::<IdTokenClaims>(token, &key, &validation).map_err(unauthorized)?;

		let claims = data.claims;
		Ok(Identity {
			user_id: claims.sub,
			name: claims.name,
			given_name: claims.given_name,
			email: claims.email,
			picture: claims.picture,
		})
	}

	/// Mint a session token for a verified identity.
	pub fn mint_session(&self, identity: &Identity) -> Result<String> {
		let now = time::now_secs();
		let lifetime: i64 = self
			.server
			.config
			.session_lifetime_secs
			.try_into()
			.unwrap_or(i64::MAX);

		let claims = SessionClaims {
			sub: identity.user_id.clone(),
			name: identity.name.clone(),
			given_name: identity.given_name.clone(),
			email: identity.email.clone(),
			picture: identity.picture.clone(),
			iss: SESSION_ISSUER.to_owned(),
			iat: now,
			exp: now.saturating_add(lifetime),
		};

		encode(&Header::default(), &claims, &self.session_encoding)
			.map_err(|e| err!("session token encoding failed: {e}"))
	}

	/// Look up a signing key by kid, refreshing the JWKS cache when the kid
	/// is unknown (key rotation), with a backoff so a flood of bad tokens
	/// cannot hammer the IdP.
	async fn signing_key(&self, kid: &str) -> Result<DecodingKey> {
		if let Some(key) = self.jwks.read().await.keys.get(kid) {
			return Ok(key.clone());
		}

		let mut cache = self.jwks.write().await;
		let recently = cache
			.fetched
			.is_some_and(|at| at.elapsed() < JWKS_REFRESH_BACKOFF);

		if !recently {
			match self.fetch_jwks().await {
				| Ok(keys) => {
					debug!(count = keys.len(), "refreshed IdP JWKS");
					cache.keys = keys;
					cache.fetched = Some(Instant::now());
				},
				| Err(error) => {
					debug_warn!("JWKS refresh failed: {error}");
					cache.fetched = Some(Instant::now());
				},
			}
		}

		cache
			.keys
			.get(kid)
			.cloned()
			.ok_or_else(|| err!(Unauthorized("id-token signed by unknown key")))
	}

	async fn fetch_jwks(&self) -> Result<HashMap<String, DecodingKey>> {
		let url = &self.server.config.idp_jwks_url;
		let document: JwksDocument = self
			.http
			.get(url)
			.send()
			.await
			.map_err(|e| err!("JWKS fetch failed: {e}"))?
			.json()
			.await
			.map_err(|e| err!("JWKS parse failed: {e}"))?;

		let mut keys = HashMap::new();
		for jwk in document.keys {
			if jwk.kty != "RSA" || jwk.kid.is_empty() {
				continue;
			}

			match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
				| Ok(key) => {
					keys.insert(jwk.kid, key);
				},
				| Err(error) => debug_warn!(kid = %jwk.kid, "unusable JWK: {error}"),
			}
		}

		Ok(keys)
	}
}

#[cold]
fn unauthorized(e: jsonwebtoken::errors::Error) -> Error {
	err!(Unauthorized("token rejected: {e}"))
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use scrawl_core::{Config, Server};

	use super::{Identity, Service};
	use crate::{Args, OnceServices, Service as _};

	async fn auth() -> Arc<Service> {
		let mut path = std::env::temp_dir();
		path.push(format!(
			"scrawl-auth-test-{}.db",
			scrawl_core::utils::rand::string(8)
		));
		let mut config = Config { database_path: path, ..Config::default() };
		config.check().unwrap();
		let server = Arc::new(Server::new(config, None));
		let db = scrawl_database::Database::open(&server).await.unwrap();
		let once = Arc::new(OnceServices::default());

		Service::build(&Args { server: &server, db: &db, services: &once }).unwrap()
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn session_round_trip() {
		let auth = auth().await;
		let identity = Identity {
			user_id: "user-1".into(),
			name: "Ada".into(),
			email: "ada@example.com".into(),
			..Default::default()
		};

		let token = auth.mint_session(&identity).unwrap();
		let verified = auth.verify_session(&token).unwrap();
		assert_eq!(verified.user_id, "user-1");
		assert_eq!(verified.email, "ada@example.com");
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn garbage_tokens_are_rejected() {
		let auth = auth().await;
		assert!(auth.verify_session("not-a-token").is_err());
		assert!(auth.verify("not-a-token").await.is_err());
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn tampered_session_is_rejected() {
		let auth = auth().await;
		let token = auth.mint_session(&Identity::default()).unwrap();
		let mut tampered = token.clone();
		tampered.push('x');
		assert!(auth.verify_session(&tampered).is_err());
	}
}
