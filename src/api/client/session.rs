use std::sync::Arc;

use axum::{Json, extract::State};
use http::HeaderMap;
use scrawl_core::Result;
use scrawl_service::{Services, users};
use serde::{Deserialize, Serialize};

use super::bearer;

#[derive(Deserialize)]
pub(crate) struct CookieRequest {
	token: String,
}

#[derive(Serialize)]
pub(crate) struct CookieResponse {
	token: String,
	#[serde(rename = "userId")]
	user_id: String,
	name: String,
	color: String,
}

/// `POST /cookie`: exchange a verified IdP id-token for one of our session
/// tokens, upserting the user row on the way.
pub(crate) async fn cookie(
	State(services): State<Arc<Services>>,
	Json(request): Json<CookieRequest>,
) -> Result<Json<CookieResponse>> {
	let identity = services.auth.verify_id_token(&request.token).await?;

	services
		.users
		.upsert(&identity.user_id, &identity.name, &identity.given_name, &identity.email);

	let token = services.auth.mint_session(&identity)?;

	Ok(Json(CookieResponse {
		token,
		color: users::Service::color_for(&identity.user_id),
		user_id: identity.user_id,
		name: identity.name,
	}))
}

#[derive(Serialize)]
pub(crate) struct CheckValidResponse {
	valid: bool,
	#[serde(rename = "userId")]
	user_id: String,
}

/// `GET /check-valid`: cheap session probe for the client's boot path.
pub(crate) async fn check_valid(
	State(services): State<Arc<Services>>,
	headers: HeaderMap,
) -> Result<Json<CheckValidResponse>> {
	let identity = services.auth.verify(bearer(&headers)?).await?;

	Ok(Json(CheckValidResponse { valid: true, user_id: identity.user_id }))
}
