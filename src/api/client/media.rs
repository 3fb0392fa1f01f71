use std::sync::Arc;

use axum::{
	Json,
	extract::{Query, State},
};
use http::HeaderMap;
use scrawl_core::{Err, Result, debug};
use scrawl_service::Services;
use serde::{Deserialize, Serialize};

use super::bearer;

#[derive(Deserialize)]
pub(crate) struct SignRequest {
	size: i64,

	#[serde(rename = "roomId")]
	room_id: String,

	#[serde(rename = "mimeType", default)]
	mime_type: String,

	name: String,
}

#[derive(Serialize)]
pub(crate) struct SignResponse {
	upload_url: String,
	key: String,
}

/// `POST /upload`: pre-sign a blob PUT. Objects are namespaced under their
/// room; room access is authorized before signing.
pub(crate) async fn upload(
	State(services): State<Arc<Services>>,
	headers: HeaderMap,
	Json(request): Json<SignRequest>,
) -> Result<Json<SignResponse>> {
	let identity = services.auth.verify(bearer(&headers)?).await?;
	services
		.membership
		.ensure_user_in_room(&request.room_id, &identity.user_id)
		.await?;

	let max = services.server.config.upload_max_bytes;
	if request.size < 0 || request.size as u64 > max {
		return Err!(Forbidden("file exceeds the maximum size"));
	}

	debug!(
		room_id = %request.room_id,
		mime_type = %request.mime_type,
		size = request.size,
		"pre-signing upload"
	);

	let key = format!("rooms/{}/{}", request.room_id, request.name);
	let upload_url = services.media.presign_put(&key)?;

	Ok(Json(SignResponse { upload_url, key }))
}

#[derive(Deserialize)]
pub(crate) struct GetQuery {
	key: String,
}

#[derive(Serialize)]
pub(crate) struct GetResponse {
	download_url: String,
}

/// `GET /get?key=`: pre-sign a blob GET.
pub(crate) async fn get(
	State(services): State<Arc<Services>>,
	headers: HeaderMap,
	Query(query): Query<GetQuery>,
) -> Result<Json<GetResponse>> {
	services.auth.verify(bearer(&headers)?).await?;

	if query.key.is_empty() {
		return Err!(BadRequest("key is required"));
	}

	let download_url = services.media.presign_get(&query.key)?;
	Ok(Json(GetResponse { download_url }))
}
