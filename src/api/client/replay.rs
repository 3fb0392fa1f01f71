use std::sync::Arc;

use axum::{
	Json,
	extract::{Query, State},
};
use http::HeaderMap;
use scrawl_core::{Result, board::ServerMsg};
use scrawl_service::Services;
use serde::Deserialize;

use super::bearer;

#[derive(Deserialize)]
pub(crate) struct ReplayQuery {
	#[serde(rename = "roomId")]
	room_id: String,

	#[serde(default)]
	layer: i64,

	#[serde(rename = "fromId", default)]
	from_id: i64,
}

/// `GET /get-replay?roomId=&layer=&fromId=`: the same composition a fresh
/// WebSocket join receives, for clients that refresh out-of-band.
pub(crate) async fn get_replay(
	State(services): State<Arc<Services>>,
	headers: HeaderMap,
	Query(query): Query<ReplayQuery>,
) -> Result<Json<Vec<ServerMsg>>> {
	let identity = services.auth.verify(bearer(&headers)?).await?;
	let msgs = services
		.replay
		.compose(&identity.user_id, &query.room_id, query.layer, query.from_id)
		.await?;

	Ok(Json(msgs))
}
