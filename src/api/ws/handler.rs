use std::sync::Arc;

use axum::{
	extract::{Query, State, ws::WebSocketUpgrade},
	response::Response,
};
use scrawl_core::Result;
use scrawl_service::Services;
use serde::Deserialize;

use super::client;

#[derive(Deserialize)]
pub(crate) struct WsQuery {
	#[serde(rename = "roomId")]
	room_id: String,
	token: String,
}

/// `GET /ws?roomId=<id>&token=<idtoken>`. The token is verified and room
/// access authorized before the upgrade; a rejected handshake leaves no
/// partial state behind.
pub async fn handler(
	State(services): State<Arc<Services>>,
	Query(query): Query<WsQuery>,
	ws: WebSocketUpgrade,
) -> Result<Response> {
	let identity = services.auth.verify(&query.token).await?;
	let role = services
		.membership
		.ensure_user_in_room(&query.room_id, &identity.user_id)
		.await?;

	services
		.users
		.upsert(&identity.user_id, &identity.name, &identity.given_name, &identity.email);

	Ok(ws.on_upgrade(move |socket| client::run(services, socket, query.room_id, identity, role)))
}
