use std::sync::Arc;

use axum::{
	Json,
	extract::{Query, State},
};
use http::{HeaderMap, StatusCode};
use scrawl_core::{Err, Result, board::Role, err};
use scrawl_service::{Services, users};
use serde::{Deserialize, Serialize};

use super::bearer;

#[derive(Deserialize)]
pub(crate) struct AddUserRequest {
	#[serde(rename = "roomId")]
	room_id: String,

	#[serde(default)]
	email: Option<String>,

	#[serde(rename = "userId", default)]
	user_id: Option<String>,

	#[serde(default)]
	role: Option<String>,
}

/// `POST /add-user`: upsert a membership role. Requires moderator standing
/// in the room or globally; the write goes through the persistence actor.
pub(crate) async fn add_user(
	State(services): State<Arc<Services>>,
	headers: HeaderMap,
	Json(request): Json<AddUserRequest>,
) -> Result<StatusCode> {
	let identity = services.auth.verify(bearer(&headers)?).await?;

	let in_room = services
		.membership
		.membership_role(&request.room_id, &identity.user_id)
		.await?
		.unwrap_or_default();
	let global = services.users.global_role(&identity.user_id).await?;
	if in_room.max(global) < Role::Moderator {
		return Err!(Forbidden("adding users requires moderator standing"));
	}

	let target = match (request.user_id, request.email) {
		| (Some(user_id), _) => user_id,
		| (None, Some(email)) => services
			.users
			.by_email(&email)
			.await?
			.ok_or_else(|| err!(NotFound("no user with that email")))?,
		| (None, None) => return Err!(BadRequest("userId or email is required")),
	};

	let role = request.role.as_deref().map_or(Role::Member, Role::parse);
	services
		.persistence
		.room_edit_user(&request.room_id, &target, role);

	Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
pub(crate) struct RoomQuery {
	#[serde(rename = "roomId")]
	room_id: String,
}

#[derive(Serialize)]
pub(crate) struct RoomUser {
	#[serde(rename = "userId")]
	user_id: String,
	name: String,
	role: Role,
	color: String,
}

/// `GET /get-users?roomId=`: member list with roles, names and colors.
pub(crate) async fn get_users(
	State(services): State<Arc<Services>>,
	headers: HeaderMap,
	Query(query): Query<RoomQuery>,
) -> Result<Json<Vec<RoomUser>>> {
	let identity = services.auth.verify(bearer(&headers)?).await?;

	if services
		.membership
		.membership_role(&query.room_id, &identity.user_id)
		.await?
		.is_none()
	{
		return Err!(Forbidden("not a member of this room"));
	}

	let mut listing = Vec::new();
	for (user_id, role) in services.membership.room_members(&query.room_id).await? {
		let name = services
			.users
			.profile(&user_id)
			.await?
			.map(|profile| profile.name)
			.unwrap_or_default();

		listing.push(RoomUser {
			color: users::Service::color_for(&user_id),
			name,
			role,
			user_id,
		});
	}

	Ok(Json(listing))
}
