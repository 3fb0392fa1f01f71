use std::sync::Arc;

use axum::{
	Router,
	routing::{get, post},
};
use scrawl_service::Services;

use crate::{client, ws};

pub fn build(services: &Arc<Services>) -> Router {
	Router::new()
		.route("/ws", get(ws::handler))
		.route("/get-replay", get(client::replay::get_replay))
		.route("/cookie", post(client::session::cookie))
		.route("/check-valid", get(client::session::check_valid))
		.route("/add-user", post(client::users::add_user))
		.route("/get-users", get(client::users::get_users))
		.route("/upload", post(client::media::upload))
		.route("/get", get(client::media::get))
		.with_state(services.clone())
}
