use std::sync::Arc;

use axum::{Router, middleware};
use http::{
	HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use scrawl_core::{Result, Server, err};
use scrawl_service::Services;
use tower_http::{
	cors::{AllowOrigin, CorsLayer},
	trace::TraceLayer,
};

use crate::request;

pub(super) fn apply(services: &Arc<Services>, router: Router) -> Result<Router> {
	let router = router
		.layer(middleware::from_fn_with_state(services.clone(), request::handle))
		.layer(cors(&services.server)?)
		.layer(TraceLayer::new_for_http());

	Ok(router)
}

/// CORS from the configured origin allowlist. No origins configured means
/// no cross-origin access.
fn cors(server: &Arc<Server>) -> Result<CorsLayer> {
	let origins = &server.config.allowed_origins;
	if origins.is_empty() {
		return Ok(CorsLayer::new());
	}

	let list = origins
		.iter()
		.map(|origin| {
			origin
				.parse::<HeaderValue>()
				.map_err(|e| err!(Config("allowed_origins", "invalid origin {origin:?}: {e}")))
		})
		.collect::<Result<Vec<_>>>()?;

	Ok(CorsLayer::new()
		.allow_origin(AllowOrigin::list(list))
		.allow_methods([Method::GET, Method::POST])
		.allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}
