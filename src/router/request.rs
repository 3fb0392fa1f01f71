use std::sync::{Arc, atomic::Ordering};

use axum::{
	extract::{Request, State},
	middleware::Next,
	response::Response,
};
use http::StatusCode;
use scrawl_core::{debug, debug_error, debug_warn, error, trace};
use scrawl_service::Services;

pub(crate) async fn handle(
	State(services): State<Arc<Services>>,
	req: Request,
	next: Next,
) -> Result<Response, StatusCode> {
	if !services.server.running() {
		debug_warn!(
			method = %req.method(),
			uri = %req.uri(),
			"unavailable pending shutdown"
		);

		return Err(StatusCode::SERVICE_UNAVAILABLE);
	}

	services
		.server
		.metrics
		.requests_count
		.fetch_add(1, Ordering::Relaxed);

	let method = req.method().clone();
	let uri = req.uri().clone();
	let response = next.run(req).await;

	let status = response.status();
	let code = status.as_u16();
	if status.is_server_error() {
		error!(%method, %uri, "{code}");
	} else if status.is_client_error() {
		debug_error!(%method, %uri, "{code}");
	} else if status.is_redirection() {
		debug!(%method, %uri, "{code}");
	} else {
		trace!(%method, %uri, "{code}");
	}

	Ok(response)
}
