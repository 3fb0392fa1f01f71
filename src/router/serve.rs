use std::{sync::Arc, time::Duration};

use axum_server::{Handle as ServerHandle, bind};
use scrawl_core::{Result, debug_info, info};
use scrawl_service::Services;

use crate::layers;

const GRACE: Duration = Duration::from_secs(30);

pub(super) async fn serve(services: &Arc<Services>) -> Result {
	let server = &services.server;
	let addr = server.config.listen_addr()?;
	let router = layers::apply(services, scrawl_api::build(services))?;

	let handle = ServerHandle::new();
	let watcher = {
		let server = server.clone();
		let handle = handle.clone();
		async move {
			server.until_shutdown().await;
			handle.graceful_shutdown(Some(GRACE));
		}
	};
	server.runtime().spawn(watcher);

	info!("Listening on {addr}");
	bind(addr)
		.handle(handle)
		.serve(router.into_make_service())
		.await?;

	debug_info!("Stopped listening on {addr}");
	Ok(())
}
