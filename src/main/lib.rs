pub mod logging;
pub mod server;
pub mod signals;

use std::sync::Arc;

use scrawl_core::{Result, debug_info, error, runtime, runtime::Runtime};
use scrawl_service::Services;

pub use self::server::Server;

pub fn exec(server: &Arc<Server>, runtime: Runtime) -> Result {
	run(server, &runtime)?;
	runtime::shutdown(&server.server, runtime)
}

pub fn run(server: &Arc<Server>, runtime: &Runtime) -> Result {
	runtime.block_on(async_exec(server))
}

/// Start, run and stop the server within the asynchronous runtime.
#[tracing::instrument(
	name = "main",
	parent = None,
	skip_all
)]
pub async fn async_exec(server: &Arc<Server>) -> Result {
	server
		.server
		.runtime()
		.spawn(signals::enable(server.clone()));

	async_start(server).await?;
	async_run(server).await?;
	async_stop(server).await?;

	debug_info!("Exit runtime");
	Ok(())
}

#[tracing::instrument(name = "start", skip_all)]
pub async fn async_start(server: &Arc<Server>) -> Result<Arc<Services>> {
	match scrawl_router::start(&server.server).await {
		| Ok(services) => Ok(server
			.services
			.lock()
			.await
			.insert(services)
			.clone()),

		| Err(error) => {
			error!("Critical error starting server: {error}");
			Err(error)
		},
	}
}

pub async fn async_run(server: &Arc<Server>) -> Result {
	if let Err(error) = scrawl_router::run(
		server
			.services
			.lock()
			.await
			.as_ref()
			.expect("services initialized"),
	)
	.await
	{
		error!("Critical error running server: {error}");
		return Err(error);
	}

	Ok(())
}

#[tracing::instrument(name = "stop", skip_all)]
pub async fn async_stop(server: &Arc<Server>) -> Result {
	if let Err(error) = scrawl_router::stop(
		server
			.services
			.lock()
			.await
			.take()
			.expect("services initialized"),
	)
	.await
	{
		error!("Critical error stopping server: {error}");
		return Err(error);
	}

	Ok(())
}
