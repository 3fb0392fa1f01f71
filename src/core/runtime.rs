use std::{sync::Arc, time::Duration};

use tokio::runtime;

use crate::{Result, Server, debug, debug_info};

const WORKER_NAME: &str = "scrawl:worker";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub use tokio::runtime::Handle;
pub type Runtime = runtime::Runtime;

pub fn new() -> Result<Runtime> {
	let runtime = runtime::Builder::new_multi_thread()
		.thread_name(WORKER_NAME)
		.enable_io()
		.enable_time()
		.build()?;

	Ok(runtime)
}

/// Drop the runtime, waiting on outstanding blocking-pool tasks up to a
/// deadline so store reads in flight can finish.
pub fn shutdown(server: &Arc<Server>, runtime: Runtime) -> Result {
	debug!(
		timeout = ?SHUTDOWN_TIMEOUT,
		"Waiting for runtime..."
	);

	runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);

	debug_info!(
		stopping = server.is_stopping(),
		"Runtime shutdown finished."
	);

	Ok(())
}
