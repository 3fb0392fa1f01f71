use std::sync::Arc;

use scrawl_core::warn;

use crate::Server;

#[cfg(unix)]
pub(crate) async fn enable(server: Arc<Server>) {
	use tokio::signal::unix::{SignalKind, signal};

	let Ok(mut terminate) = signal(SignalKind::terminate()) else {
		return;
	};
	let Ok(mut interrupt) = signal(SignalKind::interrupt()) else {
		return;
	};

	let sig = tokio::select! {
		_ = terminate.recv() => "SIGTERM",
		_ = interrupt.recv() => "SIGINT",
	};

	warn!("Received {sig}");
	server.server.shutdown().ok();
}

#[cfg(not(unix))]
pub(crate) async fn enable(server: Arc<Server>) {
	if tokio::signal::ctrl_c().await.is_ok() {
		warn!("Received Ctrl+C");
		server.server.shutdown().ok();
	}
}
