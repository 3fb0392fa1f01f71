use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use tokio::{runtime, sync::broadcast};

use crate::{Err, Metrics, Result, config::Config};

/// Process-wide state shared by every connection and service: the merged
/// configuration, the shutdown signal, and the counters behind the bounded
/// queues' drop/evict policies.
pub struct Server {
	/// Merged configuration; fixed after startup.
	pub config: Config,

	/// Set once shutdown begins. Workers and the request path check this
	/// to stop taking on new work.
	pub stopping: AtomicBool,

	/// Fires when shutdown begins. Worker loops (stroke GC, the serve
	/// watcher) select on a subscription of this.
	pub signal: broadcast::Sender<&'static str>,

	/// Handle of the runtime everything is spawned onto.
	pub runtime: Option<runtime::Handle>,

	/// Counters for dropped persistence jobs, evicted slow consumers and
	/// expired strokes.
	pub metrics: Metrics,
}

impl Server {
	#[must_use]
	pub fn new(config: Config, runtime: Option<runtime::Handle>) -> Self {
		Self {
			config,
			stopping: AtomicBool::new(false),
			signal: broadcast::channel(1).0,
			runtime,
			metrics: Metrics::new(),
		}
	}

	/// Begin shutdown. The first caller wins; everything listening on the
	/// signal winds down from here.
	pub fn shutdown(&self) -> Result {
		if self.stopping.swap(true, Ordering::AcqRel) {
			return Err!("already shutting down");
		}

		self.signal.send("shutdown").ok();
		Ok(())
	}

	/// Resolves once shutdown has been requested.
	pub async fn until_shutdown(self: &Arc<Self>) {
		let mut signal = self.signal.subscribe();
		while self.running() {
			signal.recv().await.ok();
		}
	}

	#[inline]
	pub fn runtime(&self) -> &runtime::Handle {
		self.runtime
			.as_ref()
			.expect("server was built with a runtime handle")
	}

	#[inline]
	#[must_use]
	pub fn running(&self) -> bool { !self.is_stopping() }

	#[inline]
	#[must_use]
	pub fn is_stopping(&self) -> bool { self.stopping.load(Ordering::Relaxed) }
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::Server;
	use crate::Config;

	#[tokio::test]
	async fn shutdown_fires_once_and_unblocks_waiters() {
		let server = Arc::new(Server::new(Config::default(), None));
		assert!(server.running());

		let waiter = {
			let server = server.clone();
			tokio::spawn(async move { server.until_shutdown().await })
		};

		assert!(server.shutdown().is_ok());
		assert!(server.shutdown().is_err(), "second shutdown is rejected");
		assert!(server.is_stopping());

		waiter.await.unwrap();
	}

	#[tokio::test]
	async fn until_shutdown_returns_immediately_when_already_stopping() {
		let server = Arc::new(Server::new(Config::default(), None));
		server.shutdown().ok();
		server.until_shutdown().await;
	}
}
