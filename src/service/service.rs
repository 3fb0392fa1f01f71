use std::sync::Arc;

use async_trait::async_trait;
use scrawl_core::{Result, Server};
use scrawl_database::Database;

use crate::OnceServices;

/// Construction context handed to every service. Sibling services are
/// reached through the late-bound registry so build order does not dictate
/// the dependency graph.
pub(crate) struct Args<'a> {
	pub server: &'a Arc<Server>,
	pub db: &'a Arc<Database>,
	pub services: &'a Arc<OnceServices>,
}

#[async_trait]
pub(crate) trait Service: Send + Sync {
	/// Implement the construction of the service instance.
	fn build(args: &Args<'_>) -> Result<Arc<Self>>
	where
		Self: Sized;

	/// Implement the service's worker loop, if any. Dispatched after all
	/// services are built.
	async fn worker(self: Arc<Self>) -> Result { Ok(()) }

	/// Interrupt the service's worker so it winds down.
	async fn interrupt(&self) {}

	/// Name of the service for diagnostics.
	fn name(&self) -> &str;
}

/// Derive a service name from a module path.
pub(crate) fn make_name(module_path: &str) -> &str {
	module_path
		.rsplit("::")
		.next()
		.expect("module path has at least one segment")
}
