mod engine;
mod schema;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use scrawl_core::{Result, Server};

pub use self::engine::{Engine, or_else};

pub struct Database {
	pub engine: Arc<Engine>,
}

impl Database {
	/// Load an existing database or create a new one. A store that cannot be
	/// opened is fatal to startup; there is no meaningful service without it.
	pub async fn open(server: &Arc<Server>) -> Result<Arc<Self>> {
		let server = server.clone();
		let engine = tokio::task::spawn_blocking(move || Engine::open(&server)).await??;

		Ok(Arc::new(Self { engine }))
	}
}
