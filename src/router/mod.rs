mod layers;
mod request;
mod serve;

use std::sync::Arc;

use scrawl_core::{Result, Server};
use scrawl_database::Database;
use scrawl_service::Services;

/// Open the store and assemble the service layer. A store that cannot be
/// opened aborts startup.
pub async fn start(server: &Arc<Server>) -> Result<Arc<Services>> {
	let db = Database::open(server).await?;
	let services = Services::build(server, &db)?;
	services.start().await?;

	Ok(services)
}

/// Serve until shutdown is signalled.
pub async fn run(services: &Arc<Services>) -> Result { serve::serve(services).await }

/// Tear the service layer down.
pub async fn stop(services: Arc<Services>) -> Result {
	services.stop().await;
	Ok(())
}
