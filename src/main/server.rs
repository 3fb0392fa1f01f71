use std::sync::Arc;

use scrawl_core::{
	Config, Error, Result,
	args::{self, Args},
	info, runtime,
};
use tokio::sync::Mutex;

/// Server runtime state; complete
pub struct Server {
	/// Server runtime state; public portion
	pub server: Arc<scrawl_core::Server>,

	pub services: Mutex<Option<Arc<scrawl_service::Services>>>,
}

impl Server {
	pub fn new(args: &Args, runtime: Option<&runtime::Handle>) -> Result<Arc<Self>, Error> {
		let mut config = Config::load(args.config.as_deref())
			.and_then(|config| args::update(config, args))?;

		crate::logging::init(&config)?;

		config.check()?;

		info!(
			listen = %format!("{}:{}", config.address, config.port),
			database_path = ?config.database_path,
			log_levels = %config.log,
			"scrawl {}",
			env!("CARGO_PKG_VERSION"),
		);

		Ok(Arc::new(Self {
			server: Arc::new(scrawl_core::Server::new(config, runtime.cloned())),
			services: None.into(),
		}))
	}
}
