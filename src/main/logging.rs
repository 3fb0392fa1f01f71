use scrawl_core::{Config, Result, err};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

/// Initialize the global tracing subscriber from the configuration. A second
/// initialization (tests running servers back to back) keeps the first
/// subscriber.
pub(crate) fn init(config: &Config) -> Result {
	let filter = EnvFilter::builder()
		.parse(&config.log)
		.map_err(|e| err!(Config("log", "{e}.")))?;

	let console_layer = fmt::Layer::new()
		.with_ansi(config.log_colors)
		.with_thread_ids(config.log_thread_ids)
		.with_target(false);

	let subscriber = Registry::default().with(console_layer.with_filter(filter));

	tracing::subscriber::set_global_default(subscriber).ok();

	Ok(())
}
