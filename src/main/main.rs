use scrawl::Server;
use scrawl_core::{Result, args, debug_info, runtime};

fn main() -> Result {
	let args = args::parse();
	let runtime = runtime::new()?;
	let server = Server::new(&args, Some(runtime.handle()))?;

	scrawl::exec(&server, runtime)?;

	debug_info!("Exit");
	Ok(())
}
