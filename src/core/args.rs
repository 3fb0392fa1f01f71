use std::path::PathBuf;

use clap::Parser;

use crate::{Result, config::Config};

/// Command line arguments
#[derive(Clone, Debug, Default, Parser)]
#[clap(version, about, long_about = None)]
pub struct Args {
	/// Path to the configuration file
	#[arg(short, long, env = "SCRAWL_CONFIG")]
	pub config: Option<PathBuf>,

	/// Override the listen port
	#[arg(long)]
	pub port: Option<u16>,

	/// Override the listen address
	#[arg(long)]
	pub address: Option<String>,

	/// Override the database path
	#[arg(long)]
	pub database_path: Option<PathBuf>,

	/// Override the log filter
	#[arg(long)]
	pub log: Option<String>,
}

#[must_use]
pub fn parse() -> Args { Args::parse() }

/// Apply command-line overrides on top of the loaded configuration.
pub fn update(mut config: Config, args: &Args) -> Result<Config> {
	if let Some(port) = args.port {
		config.port = port;
	}

	if let Some(address) = &args.address {
		config.address = address.clone();
	}

	if let Some(path) = &args.database_path {
		config.database_path = path.clone();
	}

	if let Some(log) = &args.log {
		config.log = log.clone();
	}

	Ok(config)
}
