pub mod args;
pub mod board;
pub mod config;
pub mod error;
pub mod log;
pub mod metrics;
pub mod runtime;
pub mod server;
pub mod utils;

pub use ::http;
pub use ::tracing;
pub use config::Config;
pub use error::Error;
pub use crate::log::{debug, error, info, trace, warn};
pub use metrics::Metrics;
pub use server::Server;
pub use utils::result::Result;

pub use crate as scrawl_core;
