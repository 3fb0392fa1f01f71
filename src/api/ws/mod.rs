mod client;
mod dispatch;
mod handler;

pub(crate) use client::Connection;
pub use handler::handler;
