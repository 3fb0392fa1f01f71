mod once_services;
mod service;
pub mod services;
#[cfg(test)]
mod tests;

pub mod auth;
pub mod dom_locks;
pub mod emitter;
pub mod media;
pub mod membership;
pub mod persistence;
pub mod replay;
pub mod rooms;
pub mod strokes;
pub mod users;

pub(crate) use once_services::OnceServices;
pub(crate) use service::{Args, Service};

pub use crate::services::Services;
