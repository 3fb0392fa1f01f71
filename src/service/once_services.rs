use std::sync::{Arc, OnceLock};

use crate::{
	auth, dom_locks, emitter, media, membership, persistence, replay, rooms, strokes, users,
};

/// Late-bound registry of the services. Populated once during
/// `Services::build`; accessors panic if touched before that, which is a
/// startup-ordering bug, not a runtime condition.
#[derive(Default)]
pub(crate) struct OnceServices {
	pub auth: OnceLock<Arc<auth::Service>>,
	pub dom_locks: OnceLock<Arc<dom_locks::Service>>,
	pub emitter: OnceLock<Arc<emitter::Service>>,
	pub media: OnceLock<Arc<media::Service>>,
	pub membership: OnceLock<Arc<membership::Service>>,
	pub persistence: OnceLock<Arc<persistence::Service>>,
	pub replay: OnceLock<Arc<replay::Service>>,
	pub rooms: OnceLock<Arc<rooms::Service>>,
	pub strokes: OnceLock<Arc<strokes::Service>>,
	pub users: OnceLock<Arc<users::Service>>,
}

impl OnceServices {
	pub fn dom_locks(&self) -> &Arc<dom_locks::Service> {
		self.dom_locks.get().expect("dom_locks service initialized")
	}

	pub fn membership(&self) -> &Arc<membership::Service> {
		self.membership
			.get()
			.expect("membership service initialized")
	}

	pub fn persistence(&self) -> &Arc<persistence::Service> {
		self.persistence
			.get()
			.expect("persistence service initialized")
	}

	pub fn rooms(&self) -> &Arc<rooms::Service> {
		self.rooms.get().expect("rooms service initialized")
	}

	pub fn strokes(&self) -> &Arc<strokes::Service> {
		self.strokes.get().expect("strokes service initialized")
	}

	pub fn users(&self) -> &Arc<users::Service> {
		self.users.get().expect("users service initialized")
	}
}
