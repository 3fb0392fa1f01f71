use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use scrawl_core::{Result, debug_info};

use crate::service;

/// Exclusive-edit locks on DOM objects, in memory only. At most one owner
/// per object; locks are ephemeral and die with the process or the owner's
/// connection.
pub struct Service {
	locks: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl crate::Service for Service {
	fn build(_args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self { locks: Mutex::new(HashMap::new()) }))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Try to take the lock. Granted when nobody holds it, or as a refresh
	/// when the caller already does.
	pub fn acquire(&self, room_id: &str, dom_id: &str, user_id: &str) -> bool {
		let Ok(mut locks) = self.locks.lock() else {
			return false;
		};

		let room = locks.entry(room_id.to_owned()).or_default();
		match room.get(dom_id) {
			| Some(owner) => owner == user_id,
			| None => {
				room.insert(dom_id.to_owned(), user_id.to_owned());
				debug_info!(room_id, dom_id, user_id, "lock acquired");
				true
			},
		}
	}

	/// Release the lock, but only for its owner.
	pub fn release(&self, room_id: &str, dom_id: &str, user_id: &str) -> bool {
		let Ok(mut locks) = self.locks.lock() else {
			return false;
		};

		let Some(room) = locks.get_mut(room_id) else {
			return false;
		};

		let released = match room.get(dom_id) {
			| Some(owner) if owner == user_id => {
				room.remove(dom_id);
				true
			},
			| _ => false,
		};

		if room.is_empty() {
			locks.remove(room_id);
		}

		released
	}

	/// Current owner, if any. Drives transform admission: a foreign lock
	/// binds the object to its holder.
	pub fn current(&self, room_id: &str, dom_id: &str) -> Option<String> {
		self.locks
			.lock()
			.ok()?
			.get(room_id)?
			.get(dom_id)
			.cloned()
	}

	/// Objects this user holds locks on in a room.
	pub fn owned_by(&self, room_id: &str, user_id: &str) -> Vec<String> {
		self.locks
			.lock()
			.map(|locks| {
				locks
					.get(room_id)
					.map(|room| {
						room.iter()
							.filter(|(_, owner)| *owner == user_id)
							.map(|(dom_id, _)| dom_id.clone())
							.collect()
					})
					.unwrap_or_default()
			})
			.unwrap_or_default()
	}

	/// Drop every lock this user holds in a room; the disconnect sweep.
	/// Returns the freed object ids so the caller can broadcast the
	/// unlocks.
	pub fn sweep(&self, room_id: &str, user_id: &str) -> Vec<String> {
		let Ok(mut locks) = self.locks.lock() else {
			return Vec::new();
		};

		let Some(room) = locks.get_mut(room_id) else {
			return Vec::new();
		};

		let freed: Vec<String> = room
			.iter()
			.filter(|(_, owner)| *owner == user_id)
			.map(|(dom_id, _)| dom_id.clone())
			.collect();

		for dom_id in &freed {
			room.remove(dom_id);
		}

		if room.is_empty() {
			locks.remove(room_id);
		}

		freed
	}

	/// Snapshot a room's locks for replay.
	pub fn snapshot(&self, room_id: &str) -> Vec<(String, String)> {
		self.locks
			.lock()
			.map(|locks| {
				locks
					.get(room_id)
					.map(|room| {
						room.iter()
							.map(|(dom_id, owner)| (dom_id.clone(), owner.clone()))
							.collect()
					})
					.unwrap_or_default()
			})
			.unwrap_or_default()
	}
}
