mod data;

use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicI64, Ordering},
	},
};

use bytes::Bytes;
use scrawl_core::{Result, Server, debug, debug_info, debug_warn};

use self::data::Data;
use crate::service;

/// The hub: tracks rooms, their members and the per-room logical clock, and
/// fans frames out to members. Rooms are created lazily on first join and
/// destroyed when the last member leaves; clock state is recoverable from
/// the store.
pub struct Service {
	server: Arc<Server>,
	db: Data,
	rooms: Mutex<HashMap<String, Room>>,
}

struct Room {
	members: HashMap<u64, Member>,
	clock: Arc<AtomicI64>,
}

/// A room member's fan-out endpoint: the sending half of the connection's
/// bounded send queue.
#[derive(Clone)]
pub struct Member {
	pub conn_id: u64,
	pub user_id: String,
	sender: loole::Sender<Bytes>,
}

impl Member {
	#[must_use]
	pub fn new(conn_id: u64, user_id: String, sender: loole::Sender<Bytes>) -> Self {
		Self { conn_id, user_id, sender }
	}
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			server: args.server.clone(),
			db: Data::new(args.db),
			rooms: Mutex::new(HashMap::new()),
		}))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Add a member, lazily creating the room. A fresh room's clock seeds
	/// from the highest persisted event id so ids keep strictly increasing
	/// across restarts.
	pub async fn join(&self, room_id: &str, member: Member) -> Result {
		let seed = if self.exists(room_id)? {
			0
		} else {
			self.db.max_event_id(room_id).await?
		};

		let mut rooms = self.rooms.lock()?;
		let room = rooms.entry(room_id.to_owned()).or_insert_with(|| {
			debug_info!(room_id, seed, "creating room");
			Room {
				members: HashMap::new(),
				clock: Arc::new(AtomicI64::new(seed)),
			}
		});

		room.members.insert(member.conn_id, member);
		Ok(())
	}

	/// Remove a member; the last one out destroys the room entry.
	pub fn leave(&self, room_id: &str, conn_id: u64) {
		let Ok(mut rooms) = self.rooms.lock() else {
			return;
		};

		let Some(room) = rooms.get_mut(room_id) else {
			return;
		};

		room.members.remove(&conn_id);
		if room.members.is_empty() {
			debug_info!(room_id, "destroying empty room");
			rooms.remove(room_id);
		}
	}

	/// Fan a frame out to every member (minus `except`), non-blocking. A
	/// member whose send queue is full is evicted from the room: the member
	/// is dropped, never the frame for everyone else.
	pub fn broadcast(&self, room_id: &str, frame: Bytes, except: Option<u64>) {
		let Ok(mut rooms) = self.rooms.lock() else {
			return;
		};

		let Some(room) = rooms.get_mut(room_id) else {
			return;
		};

		let mut evicted = Vec::new();
		for (conn_id, member) in &room.members {
			if Some(*conn_id) == except {
				continue;
			}

			if member.sender.try_send(frame.clone()).is_err() {
				evicted.push(*conn_id);
			}
		}

		for conn_id in evicted {
			if let Some(member) = room.members.remove(&conn_id) {
				self.server
					.metrics
					.sends_evicted
					.fetch_add(1, Ordering::Relaxed);
				debug_warn!(
					room_id,
					user_id = %member.user_id,
					"evicting slow consumer from room"
				);
				member.sender.close();
			}
		}

		if room.members.is_empty() {
			rooms.remove(room_id);
		}
	}

	/// Snapshot the member list.
	pub fn clients(&self, room_id: &str) -> Vec<Member> {
		self.rooms
			.lock()
			.map(|rooms| {
				rooms
					.get(room_id)
					.map(|room| room.members.values().cloned().collect())
					.unwrap_or_default()
			})
			.unwrap_or_default()
	}

	/// Advance the room clock. The returned id is the total order position
	/// of a persistable event within its room.
	pub fn next_clock(&self, room_id: &str) -> Option<i64> {
		let clock = {
			let rooms = self.rooms.lock().ok()?;
			rooms.get(room_id)?.clock.clone()
		};

		let id = clock.fetch_add(1, Ordering::AcqRel) + 1;
		debug!(room_id, id, "assigned clock");
		Some(id)
	}

	fn exists(&self, room_id: &str) -> Result<bool> {
		Ok(self.rooms.lock()?.contains_key(room_id))
	}

	/// Highest persisted event id for a room; used to seed fresh clocks.
	pub async fn max_event_id(&self, room_id: &str) -> Result<i64> {
		self.db.max_event_id(room_id).await
	}
}
