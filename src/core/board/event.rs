use serde::{Deserialize, Serialize};

/// Ordering metadata attached to an incoming message while it is routed. The
/// id is 0 until the room clock assigns one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventMeta {
	pub id: i64,
	pub room_id: String,
	pub user_id: String,
	pub layer: i64,
}

/// One row of the append-only per-room event log. `id` is the room clock
/// value at assignment; `(room_id, id)` is the primary order key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Event {
	pub id: i64,
	pub room_id: String,
	pub user_id: String,
	pub entity_id: String,
	pub op: String,
	pub payload: Vec<u8>,
	pub layer: i64,
	pub created_at: i64,
}
