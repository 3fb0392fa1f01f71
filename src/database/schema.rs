use rusqlite::Connection;
use scrawl_core::Result;

use crate::or_else;

/// Idempotent DDL. Every statement is IF NOT EXISTS so bootstrap can run on
/// every open.
const SCHEMA: &[&str] = &[
	"CREATE TABLE IF NOT EXISTS events (
		id INTEGER NOT NULL,
		room_id TEXT NOT NULL,
		user_id TEXT NOT NULL,
		entity_id TEXT NOT NULL,
		op TEXT NOT NULL,
		payload BLOB NOT NULL,
		layer INTEGER NOT NULL DEFAULT 0,
		created_at INTEGER NOT NULL
	)",
	"CREATE INDEX IF NOT EXISTS idx_events_room_clock
		ON events (room_id, id)",
	"CREATE TABLE IF NOT EXISTS dom_objects (
		id TEXT PRIMARY KEY,
		room_id TEXT NOT NULL,
		user_id TEXT NOT NULL,
		kind TEXT NOT NULL,
		x REAL NOT NULL DEFAULT 0,
		y REAL NOT NULL DEFAULT 0,
		rot REAL NOT NULL DEFAULT 0,
		w REAL NOT NULL DEFAULT 0,
		h REAL NOT NULL DEFAULT 0,
		layer INTEGER NOT NULL DEFAULT 0,
		payload TEXT NOT NULL DEFAULT '',
		is_removed INTEGER NOT NULL DEFAULT 0,
		created_at INTEGER NOT NULL,
		updated_at INTEGER NOT NULL
	)",
	"CREATE INDEX IF NOT EXISTS idx_dom_objects_room
		ON dom_objects (room_id)",
	"CREATE INDEX IF NOT EXISTS idx_dom_objects_room_removed
		ON dom_objects (room_id, is_removed)",
	"CREATE TABLE IF NOT EXISTS rooms (
		room_id TEXT PRIMARY KEY,
		owner_id TEXT NOT NULL,
		public INTEGER NOT NULL DEFAULT 0,
		created_at INTEGER NOT NULL
	)",
	"CREATE TABLE IF NOT EXISTS layers (
		room_id TEXT NOT NULL,
		layer_index INTEGER NOT NULL,
		owner_id TEXT NOT NULL,
		name TEXT NOT NULL,
		public INTEGER NOT NULL DEFAULT 0,
		created_at INTEGER NOT NULL,
		PRIMARY KEY (room_id, layer_index)
	)",
	"CREATE TABLE IF NOT EXISTS users_layers (
		room_id TEXT NOT NULL,
		layer_index INTEGER NOT NULL,
		user_id TEXT NOT NULL,
		PRIMARY KEY (room_id, layer_index, user_id),
		FOREIGN KEY (room_id, layer_index)
			REFERENCES layers (room_id, layer_index)
			ON DELETE CASCADE
	)",
	"CREATE TABLE IF NOT EXISTS users_data (
		user_id TEXT PRIMARY KEY,
		role TEXT NOT NULL DEFAULT 'guest',
		name TEXT NOT NULL DEFAULT '',
		given_name TEXT NOT NULL DEFAULT '',
		email TEXT NOT NULL DEFAULT '',
		created_at INTEGER NOT NULL
	)",
	"CREATE INDEX IF NOT EXISTS idx_users_data_email
		ON users_data (email)",
	"CREATE TABLE IF NOT EXISTS users_rooms (
		user_id TEXT NOT NULL,
		room_id TEXT NOT NULL,
		role TEXT NOT NULL DEFAULT 'member',
		joined_at INTEGER NOT NULL,
		PRIMARY KEY (user_id, room_id)
	)",
];

pub(crate) fn bootstrap(conn: &Connection) -> Result {
	for ddl in SCHEMA {
		conn.execute(ddl, []).map_err(or_else)?;
	}

	Ok(())
}
