use std::sync::Arc;

use rusqlite::params;
use scrawl_core::Result;
use scrawl_database::{Database, or_else};

pub(super) struct Data {
	db: Arc<Database>,
}

impl Data {
	pub(super) fn new(db: &Arc<Database>) -> Self { Self { db: db.clone() } }

	pub(super) async fn max_event_id(&self, room_id: &str) -> Result<i64> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				conn.prepare_cached(
					"SELECT COALESCE(MAX(id), 0) FROM events WHERE room_id = ?1",
				)
				.map_err(or_else)?
				.query_row(params![room_id], |row| row.get(0))
				.map_err(or_else)
			})
		})
		.await?
	}
}
