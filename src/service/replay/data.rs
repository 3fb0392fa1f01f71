use std::sync::Arc;

use rusqlite::params;
use scrawl_core::{
	Result,
	board::{DomObject, Event, Transform},
};
use scrawl_database::{Database, or_else};

pub(super) struct Data {
	db: Arc<Database>,
}

impl Data {
	pub(super) fn new(db: &Arc<Database>) -> Self { Self { db: db.clone() } }

	/// Persisted stroke events for one room/layer with id > from_id, in
	/// ascending id order.
	pub(super) async fn stroke_events(
		&self,
		room_id: &str,
		layer: i64,
		from_id: i64,
	) -> Result<Vec<Event>> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				let mut stmt = conn
					.prepare_cached(
						"SELECT id, room_id, user_id, entity_id, op, payload, layer, created_at
							FROM events
							WHERE room_id = ?1 AND id > ?2 AND layer = ?3 AND op = 'stroke-add'
							ORDER BY id ASC",
					)
					.map_err(or_else)?;

				let rows = stmt
					.query_map(params![room_id, from_id, layer], |row| {
						Ok(Event {
							id: row.get(0)?,
							room_id: row.get(1)?,
							user_id: row.get(2)?,
							entity_id: row.get(3)?,
							op: row.get(4)?,
							payload: row.get(5)?,
							layer: row.get(6)?,
							created_at: row.get(7)?,
						})
					})
					.map_err(or_else)?;

				let mut events = Vec::new();
				for row in rows {
					events.push(row.map_err(or_else)?);
				}

				Ok(events)
			})
		})
		.await?
	}

	/// Non-tombstoned DOM objects of one room/layer.
	pub(super) async fn active_dom_objects(
		&self,
		room_id: &str,
		layer: i64,
	) -> Result<Vec<DomObject>> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				let mut stmt = conn
					.prepare_cached(
						"SELECT id, user_id, kind, x, y, rot, w, h, layer, payload
							FROM dom_objects
							WHERE room_id = ?1 AND layer = ?2 AND is_removed = 0
							ORDER BY created_at ASC",
					)
					.map_err(or_else)?;

				let rows = stmt
					.query_map(params![room_id, layer], |row| {
						Ok(DomObject {
							id: row.get(0)?,
							user_id: Some(row.get(1)?),
							kind: row.get(2)?,
							transform: Transform {
								x: row.get(3)?,
								y: row.get(4)?,
								rot: row.get(5)?,
								w: row.get(6)?,
								h: row.get(7)?,
							},
							layer_index: row.get(8)?,
							payload: row.get(9)?,
						})
					})
					.map_err(or_else)?;

				let mut doms = Vec::new();
				for row in rows {
					doms.push(row.map_err(or_else)?);
				}

				Ok(doms)
			})
		})
		.await?
	}
}
