use std::sync::Arc;

use rusqlite::{OptionalExtension, params};
use scrawl_core::{Result, board::Role};
use scrawl_database::{Database, or_else};

pub(super) struct Data {
	db: Arc<Database>,
}

impl Data {
	pub(super) fn new(db: &Arc<Database>) -> Self { Self { db: db.clone() } }

	pub(super) async fn membership_role(
		&self,
		room_id: &str,
		user_id: &str,
	) -> Result<Option<Role>> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();
		let user_id = user_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				conn.prepare_cached(
					"SELECT role FROM users_rooms WHERE user_id = ?1 AND room_id = ?2",
				)
				.map_err(or_else)?
				.query_row(params![user_id, room_id], |row| row.get::<_, String>(0))
				.optional()
				.map_err(or_else)
			})
		})
		.await?
		.map(|role| role.map(|r| Role::parse(&r)))
	}

	pub(super) async fn room_exists(&self, room_id: &str) -> Result<bool> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				conn.prepare_cached("SELECT 1 FROM rooms WHERE room_id = ?1")
					.map_err(or_else)?
					.query_row(params![room_id], |_| Ok(()))
					.optional()
					.map_err(or_else)
					.map(|row| row.is_some())
			})
		})
		.await?
	}

	pub(super) async fn room_public(&self, room_id: &str) -> Result<bool> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				conn.prepare_cached("SELECT public FROM rooms WHERE room_id = ?1")
					.map_err(or_else)?
					.query_row(params![room_id], |row| row.get::<_, bool>(0))
					.optional()
					.map_err(or_else)
					.map(|public| public.unwrap_or(false))
			})
		})
		.await?
	}

	pub(super) async fn layer_record(
		&self,
		room_id: &str,
		index: i64,
	) -> Result<Option<(String, bool)>> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				conn.prepare_cached(
					"SELECT owner_id, public FROM layers
						WHERE room_id = ?1 AND layer_index = ?2",
				)
				.map_err(or_else)?
				.query_row(params![room_id, index], |row| {
					Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
				})
				.optional()
				.map_err(or_else)
			})
		})
		.await?
	}

	pub(super) async fn layer_acl_exists(
		&self,
		room_id: &str,
		index: i64,
		user_id: &str,
	) -> Result<bool> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();
		let user_id = user_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				conn.prepare_cached(
					"SELECT 1 FROM users_layers
						WHERE room_id = ?1 AND layer_index = ?2 AND user_id = ?3",
				)
				.map_err(or_else)?
				.query_row(params![room_id, index, user_id], |_| Ok(()))
				.optional()
				.map_err(or_else)
				.map(|row| row.is_some())
			})
		})
		.await?
	}

	/// Lowest private layer owned by the user in this room, for a stable
	/// pick when several exist.
	pub(super) async fn private_layer_for(
		&self,
		room_id: &str,
		user_id: &str,
	) -> Result<Option<i64>> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();
		let user_id = user_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				conn.prepare_cached(
					"SELECT MIN(layer_index) FROM layers
						WHERE room_id = ?1 AND owner_id = ?2 AND public = 0",
				)
				.map_err(or_else)?
				.query_row(params![room_id, user_id], |row| row.get::<_, Option<i64>>(0))
				.map_err(or_else)
			})
		})
		.await?
	}

	pub(super) async fn room_members(&self, room_id: &str) -> Result<Vec<(String, Role)>> {
		let db = self.db.clone();
		let room_id = room_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				let mut stmt = conn
					.prepare_cached(
						"SELECT user_id, role FROM users_rooms
							WHERE room_id = ?1 ORDER BY joined_at ASC",
					)
					.map_err(or_else)?;

				let rows = stmt
					.query_map(params![room_id], |row| {
						Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
					})
					.map_err(or_else)?;

				let mut members = Vec::new();
				for row in rows {
					let (user_id, role) = row.map_err(or_else)?;
					members.push((user_id, Role::parse(&role)));
				}

				Ok(members)
			})
		})
		.await?
	}
}
