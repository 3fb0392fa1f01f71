use std::sync::Arc;

use rusqlite::{OptionalExtension, params};
use scrawl_core::{Result, board::Role};
use scrawl_database::{Database, or_else};

use super::UserRow;

pub(super) struct Data {
	db: Arc<Database>,
}

impl Data {
	pub(super) fn new(db: &Arc<Database>) -> Self { Self { db: db.clone() } }

	pub(super) async fn profile(&self, user_id: &str) -> Result<Option<UserRow>> {
		let db = self.db.clone();
		let user_id = user_id.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				conn.prepare_cached(
					"SELECT user_id, role, name, given_name, email, created_at
						FROM users_data WHERE user_id = ?1",
				)
				.map_err(or_else)?
				.query_row(params![user_id], |row| {
					Ok(UserRow {
						user_id: row.get(0)?,
						role: Role::parse(&row.get::<_, String>(1)?),
						name: row.get(2)?,
						given_name: row.get(3)?,
						email: row.get(4)?,
						created_at: row.get(5)?,
					})
				})
				.optional()
				.map_err(or_else)
			})
		})
		.await?
	}

	pub(super) async fn by_email(&self, email: &str) -> Result<Option<String>> {
		let db = self.db.clone();
		let email = email.to_owned();

		tokio::task::spawn_blocking(move || {
			db.engine.with_read(|conn| {
				conn.prepare_cached("SELECT user_id FROM users_data WHERE email = ?1")
					.map_err(or_else)?
					.query_row(params![email], |row| row.get::<_, String>(0))
					.optional()
					.map_err(or_else)
			})
		})
		.await?
	}
}
