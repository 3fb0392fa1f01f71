#![cfg(test)]

use std::sync::Arc;

use rusqlite::params;
use scrawl_core::{Config, Server, utils::now_millis};

use crate::{Database, or_else};

fn test_server(name: &str) -> Arc<Server> {
	let mut path = std::env::temp_dir();
	path.push(format!("scrawl-db-test-{name}-{}.db", std::process::id()));
	let _ = std::fs::remove_file(&path);

	let config = Config { database_path: path, ..Config::default() };

	Arc::new(Server::new(config, None))
}

#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_is_idempotent() {
	let server = test_server("bootstrap");
	let db = Database::open(&server).await.unwrap();
	drop(db);

	// second open over the same file must not fail
	Database::open(&server).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn writes_are_visible_to_readers() {
	let server = test_server("rw");
	let db = Database::open(&server).await.unwrap();

	db.engine
		.with_write(|conn| {
			conn.execute(
				"INSERT INTO events
					(id, room_id, user_id, entity_id, op, payload, layer, created_at)
					VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
				params![1_i64, "r", "u", "s", "stroke-add", b"{}".as_slice(), 0_i64, now_millis()],
			)
			.map_err(or_else)?;
			Ok(())
		})
		.unwrap();

	let count: i64 = db
		.engine
		.with_read(|conn| {
			conn.query_row("SELECT COUNT(*) FROM events WHERE room_id = 'r'", [], |row| {
				row.get(0)
			})
			.map_err(or_else)
		})
		.unwrap();

	assert_eq!(count, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn layer_acl_cascades_on_layer_delete() {
	let server = test_server("cascade");
	let db = Database::open(&server).await.unwrap();

	db.engine
		.with_write(|conn| {
			conn.execute(
				"INSERT INTO layers (room_id, layer_index, owner_id, name, public, created_at)
					VALUES ('r', 1, 'u', 'private', 0, ?1)",
				params![now_millis()],
			)
			.map_err(or_else)?;
			conn.execute(
				"INSERT INTO users_layers (room_id, layer_index, user_id)
					VALUES ('r', 1, 'u')",
				[],
			)
			.map_err(or_else)?;
			conn.execute("DELETE FROM layers WHERE room_id = 'r' AND layer_index = 1", [])
				.map_err(or_else)?;
			Ok(())
		})
		.unwrap();

	let acl_rows: i64 = db
		.engine
		.with_read(|conn| {
			conn.query_row("SELECT COUNT(*) FROM users_layers", [], |row| row.get(0))
				.map_err(or_else)
		})
		.unwrap();

	assert_eq!(acl_rows, 0);
}
