#![cfg(test)]

use std::{sync::Arc, time::Duration};

use rusqlite::params;
use scrawl_core::{
	Config, Server,
	board::{DomObject, Event, EventMeta, Op, Point, Role, StrokeObject, Transform},
	utils::now_millis,
};
use scrawl_database::{Database, or_else};

use crate::Services;

async fn services() -> Arc<Services> {
	let mut path = std::env::temp_dir();
	path.push(format!(
		"scrawl-service-test-{}.db",
		scrawl_core::utils::rand::string(8)
	));

	let mut config = Config { database_path: path, ..Config::default() };
	config.check().unwrap();

	let server = Arc::new(Server::new(config, Some(tokio::runtime::Handle::current())));
	let db = Database::open(&server).await.unwrap();
	let services = Services::build(&server, &db).unwrap();
	services.start().await.unwrap();

	services
}

/// Wait for the persistence actor to drain the expectation into the store.
async fn eventually(mut probe: impl FnMut() -> bool) {
	for _ in 0..300 {
		if probe() {
			return;
		}

		tokio::time::sleep(Duration::from_millis(10)).await;
	}

	panic!("condition was not reached in time");
}

fn event_count(db: &Arc<Database>, room: &str, op: &str) -> i64 {
	db.engine
		.with_read(|conn| {
			conn.query_row(
				"SELECT COUNT(*) FROM events WHERE room_id = ?1 AND op = ?2",
				params![room, op],
				|row| row.get(0),
			)
			.map_err(or_else)
		})
		.unwrap()
}

fn grant_global_role(db: &Arc<Database>, user: &str, role: Role) {
	db.engine
		.with_write(|conn| {
			conn.execute(
				"INSERT INTO users_data (user_id, role, created_at) VALUES (?1, ?2, ?3)
					ON CONFLICT (user_id) DO UPDATE SET role = excluded.role",
				params![user, role.as_str(), now_millis()],
			)
			.map_err(or_else)?;
			Ok(())
		})
		.unwrap();
}

fn stroke(id: &str, points: &[(f64, f64)]) -> StrokeObject {
	StrokeObject {
		id: id.into(),
		color: "#000".into(),
		opacity: 1.0,
		size: 3,
		points: points
			.iter()
			.map(|(x, y)| Point { x: *x, y: *y, pressure: 0.5 })
			.collect(),
		..Default::default()
	}
}

#[tokio::test(flavor = "multi_thread")]
async fn stroke_lifecycle_persists_one_event_with_concatenated_points() {
	let services = services().await;
	let (tx, _rx) = loole::bounded(64);
	services
		.rooms
		.join("r", crate::rooms::Member::new(1, "u".into(), tx))
		.await
		.unwrap();

	let clock = services.rooms.next_clock("r").unwrap();
	let meta = EventMeta { id: clock, room_id: "r".into(), user_id: "u".into(), layer: 0 };
	services.strokes.start("s", stroke("s", &[(0.0, 0.0)]), meta);

	services
		.strokes
		.append("s", &[Point { x: 1.0, y: 1.0, pressure: 0.5 }]);
	services
		.strokes
		.append("s", &[Point { x: 2.0, y: 2.0, pressure: 0.5 }]);

	let (finished, meta) = services.strokes.end("s").unwrap();
	assert_eq!(finished.points.len(), 3);

	services.persistence.write_event(Event {
		id: meta.id,
		room_id: meta.room_id.clone(),
		user_id: meta.user_id.clone(),
		entity_id: finished.id.clone(),
		op: Op::StrokeAdd.as_str().to_owned(),
		payload: serde_json::to_vec(&finished).unwrap(),
		layer: meta.layer,
		created_at: now_millis(),
	});

	let db = services.db.clone();
	eventually(move || event_count(&db, "r", "stroke-add") == 1).await;

	// decoded payload id matches the entity and the points concatenated
	let (entity_id, payload): (String, Vec<u8>) = services
		.db
		.engine
		.with_read(|conn| {
			conn.query_row(
				"SELECT entity_id, payload FROM events WHERE room_id = 'r'",
				[],
				|row| Ok((row.get(0)?, row.get(1)?)),
			)
			.map_err(or_else)
		})
		.unwrap();

	let decoded: StrokeObject = serde_json::from_slice(&payload).unwrap();
	assert_eq!(decoded.id, entity_id);
	assert_eq!(
		decoded.points,
		vec![
			Point { x: 0.0, y: 0.0, pressure: 0.5 },
			Point { x: 1.0, y: 1.0, pressure: 0.5 },
			Point { x: 2.0, y: 2.0, pressure: 0.5 },
		]
	);
}

#[tokio::test(flavor = "multi_thread")]
async fn clock_reseeds_from_max_event_id() {
	let services = services().await;
	services.db.engine
		.with_write(|conn| {
			conn.execute(
				"INSERT INTO events
					(id, room_id, user_id, entity_id, op, payload, layer, created_at)
					VALUES (41, 'r2', 'u', 's', 'stroke-add', x'7b7d', 0, 0)",
				[],
			)
			.map_err(or_else)?;
			Ok(())
		})
		.unwrap();

	let (tx, _rx) = loole::bounded(8);
	services
		.rooms
		.join("r2", crate::rooms::Member::new(9, "u".into(), tx))
		.await
		.unwrap();

	assert_eq!(services.rooms.next_clock("r2"), Some(42));
}

#[tokio::test(flavor = "multi_thread")]
async fn dom_lifecycle_tombstones_with_final_transform() {
	let services = services().await;

	let dom = DomObject {
		id: "d".into(),
		kind: "img".into(),
		transform: Transform { x: 0.0, y: 0.0, rot: 0.0, w: 5.0, h: 5.0 },
		..Default::default()
	};
	services.persistence.dom_create("r", "u", dom);

	let moved = Transform { x: 1.0, y: 2.0, rot: 0.0, w: 10.0, h: 10.0 };
	services.persistence.dom_transform("r", "d", moved);
	services.persistence.dom_remove("r", "d");

	// transform after the tombstone must not resurrect or mutate the row
	services
		.persistence
		.dom_transform("r", "d", Transform { x: 9.0, y: 9.0, rot: 9.0, w: 9.0, h: 9.0 });

	let db = services.db.clone();
	eventually(move || {
		db.engine
			.with_read(|conn| {
				conn.query_row(
					"SELECT is_removed, x, y, w FROM dom_objects WHERE id = 'd'",
					[],
					|row| {
						Ok((
							row.get::<_, bool>(0)?,
							row.get::<_, f64>(1)?,
							row.get::<_, f64>(2)?,
							row.get::<_, f64>(3)?,
						))
					},
				)
				.map_err(or_else)
			})
			.map(|(removed, x, y, w)| removed && x == 1.0 && y == 2.0 && w == 10.0)
			.unwrap_or(false)
	})
	.await;
}

#[tokio::test(flavor = "multi_thread")]
async fn layer_create_assigns_next_index_and_grants_acl() {
	let services = services().await;
	grant_global_role(&services.db, "mod", Role::Moderator);

	// first touch creates the room with its base layer 0
	let role = services
		.membership
		.ensure_user_in_room("r", "mod")
		.await
		.unwrap();
	assert_eq!(role, Role::Owner);

	let db = services.db.clone();
	eventually(move || {
		db.engine
			.with_read(|conn| {
				conn.query_row("SELECT COUNT(*) FROM layers WHERE room_id = 'r'", [], |row| {
					row.get::<_, i64>(0)
				})
				.map_err(or_else)
			})
			.map(|count| count == 1)
			.unwrap_or(false)
	})
	.await;

	let index = services
		.persistence
		.layer_create("r", "mod", "private", false)
		.await
		.unwrap();
	assert_eq!(index, 1);

	let granted: i64 = services
		.db
		.engine
		.with_read(|conn| {
			conn.query_row(
				"SELECT COUNT(*) FROM users_layers
					WHERE room_id = 'r' AND layer_index = 1 AND user_id = 'mod'",
				[],
				|row| row.get(0),
			)
			.map_err(or_else)
		})
		.unwrap();
	assert_eq!(granted, 1);

	// and the private layer is discoverable for reuse
	let found = services
		.membership
		.private_layer_for("r", "mod")
		.await
		.unwrap();
	assert_eq!(found, Some(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn guests_are_forbidden_from_private_rooms() {
	let services = services().await;
	grant_global_role(&services.db, "mod", Role::Moderator);

	services
		.membership
		.ensure_user_in_room("private-room", "mod")
		.await
		.unwrap();

	let db = services.db.clone();
	eventually(move || {
		db.engine
			.with_read(|conn| {
				conn.query_row(
					"SELECT COUNT(*) FROM rooms WHERE room_id = 'private-room'",
					[],
					|row| row.get::<_, i64>(0),
				)
				.map_err(or_else)
			})
			.map(|count| count == 1)
			.unwrap_or(false)
	})
	.await;

	let denied = services
		.membership
		.ensure_user_in_room("private-room", "guest")
		.await;
	assert!(denied.is_err());
	assert_eq!(
		denied.unwrap_err().status_code(),
		scrawl_core::http::StatusCode::FORBIDDEN
	);
}

#[tokio::test(flavor = "multi_thread")]
async fn replay_is_monotone_and_orders_persisted_strokes() {
	let services = services().await;
	grant_global_role(&services.db, "mod", Role::Moderator);
	services
		.membership
		.ensure_user_in_room("r", "mod")
		.await
		.unwrap();

	for (id, clock) in [("s1", 1_i64), ("s2", 2_i64)] {
		services.persistence.write_event(Event {
			id: clock,
			room_id: "r".into(),
			user_id: "mod".into(),
			entity_id: id.into(),
			op: Op::StrokeAdd.as_str().to_owned(),
			payload: serde_json::to_vec(&stroke(id, &[(0.0, 0.0)])).unwrap(),
			layer: 0,
			created_at: now_millis(),
		});
	}

	let db = services.db.clone();
	eventually(move || event_count(&db, "r", "stroke-add") == 2).await;

	// a buffered stroke and a lock participate with clock 0
	let meta = EventMeta { id: 3, room_id: "r".into(), user_id: "mod".into(), layer: 0 };
	services.strokes.start("live", stroke("live", &[(5.0, 5.0)]), meta);
	assert!(services.dom_locks.acquire("r", "d", "mod"));

	let replay = services.replay.compose("mod", "r", 0, 0).await.unwrap();
	let again = services.replay.compose("mod", "r", 0, 0).await.unwrap();
	assert_eq!(replay, again, "replay is monotone for fixed state");

	assert_eq!(replay.len(), 4);
	assert_eq!(replay[0].clock, 1);
	assert_eq!(replay[0].payload.operation, "stroke-add");
	assert_eq!(replay[1].clock, 2);
	assert_eq!(replay[2].clock, 0);
	assert_eq!(replay[2].payload.operation, "stroke-start");
	assert_eq!(replay[3].payload.operation, "dom-lock");
	assert_eq!(replay[3].payload.client_data.as_ref().unwrap().id, "mod");

	// fromId filters the already-seen prefix
	let tail = services.replay.compose("mod", "r", 0, 1).await.unwrap();
	assert_eq!(tail[0].clock, 2);
}
