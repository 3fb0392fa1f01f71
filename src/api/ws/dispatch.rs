use scrawl_core::{
	Result,
	board::{ClientData, Event, EventMeta, LayerRef, NetworkMsg, Op, ServerMsg},
	debug_error, trace,
	utils::now_millis,
};

use super::Connection;

/// The per-message state machine. Returns the message to broadcast to the
/// room (echo included), or None for silent handling: rejected locks and
/// transforms, unknown operations, and layer switches (which only unicast).
pub(crate) async fn handle(conn: &Connection, msg: NetworkMsg) -> Result<Option<ServerMsg>> {
	let services = &conn.services;
	let room_id = conn.room_id.as_str();
	let user_id = conn.user_id.as_str();
	let layer = conn.current_layer();

	match msg.op() {
		| Op::StrokeStart => {
			let Some(mut stroke) = msg.stroke.clone() else {
				return Ok(None);
			};

			let Some(clock) = services.rooms.next_clock(room_id) else {
				return Ok(None);
			};

			stroke.layer_index = layer;
			let meta = EventMeta {
				id: clock,
				room_id: room_id.to_owned(),
				user_id: user_id.to_owned(),
				layer,
			};

			services.strokes.start(&msg.id, stroke.clone(), meta);

			let mut payload = msg;
			payload.stroke = Some(stroke);
			Ok(Some(ServerMsg::new(clock, payload)))
		},

		| Op::StrokeUpdate => {
			if let Some(points) = &msg.points {
				services.strokes.append(&msg.id, points);
			}

			Ok(Some(ServerMsg::new(0, msg)))
		},

		| Op::StrokeEnd => {
			if let Some((stroke, meta)) = services.strokes.end(&msg.id) {
				services.persistence.write_event(Event {
					id: meta.id,
					room_id: meta.room_id,
					user_id: meta.user_id,
					entity_id: stroke.id.clone(),
					op: Op::StrokeAdd.as_str().to_owned(),
					payload: serde_json::to_vec(&stroke)?,
					layer: meta.layer,
					created_at: now_millis(),
				});
			}

			Ok(Some(ServerMsg::new(0, msg)))
		},

		// server-synthesized during replay; a client sending it gets an
		// echo and nothing else
		| Op::StrokeAdd => Ok(Some(ServerMsg::new(0, msg))),

		| Op::DomAdd => {
			let Some(mut dom) = msg.dom_object.clone() else {
				return Ok(None);
			};

			let Some(clock) = services.rooms.next_clock(room_id) else {
				return Ok(None);
			};

			dom.layer_index = layer;
			dom.user_id = Some(user_id.to_owned());

			let mut payload = msg;
			payload.dom_object = Some(dom.clone());

			services.persistence.write_event(Event {
				id: clock,
				room_id: room_id.to_owned(),
				user_id: user_id.to_owned(),
				entity_id: dom.id.clone(),
				op: Op::DomAdd.as_str().to_owned(),
				payload: serde_json::to_vec(&payload)?,
				layer,
				created_at: now_millis(),
			});
			services.persistence.dom_create(room_id, user_id, dom);

			Ok(Some(ServerMsg::new(clock, payload)))
		},

		| Op::DomLock => {
			if !services.dom_locks.acquire(room_id, &msg.id, user_id) {
				trace!(room_id, dom_id = %msg.id, "lock denied");
				return Ok(None);
			}

			let mut payload = msg;
			payload.client_data =
				Some(ClientData { id: user_id.to_owned(), ..Default::default() });
			Ok(Some(ServerMsg::new(0, payload)))
		},

		| Op::DomUnlock => {
			if !services.dom_locks.release(room_id, &msg.id, user_id) {
				return Ok(None);
			}

			Ok(Some(ServerMsg::new(0, msg)))
		},

		| Op::DomTransform => {
			if let Some(owner) = services.dom_locks.current(room_id, &msg.id) {
				if owner != user_id {
					trace!(room_id, dom_id = %msg.id, %owner, "transform under foreign lock");
					return Ok(None);
				}
			}

			let Some(transform) = msg.transform else {
				return Ok(None);
			};

			let Some(clock) = services.rooms.next_clock(room_id) else {
				return Ok(None);
			};

			services.persistence.write_event(Event {
				id: clock,
				room_id: room_id.to_owned(),
				user_id: user_id.to_owned(),
				entity_id: msg.id.clone(),
				op: Op::DomTransform.as_str().to_owned(),
				payload: serde_json::to_vec(&msg)?,
				layer,
				created_at: now_millis(),
			});
			services.persistence.dom_transform(room_id, &msg.id, transform);

			Ok(Some(ServerMsg::new(clock, msg)))
		},

		// no event log row; the row's payload column is the durable record
		| Op::DomPayload => {
			let Some(payload) = msg.payload.clone() else {
				return Ok(None);
			};

			services.persistence.dom_payload(room_id, &msg.id, payload);
			Ok(Some(ServerMsg::new(0, msg)))
		},

		| Op::DomRemove => {
			let Some(clock) = services.rooms.next_clock(room_id) else {
				return Ok(None);
			};

			services.persistence.write_event(Event {
				id: clock,
				room_id: room_id.to_owned(),
				user_id: user_id.to_owned(),
				entity_id: msg.id.clone(),
				op: Op::DomRemove.as_str().to_owned(),
				payload: serde_json::to_vec(&msg)?,
				layer,
				created_at: now_millis(),
			});
			services.persistence.dom_remove(room_id, &msg.id);

			Ok(Some(ServerMsg::new(clock, msg)))
		},

		| Op::CursorUpdate => Ok(Some(ServerMsg::new(0, msg))),

		| Op::ChangeLayer => {
			change_layer(conn, &msg).await?;
			Ok(None)
		},

		| _ => Ok(None),
	}
}

/// Layer switches never broadcast; the requester alone sees the acks and
/// the per-layer replay.
async fn change_layer(conn: &Connection, msg: &NetworkMsg) -> Result {
	let services = &conn.services;
	let room_id = conn.room_id.as_str();
	let user_id = conn.user_id.as_str();
	let desired = msg.layer.map_or(0, |layer| layer.index);

	if desired >= 0 {
		if !services
			.membership
			.check_can_use_layer(room_id, desired, user_id)
			.await?
		{
			deny(conn);
			return Ok(());
		}

		return switch(conn, desired).await;
	}

	// negative index requests the user's private layer, created on first
	// use
	if let Some(index) = services.membership.private_layer_for(room_id, user_id).await? {
		return switch(conn, index).await;
	}

	match services
		.membership
		.create_private_layer(room_id, user_id)
		.await
	{
		| Ok(index) => switch(conn, index).await,
		| Err(error) => {
			debug_error!(room_id, user_id, "private layer creation failed: {error}");
			deny(conn);
			Ok(())
		},
	}
}

fn deny(conn: &Connection) {
	let mut payload = NetworkMsg::new(Op::ChangeLayerDenied, conn.user_id.clone());
	payload.layer = Some(LayerRef { index: conn.current_layer() });
	conn.send_msgs(&[ServerMsg::new(0, payload)]);
}

async fn switch(conn: &Connection, index: i64) -> Result {
	conn.set_layer(index);

	let mut payload = NetworkMsg::new(Op::ChangeLayerAccept, conn.user_id.clone());
	payload.layer = Some(LayerRef { index });
	conn.send_msgs(&[ServerMsg::new(0, payload)]);

	// a fresh replay scoped to the new layer
	let replay = conn
		.services
		.replay
		.compose(&conn.user_id, &conn.room_id, index, 0)
		.await?;

	if !replay.is_empty() {
		conn.send_msgs(&replay);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use std::{
		sync::{
			Arc,
			atomic::{AtomicBool, AtomicI64},
		},
		time::Duration,
	};

	use bytes::Bytes;
	use rusqlite::params;
	use scrawl_core::{
		Config, Server,
		board::{NetworkMsg, Op, Point, Role, StrokeObject, Transform},
	};
	use scrawl_database::or_else;
	use scrawl_service::{Services, rooms::Member};

	use super::{super::Connection, handle};

	async fn services() -> Arc<Services> {
		let mut path = std::env::temp_dir();
		path.push(format!(
			"scrawl-dispatch-test-{}.db",
			scrawl_core::utils::rand::string(8)
		));

		let mut config = Config { database_path: path, ..Config::default() };
		config.check().unwrap();

		let server = Arc::new(Server::new(config, Some(tokio::runtime::Handle::current())));
		let db = scrawl_database::Database::open(&server).await.unwrap();
		let services = Services::build(&server, &db).unwrap();
		services.start().await.unwrap();

		services
	}

	async fn connection(
		services: &Arc<Services>,
		id: u64,
		room_id: &str,
		user_id: &str,
	) -> (Arc<Connection>, loole::Receiver<Bytes>) {
		let (sender, receiver) = loole::bounded(64);
		services
			.rooms
			.join(room_id, Member::new(id, user_id.to_owned(), sender.clone()))
			.await
			.unwrap();

		let conn = Arc::new(Connection {
			id,
			room_id: room_id.to_owned(),
			user_id: user_id.to_owned(),
			display_name: user_id.to_owned(),
			color: String::new(),
			avatar: String::new(),
			role: Role::Member,
			current_layer: AtomicI64::new(0),
			services: services.clone(),
			sender,
			closed: AtomicBool::new(false),
		});

		(conn, receiver)
	}

	fn stroke_msg(op: Op, id: &str, points: &[(f64, f64)]) -> NetworkMsg {
		let mut msg = NetworkMsg::new(op, id);
		match op {
			| Op::StrokeStart => {
				msg.stroke = Some(StrokeObject {
					id: id.to_owned(),
					color: "#000".to_owned(),
					opacity: 1.0,
					size: 3,
					points: to_points(points),
					..Default::default()
				});
			},
			| Op::StrokeUpdate => msg.points = Some(to_points(points)),
			| _ => {},
		}

		msg
	}

	fn to_points(points: &[(f64, f64)]) -> Vec<Point> {
		points
			.iter()
			.map(|(x, y)| Point { x: *x, y: *y, pressure: 0.5 })
			.collect()
	}

	fn stroke_add_events(services: &Arc<Services>, room_id: &str) -> Vec<(i64, Vec<u8>)> {
		services
			.db
			.engine
			.with_read(|conn| {
				let mut stmt = conn
					.prepare(
						"SELECT id, payload FROM events
							WHERE room_id = ?1 AND op = 'stroke-add' ORDER BY id",
					)
					.map_err(or_else)?;
				let rows = stmt
					.query_map(params![room_id], |row| Ok((row.get(0)?, row.get(1)?)))
					.map_err(or_else)?;

				let mut events = Vec::new();
				for row in rows {
					events.push(row.map_err(or_else)?);
				}

				Ok(events)
			})
			.unwrap()
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn stroke_lifecycle_through_the_router() {
		let services = services().await;
		let (conn, _rx) = connection(&services, 1, "r", "alice").await;

		let started = handle(&conn, stroke_msg(Op::StrokeStart, "s", &[(0.0, 0.0)]))
			.await
			.unwrap()
			.expect("stroke-start echoes");
		assert_eq!(started.clock, 1);

		let update = handle(&conn, stroke_msg(Op::StrokeUpdate, "s", &[(1.0, 1.0), (2.0, 2.0)]))
			.await
			.unwrap()
			.expect("stroke-update broadcasts");
		assert_eq!(update.clock, 0);

		let ended = handle(&conn, NetworkMsg::new(Op::StrokeEnd, "s"))
			.await
			.unwrap()
			.expect("stroke-end broadcasts");
		assert_eq!(ended.clock, 0);

		// exactly one persisted event, id = the clock assigned at start,
		// points concatenated in order
		for _ in 0..300 {
			if !stroke_add_events(&services, "r").is_empty() {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}

		let events = stroke_add_events(&services, "r");
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].0, 1);

		let decoded: StrokeObject = serde_json::from_slice(&events[0].1).unwrap();
		assert_eq!(decoded.points, to_points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]));
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn lock_contention_grants_exactly_one() {
		let services = services().await;
		let (alice, _rx1) = connection(&services, 1, "r", "alice").await;
		let (bob, _rx2) = connection(&services, 2, "r", "bob").await;

		let granted = handle(&alice, NetworkMsg::new(Op::DomLock, "d"))
			.await
			.unwrap()
			.expect("winner sees a broadcast echo");
		assert_eq!(granted.payload.operation, "dom-lock");
		assert_eq!(granted.payload.client_data.as_ref().unwrap().id, "alice");

		let denied = handle(&bob, NetworkMsg::new(Op::DomLock, "d")).await.unwrap();
		assert!(denied.is_none(), "loser's response is empty");

		// non-owner unlock changes nothing
		let foreign_unlock = handle(&bob, NetworkMsg::new(Op::DomUnlock, "d")).await.unwrap();
		assert!(foreign_unlock.is_none());
		assert_eq!(services.dom_locks.current("r", "d").as_deref(), Some("alice"));
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn transform_under_foreign_lock_is_silent() {
		let services = services().await;
		let (alice, _rx1) = connection(&services, 1, "r", "alice").await;
		let (bob, _rx2) = connection(&services, 2, "r", "bob").await;

		handle(&alice, NetworkMsg::new(Op::DomLock, "d"))
			.await
			.unwrap()
			.expect("alice takes the lock");

		let mut transform = NetworkMsg::new(Op::DomTransform, "d");
		transform.transform =
			Some(Transform { x: 1.0, y: 2.0, rot: 0.0, w: 10.0, h: 10.0 });

		let response = handle(&bob, transform).await.unwrap();
		assert!(response.is_none(), "no broadcast under a foreign lock");

		// no event was written either
		tokio::time::sleep(Duration::from_millis(200)).await;
		let events: i64 = services
			.db
			.engine
			.with_read(|conn| {
				conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
					.map_err(or_else)
			})
			.unwrap();
		assert_eq!(events, 0);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn unknown_operations_are_dropped() {
		let services = services().await;
		let (conn, _rx) = connection(&services, 1, "r", "alice").await;

		let mut msg = NetworkMsg::new(Op::CursorUpdate, "alice");
		msg.operation = "telepathy".to_owned();
		assert!(handle(&conn, msg).await.unwrap().is_none());
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn cursor_update_is_pure_fanout() {
		let services = services().await;
		let (conn, _rx) = connection(&services, 1, "r", "alice").await;

		let response = handle(&conn, NetworkMsg::new(Op::CursorUpdate, "alice"))
			.await
			.unwrap()
			.expect("cursor updates broadcast");
		assert_eq!(response.clock, 0);

		tokio::time::sleep(Duration::from_millis(100)).await;
		let events: i64 = services
			.db
			.engine
			.with_read(|conn| {
				conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
					.map_err(or_else)
			})
			.unwrap();
		assert_eq!(events, 0, "cursor updates are never persisted");
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn disconnect_sweeps_locks_and_announces_the_leave() {
		let services = services().await;
		let (alice, _rx1) = connection(&services, 1, "r", "alice").await;
		let (bob, rx2) = connection(&services, 2, "r", "bob").await;

		handle(&alice, NetworkMsg::new(Op::DomLock, "d"))
			.await
			.unwrap()
			.expect("alice takes the lock");

		alice.close();
		alice.close(); // idempotent

		let frame = rx2.recv_async().await.unwrap();
		let msgs: Vec<scrawl_core::board::ServerMsg> = serde_json::from_slice(&frame).unwrap();
		assert_eq!(msgs.len(), 2);
		assert_eq!(msgs[0].payload.operation, "dom-unlock");
		assert_eq!(msgs[0].payload.id, "d");
		assert_eq!(msgs[1].payload.operation, "client-leave");
		assert_eq!(msgs[1].payload.id, "alice");

		// the lock is gone and alice is out of the room
		assert!(services.dom_locks.current("r", "d").is_none());
		assert_eq!(services.rooms.clients("r").len(), 1);
		assert_eq!(services.rooms.clients("r")[0].user_id, "bob");

		// only one frame was produced by the teardown
		assert!(rx2.try_recv().is_err());
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn mid_stroke_snapshot_carries_accumulated_points() {
		let services = services().await;
		let (conn, _rx) = connection(&services, 1, "r", "alice").await;

		handle(&conn, stroke_msg(Op::StrokeStart, "s", &[(0.0, 0.0)]))
			.await
			.unwrap();
		handle(&conn, stroke_msg(Op::StrokeUpdate, "s", &[(1.0, 1.0)]))
			.await
			.unwrap();

		let snapshot = services.strokes.snapshot("r", 0);
		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot[0].0.points.len(), 2);
	}
}
