use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering},
	},
	time::Duration,
};

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{
	SinkExt, StreamExt,
	stream::{SplitSink, SplitStream},
};
use scrawl_core::{
	board::{ClientData, NetworkMsg, Op, Role, ServerMsg},
	debug, debug_error, debug_info, debug_warn,
};
use scrawl_service::{Services, auth::Identity, rooms::Member, users};

use super::dispatch;

static CONN_ID: AtomicU64 = AtomicU64::new(1);

/// One client connection: its identity within the room, its bounded send
/// queue, and its active layer. Owned by exactly one room while joined.
pub(crate) struct Connection {
	pub id: u64,
	pub room_id: String,
	pub user_id: String,
	pub display_name: String,
	pub color: String,
	pub avatar: String,
	pub role: Role,
	pub current_layer: AtomicI64,
	pub services: Arc<Services>,
	pub(crate) sender: loole::Sender<Bytes>,
	pub(crate) closed: AtomicBool,
}

/// Entry point after the upgrade: wire the member into the hub, push the
/// initial replay, then run the read and write tasks until either side
/// ends.
pub(crate) async fn run(
	services: Arc<Services>,
	socket: WebSocket,
	room_id: String,
	identity: Identity,
	role: Role,
) {
	let config = &services.server.config;
	let (sender, receiver) = loole::bounded(config.send_queue_capacity);
	let keepalive = Duration::from_secs(config.keepalive_interval_secs);

	let display_name = if identity.name.is_empty() {
		identity.given_name.clone()
	} else {
		identity.name.clone()
	};

	let conn = Arc::new(Connection {
		id: CONN_ID.fetch_add(1, Ordering::Relaxed),
		room_id,
		user_id: identity.user_id.clone(),
		color: users::Service::color_for(&identity.user_id),
		display_name,
		avatar: identity.picture,
		role,
		current_layer: AtomicI64::new(0),
		services: services.clone(),
		sender: sender.clone(),
		closed: AtomicBool::new(false),
	});

	let member = Member::new(conn.id, conn.user_id.clone(), sender);
	if let Err(error) = services.rooms.join(&conn.room_id, member).await {
		debug_error!(room_id = %conn.room_id, "join failed: {error}");
		return;
	}

	debug_info!(
		room_id = %conn.room_id,
		user_id = %conn.user_id,
		role = ?conn.role,
		"joined room"
	);

	// the newcomer's replay for the base layer
	match services
		.replay
		.compose(&conn.user_id, &conn.room_id, 0, 0)
		.await
	{
		| Ok(msgs) =>
			if !msgs.is_empty() {
				conn.send_msgs(&msgs);
			},
		| Err(error) => debug_error!(room_id = %conn.room_id, "replay failed: {error}"),
	}

	let (sink, stream) = socket.split();
	let write_task = services
		.server
		.runtime()
		.spawn(write_loop(sink, receiver, keepalive));

	read_loop(&conn, stream).await;
	conn.close();
	write_task.await.ok();
}

/// Read frames until the transport errors or closes, routing each message
/// and broadcasting the batched responses.
async fn read_loop(conn: &Arc<Connection>, mut stream: SplitStream<WebSocket>) {
	while let Some(result) = stream.next().await {
		let message = match result {
			| Ok(message) => message,
			| Err(error) => {
				debug!(user_id = %conn.user_id, "transport read error: {error}");
				break;
			},
		};

		match message {
			| Message::Text(text) => conn.handle_frame(text.as_bytes()).await,
			| Message::Binary(data) => conn.handle_frame(&data).await,
			| Message::Close(_) => break,
			| _ => {},
		}
	}
}

/// Drain the send queue onto the socket, pinging on the keepalive cadence.
/// Terminates when the queue closes (connection close or eviction) or the
/// transport fails.
async fn write_loop(
	mut sink: SplitSink<WebSocket, Message>,
	receiver: loole::Receiver<Bytes>,
	keepalive: Duration,
) {
	let mut ping = tokio::time::interval(keepalive);
	ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
	ping.tick().await;

	loop {
		tokio::select! {
			frame = receiver.recv_async() => {
				let Ok(frame) = frame else { break };
				let Ok(text) = String::from_utf8(frame.to_vec()) else { continue };
				if sink.send(Message::Text(text.into())).await.is_err() {
					break;
				}
			},
			_ = ping.tick() => {
				if sink.send(Message::Ping(Bytes::new())).await.is_err() {
					break;
				}
			},
		}
	}

	sink.close().await.ok();
}

impl Connection {
	#[inline]
	pub fn current_layer(&self) -> i64 { self.current_layer.load(Ordering::Acquire) }

	pub fn set_layer(&self, index: i64) { self.current_layer.store(index, Ordering::Release); }

	/// Decode a frame as an array of messages, route each, and broadcast
	/// the collected responses as one batched frame. Malformed frames are
	/// skipped, never fatal.
	async fn handle_frame(&self, frame: &[u8]) {
		let msgs: Vec<NetworkMsg> = match serde_json::from_slice(frame) {
			| Ok(msgs) => msgs,
			| Err(error) => {
				debug_warn!(user_id = %self.user_id, "skipping malformed frame: {error}");
				return;
			},
		};

		let mut responses = Vec::with_capacity(msgs.len());
		for msg in msgs {
			match dispatch::handle(self, msg).await {
				| Ok(Some(response)) => responses.push(response),
				| Ok(None) => {},
				| Err(error) => {
					debug_error!(user_id = %self.user_id, "message dispatch failed: {error}");
				},
			}
		}

		if responses.is_empty() {
			return;
		}

		match serde_json::to_vec(&responses) {
			| Ok(frame) => self
				.services
				.rooms
				.broadcast(&self.room_id, Bytes::from(frame), None),
			| Err(error) => debug_error!("response encoding failed: {error}"),
		}
	}

	/// Unicast to this connection only. Overflow is dropped; the hub-side
	/// eviction policy covers the pathological case.
	pub(crate) fn send_msgs(&self, msgs: &[ServerMsg]) {
		let Ok(frame) = serde_json::to_vec(msgs) else {
			return;
		};

		self.sender.try_send(Bytes::from(frame)).ok();
	}

	fn client_data(&self) -> ClientData {
		ClientData {
			id: self.user_id.clone(),
			name: Some(self.display_name.clone()),
			color: Some(self.color.clone()),
			profile: Some(self.avatar.clone()),
		}
	}

	/// Idempotent teardown: leave the room, sweep this user's locks
	/// (announcing each release), announce the departure, and close the
	/// send queue so the write task drains out.
	pub(crate) fn close(&self) {
		if self.closed.swap(true, Ordering::AcqRel) {
			return;
		}

		let services = &self.services;
		services.rooms.leave(&self.room_id, self.id);

		let mut msgs: Vec<ServerMsg> = services
			.dom_locks
			.sweep(&self.room_id, &self.user_id)
			.into_iter()
			.map(|dom_id| {
				let mut payload = NetworkMsg::new(Op::DomUnlock, dom_id);
				payload.client_data =
					Some(ClientData { id: self.user_id.clone(), ..Default::default() });
				ServerMsg::new(0, payload)
			})
			.collect();

		let mut leave = NetworkMsg::new(Op::ClientLeave, self.user_id.clone());
		leave.client_data = Some(self.client_data());
		msgs.push(ServerMsg::new(0, leave));

		if let Ok(frame) = serde_json::to_vec(&msgs) {
			services
				.rooms
				.broadcast(&self.room_id, Bytes::from(frame), None);
		}

		self.sender.close();
		debug_info!(room_id = %self.room_id, user_id = %self.user_id, "left room");
	}
}
