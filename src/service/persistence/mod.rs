mod data;

use std::sync::{Arc, atomic::Ordering};

use async_trait::async_trait;
use loole::{Receiver, Sender};
use scrawl_core::{
	Result, Server, debug, debug_warn, error,
	board::{DomObject, Event, Role, Transform},
	utils::now_millis,
};
use tokio::sync::oneshot;

use crate::service;

/// The single-writer persistence actor. All store mutation funnels through a
/// bounded job queue drained by one worker, which serializes writes and
/// keeps transactional jobs all-or-nothing. Enqueueing never blocks: a full
/// queue drops the job, logs, and counts degraded durability.
pub struct Service {
	server: Arc<Server>,
	db: Arc<scrawl_database::Database>,
	channel: (Sender<Job>, Receiver<Job>),
}

/// Tagged write jobs, one variant per statement shape.
pub enum Job {
	WriteEvent(Event),
	DomCreate {
		room_id: String,
		user_id: String,
		dom: DomObject,
		created_at: i64,
	},
	DomTransform {
		room_id: String,
		dom_id: String,
		transform: Transform,
		updated_at: i64,
	},
	DomPayload {
		room_id: String,
		dom_id: String,
		payload: String,
		updated_at: i64,
	},
	DomRemove {
		room_id: String,
		dom_id: String,
		updated_at: i64,
	},
	RoomCreate {
		room_id: String,
		owner_id: String,
		public: bool,
		created_at: i64,
	},
	RoomEditUser {
		room_id: String,
		user_id: String,
		role: Role,
		joined_at: i64,
	},
	UserUpsert {
		user_id: String,
		name: String,
		given_name: String,
		email: String,
		created_at: i64,
	},
	LayerCreate {
		room_id: String,
		owner_id: String,
		name: String,
		public: bool,
		created_at: i64,
		reply: oneshot::Sender<Result<i64>>,
	},
}

impl Job {
	fn kind(&self) -> &'static str {
		match self {
			| Self::WriteEvent(..) => "WriteEvent",
			| Self::DomCreate { .. } => "DomCreate",
			| Self::DomTransform { .. } => "DomTransform",
			| Self::DomPayload { .. } => "DomPayload",
			| Self::DomRemove { .. } => "DomRemove",
			| Self::RoomCreate { .. } => "RoomCreate",
			| Self::RoomEditUser { .. } => "RoomEditUser",
			| Self::UserUpsert { .. } => "UserUpsert",
			| Self::LayerCreate { .. } => "LayerCreate",
		}
	}
}

#[async_trait]
impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		let capacity = args.server.config.persist_queue_capacity;
		Ok(Arc::new(Self {
			server: args.server.clone(),
			db: args.db.clone(),
			channel: loole::bounded(capacity),
		}))
	}

	async fn worker(self: Arc<Self>) -> Result {
		let receiver = self.channel.1.clone();
		while let Ok(job) = receiver.recv_async().await {
			let kind = job.kind();
			let result = tokio::task::block_in_place(|| self.execute(job));
			if let Err(error) = result {
				self.server
					.metrics
					.persist_errors
					.fetch_add(1, Ordering::Relaxed);
				error!(kind, "persistence job failed: {error}");
			}
		}

		debug!("persistence worker finished");
		Ok(())
	}

	async fn interrupt(&self) {
		let (sender, _) = &self.channel;
		if !sender.is_closed() {
			sender.close();
		}
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	pub fn write_event(&self, event: Event) { self.dispatch(Job::WriteEvent(event)); }

	pub fn dom_create(&self, room_id: &str, user_id: &str, dom: DomObject) {
		self.dispatch(Job::DomCreate {
			room_id: room_id.to_owned(),
			user_id: user_id.to_owned(),
			dom,
			created_at: now_millis(),
		});
	}

	pub fn dom_transform(&self, room_id: &str, dom_id: &str, transform: Transform) {
		self.dispatch(Job::DomTransform {
			room_id: room_id.to_owned(),
			dom_id: dom_id.to_owned(),
			transform,
			updated_at: now_millis(),
		});
	}

	pub fn dom_payload(&self, room_id: &str, dom_id: &str, payload: String) {
		self.dispatch(Job::DomPayload {
			room_id: room_id.to_owned(),
			dom_id: dom_id.to_owned(),
			payload,
			updated_at: now_millis(),
		});
	}

	pub fn dom_remove(&self, room_id: &str, dom_id: &str) {
		self.dispatch(Job::DomRemove {
			room_id: room_id.to_owned(),
			dom_id: dom_id.to_owned(),
			updated_at: now_millis(),
		});
	}

	pub fn room_create(&self, room_id: &str, owner_id: &str, public: bool) {
		self.dispatch(Job::RoomCreate {
			room_id: room_id.to_owned(),
			owner_id: owner_id.to_owned(),
			public,
			created_at: now_millis(),
		});
	}

	pub fn room_edit_user(&self, room_id: &str, user_id: &str, role: Role) {
		self.dispatch(Job::RoomEditUser {
			room_id: room_id.to_owned(),
			user_id: user_id.to_owned(),
			role,
			joined_at: now_millis(),
		});
	}

	pub fn user_upsert(&self, user_id: &str, name: &str, given_name: &str, email: &str) {
		self.dispatch(Job::UserUpsert {
			user_id: user_id.to_owned(),
			name: name.to_owned(),
			given_name: given_name.to_owned(),
			email: email.to_owned(),
			created_at: now_millis(),
		});
	}

	/// Create a layer and report the assigned index back to the caller. The
	/// reply resolves once the actor has committed (or failed) the
	/// transaction; a dropped reply means the job itself was dropped.
	pub async fn layer_create(
		&self,
		room_id: &str,
		owner_id: &str,
		name: &str,
		public: bool,
	) -> Result<i64> {
		let (reply, rx) = oneshot::channel();
		self.dispatch(Job::LayerCreate {
			room_id: room_id.to_owned(),
			owner_id: owner_id.to_owned(),
			name: name.to_owned(),
			public,
			created_at: now_millis(),
			reply,
		});

		rx.await
			.map_err(|_| scrawl_core::err!(Database("layer create was dropped")))?
	}

	/// Non-blocking enqueue. Queue overflow is deliberate data loss: the
	/// live session has already observed the broadcast, only durability
	/// degrades.
	fn dispatch(&self, job: Job) {
		let kind = job.kind();
		let (sender, _) = &self.channel;
		if sender.try_send(job).is_err() {
			self.server
				.metrics
				.persist_dropped
				.fetch_add(1, Ordering::Relaxed);
			debug_warn!(kind, "persistence queue full; dropping job");
		}
	}

	fn execute(&self, job: Job) -> Result {
		match job {
			| Job::WriteEvent(event) => self
				.db
				.engine
				.with_write(|conn| data::insert_event(conn, &event)),
			| Job::DomCreate { room_id, user_id, dom, created_at } =>
				self.db.engine.with_write(|conn| {
					data::dom_create(conn, &room_id, &user_id, &dom, created_at)
				}),
			| Job::DomTransform { room_id, dom_id, transform, updated_at } =>
				self.db.engine.with_write(|conn| {
					data::dom_transform(conn, &room_id, &dom_id, &transform, updated_at)
				}),
			| Job::DomPayload { room_id, dom_id, payload, updated_at } =>
				self.db.engine.with_write(|conn| {
					data::dom_payload(conn, &room_id, &dom_id, &payload, updated_at)
				}),
			| Job::DomRemove { room_id, dom_id, updated_at } =>
				self.db.engine.with_write(|conn| {
					data::dom_remove(conn, &room_id, &dom_id, updated_at)
				}),
			| Job::RoomCreate { room_id, owner_id, public, created_at } =>
				self.db.engine.with_write(|conn| {
					data::room_create(conn, &room_id, &owner_id, public, created_at)
				}),
			| Job::RoomEditUser { room_id, user_id, role, joined_at } =>
				self.db.engine.with_write(|conn| {
					data::room_edit_user(conn, &room_id, &user_id, role, joined_at)
				}),
			| Job::UserUpsert { user_id, name, given_name, email, created_at } =>
				self.db.engine.with_write(|conn| {
					data::user_upsert(conn, &user_id, &name, &given_name, &email, created_at)
				}),
			| Job::LayerCreate { room_id, owner_id, name, public, created_at, reply } => {
				let result = self.db.engine.with_write(|conn| {
					data::layer_create(conn, &room_id, &owner_id, &name, public, created_at)
				});
				reply.send(result).ok();
				Ok(())
			},
		}
	}
}
