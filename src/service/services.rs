use std::sync::Arc;

use scrawl_core::{Result, Server, debug, debug_info, error, info};
use scrawl_database::Database;
use tokio::{sync::Mutex, task::JoinSet};

use crate::{
	Args, OnceServices, Service, auth, dom_locks, emitter, media, membership, persistence,
	replay, rooms, strokes, users,
};

/// The assembled service layer. The former global singletons (hub, stroke
/// buffer, lock table, persistence writer) live here as explicit values whose
/// lifecycle is tied to start/stop.
pub struct Services {
	pub server: Arc<Server>,
	pub db: Arc<Database>,

	pub auth: Arc<auth::Service>,
	pub dom_locks: Arc<dom_locks::Service>,
	pub emitter: Arc<emitter::Service>,
	pub media: Arc<media::Service>,
	pub membership: Arc<membership::Service>,
	pub persistence: Arc<persistence::Service>,
	pub replay: Arc<replay::Service>,
	pub rooms: Arc<rooms::Service>,
	pub strokes: Arc<strokes::Service>,
	pub users: Arc<users::Service>,

	registry: Vec<Arc<dyn Service>>,
	workers: Mutex<JoinSet<Result>>,
}

impl Services {
	pub fn build(server: &Arc<Server>, db: &Arc<Database>) -> Result<Arc<Self>> {
		let once = Arc::new(OnceServices::default());
		let args = Args { server, db, services: &once };

		macro_rules! build {
			($module:ident) => {{
				let service = $module::Service::build(&args)?;
				once.$module.set(service.clone()).ok();
				service
			}};
		}

		let auth = build!(auth);
		let dom_locks = build!(dom_locks);
		let emitter = build!(emitter);
		let media = build!(media);
		let membership = build!(membership);
		let persistence = build!(persistence);
		let replay = build!(replay);
		let rooms = build!(rooms);
		let strokes = build!(strokes);
		let users = build!(users);

		let registry: Vec<Arc<dyn Service>> = vec![
			auth.clone(),
			dom_locks.clone(),
			emitter.clone(),
			media.clone(),
			membership.clone(),
			persistence.clone(),
			replay.clone(),
			rooms.clone(),
			strokes.clone(),
			users.clone(),
		];

		Ok(Arc::new(Self {
			server: server.clone(),
			db: db.clone(),
			auth,
			dom_locks,
			emitter,
			media,
			membership,
			persistence,
			replay,
			rooms,
			strokes,
			users,
			registry,
			workers: Mutex::new(JoinSet::new()),
		}))
	}

	/// Dispatch every service's worker onto the runtime.
	pub async fn start(self: &Arc<Self>) -> Result {
		let mut workers = self.workers.lock().await;
		for service in &self.registry {
			debug!("Starting {}", service.name());
			let worker = service.clone().worker();
			workers.spawn_on(worker, self.server.runtime());
		}

		info!("Services started");
		Ok(())
	}

	/// Interrupt all services and wait for their workers to finish.
	pub async fn stop(&self) {
		debug_info!("Stopping services...");

		for service in &self.registry {
			debug!("Interrupting {}", service.name());
			service.interrupt().await;
		}

		let mut workers = self.workers.lock().await;
		while let Some(result) = workers.join_next().await {
			match result {
				| Ok(Ok(())) => {},
				| Ok(Err(error)) => error!("worker finished with error: {error}"),
				| Err(error) => error!("worker panicked or was cancelled: {error}"),
			}
		}

		debug_info!("Services stopped");
	}
}
