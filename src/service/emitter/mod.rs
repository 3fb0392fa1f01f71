use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use scrawl_core::{
	Result, Server,
	board::{NetworkMsg, Op, Point, ServerMsg, StrokeObject},
	info,
	utils::rand::string,
};

use crate::{OnceServices, service};

/// Synthetic stroke traffic for soak-testing a room's fan-out path. Frames
/// go straight to broadcast and bypass buffering and persistence; peers see
/// load, the store does not.
pub struct Service {
	server: Arc<Server>,
	services: Arc<OnceServices>,
}

#[async_trait]
impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			server: args.server.clone(),
			services: args.services.clone(),
		}))
	}

	async fn worker(self: Arc<Self>) -> Result {
		let config = &self.server.config;
		if !config.emitter_enabled() {
			return Ok(());
		}

		let room_id = config.emitter_room.clone();
		let strokes = config.emitter_strokes;
		let updates = config.emitter_updates_per_stroke;
		info!(%room_id, strokes, updates, "burning synthetic strokes");

		for _ in 0..strokes {
			if !self.server.running() {
				break;
			}

			let id = string(16);
			self.broadcast(&room_id, gen_stroke_start(&id));

			for _ in 0..updates {
				let count = rand::thread_rng().gen_range(5..25);
				self.broadcast(&room_id, gen_stroke_update(&id, count));
			}

			self.broadcast(&room_id, gen_stroke_end(&id, updates.try_into().unwrap_or(0)));
			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		}

		Ok(())
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	fn broadcast(&self, room_id: &str, msg: ServerMsg) {
		let Ok(frame) = serde_json::to_vec(&[msg]) else {
			return;
		};

		self.services
			.rooms()
			.broadcast(room_id, Bytes::from(frame), None);
	}
}

fn random_point() -> Point {
	let mut rng = rand::thread_rng();
	Point {
		x: rng.r#gen::<f64>() * 1920.0,
		y: rng.r#gen::<f64>() * 1080.0,
		pressure: 0.5,
	}
}

fn gen_stroke_start(id: &str) -> ServerMsg {
	let mut payload = NetworkMsg::new(Op::StrokeStart, id);
	payload.stroke = Some(StrokeObject {
		id: id.to_owned(),
		kind: "stroke".to_owned(),
		color: "rgb(0,0,0)".to_owned(),
		opacity: 1.0,
		size: 3,
		points: vec![random_point()],
		..Default::default()
	});

	ServerMsg::new(0, payload)
}

fn gen_stroke_update(id: &str, count: usize) -> ServerMsg {
	let mut payload = NetworkMsg::new(Op::StrokeUpdate, id);
	payload.points = Some((0..count).map(|_| random_point()).collect());

	ServerMsg::new(0, payload)
}

fn gen_stroke_end(id: &str, clock: i64) -> ServerMsg {
	ServerMsg::new(clock, NetworkMsg::new(Op::StrokeEnd, id))
}
