use std::{
	collections::HashMap,
	sync::{Arc, Mutex, atomic::Ordering},
	time::{Duration, Instant},
};

use async_trait::async_trait;
use scrawl_core::{
	Result, Server, debug,
	board::{EventMeta, Point, StrokeObject},
};

use crate::service;

/// In-memory aggregation of in-flight strokes. A stroke lives here between
/// `stroke-start` and `stroke-end`; strokes idle past the TTL are garbage
/// collected and never persisted.
pub struct Service {
	server: Arc<Server>,
	buffer: Mutex<HashMap<String, Entry>>,
	ttl: Duration,
	gc_interval: Duration,
}

struct Entry {
	stroke: StrokeObject,
	meta: EventMeta,
	deadline: Instant,
}

#[async_trait]
impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		let config = &args.server.config;
		Ok(Arc::new(Self {
			server: args.server.clone(),
			buffer: Mutex::new(HashMap::new()),
			ttl: Duration::from_secs(config.stroke_ttl_secs),
			gc_interval: Duration::from_secs(config.stroke_gc_interval_secs),
		}))
	}

	async fn worker(self: Arc<Self>) -> Result {
		let mut signal = self.server.signal.subscribe();
		let mut ticker = tokio::time::interval(self.gc_interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		while self.server.running() {
			tokio::select! {
				_ = ticker.tick() => {
					let expired = self.gc(Instant::now());
					if expired > 0 {
						debug!(expired, "expired buffered strokes");
					}
				},
				_ = signal.recv() => break,
			}
		}

		Ok(())
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Insert an in-flight stroke; one entry per stroke id.
	pub fn start(&self, id: &str, stroke: StrokeObject, meta: EventMeta) {
		let Ok(mut buffer) = self.buffer.lock() else {
			return;
		};

		buffer.insert(id.to_owned(), Entry {
			stroke,
			meta,
			deadline: Instant::now() + self.ttl,
		});
	}

	/// Extend the point sequence and refresh the TTL. No-op when the id is
	/// absent (already ended or expired). Returns whether the id was found.
	pub fn append(&self, id: &str, points: &[Point]) -> bool {
		let Ok(mut buffer) = self.buffer.lock() else {
			return false;
		};

		let Some(entry) = buffer.get_mut(id) else {
			return false;
		};

		entry.stroke.points.extend_from_slice(points);
		entry.deadline = Instant::now() + self.ttl;
		true
	}

	/// Remove and return the finished stroke; the caller persists it.
	pub fn end(&self, id: &str) -> Option<(StrokeObject, EventMeta)> {
		let mut buffer = self.buffer.lock().ok()?;

		buffer
			.remove(id)
			.map(|entry| (entry.stroke, entry.meta))
	}

	/// Snapshot the strokes of one room/layer for replay, with their points
	/// accumulated so far.
	pub fn snapshot(&self, room_id: &str, layer: i64) -> Vec<(StrokeObject, EventMeta)> {
		self.buffer
			.lock()
			.map(|buffer| {
				buffer
					.values()
					.filter(|entry| {
						entry.meta.room_id == room_id && entry.meta.layer == layer
					})
					.map(|entry| (entry.stroke.clone(), entry.meta.clone()))
					.collect()
			})
			.unwrap_or_default()
	}

	/// Drop every entry whose deadline has passed. Returns how many were
	/// dropped.
	pub fn gc(&self, now: Instant) -> usize {
		let Ok(mut buffer) = self.buffer.lock() else {
			return 0;
		};

		let before = buffer.len();
		buffer.retain(|_, entry| entry.deadline > now);
		let expired = before - buffer.len();

		if expired > 0 {
			self.server
				.metrics
				.strokes_expired
				.fetch_add(expired as u64, Ordering::Relaxed);
		}

		expired
	}

	#[cfg(test)]
	fn len(&self) -> usize { self.buffer.lock().map(|b| b.len()).unwrap_or(0) }
}

#[cfg(test)]
mod tests {
	use std::{
		sync::Arc,
		time::{Duration, Instant},
	};

	use scrawl_core::{
		Config, Server,
		board::{EventMeta, Point, StrokeObject},
	};

	use super::Service;
	use crate::{Args, OnceServices, Service as _};

	async fn buffer() -> Arc<Service> {
		let mut path = std::env::temp_dir();
		path.push(format!(
			"scrawl-strokes-test-{}.db",
			scrawl_core::utils::rand::string(8)
		));
		let config = Config { database_path: path, ..Config::default() };
		let server = Arc::new(Server::new(config, None));
		let db = scrawl_database::Database::open(&server).await.unwrap();
		let once = Arc::new(OnceServices::default());

		Service::build(&Args { server: &server, db: &db, services: &once }).unwrap()
	}

	fn meta(room: &str) -> EventMeta {
		EventMeta { id: 1, room_id: room.into(), user_id: "u".into(), layer: 0 }
	}

	fn stroke(id: &str, n: usize) -> StrokeObject {
		StrokeObject {
			id: id.into(),
			points: (0..n)
				.map(|i| Point { x: i as f64, y: i as f64, pressure: 0.5 })
				.collect(),
			..Default::default()
		}
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn start_append_end_concatenates_points() {
		let buffer = buffer().await;
		buffer.start("s", stroke("s", 1), meta("r"));

		assert!(buffer.append("s", &[Point { x: 1.0, y: 1.0, pressure: 0.5 }]));
		assert!(buffer.append("s", &[Point { x: 2.0, y: 2.0, pressure: 0.5 }]));

		let (stroke, meta) = buffer.end("s").unwrap();
		assert_eq!(stroke.points.len(), 3);
		assert_eq!(meta.id, 1);
		assert!(buffer.end("s").is_none());
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn append_to_absent_id_is_a_noop() {
		let buffer = buffer().await;
		assert!(!buffer.append("ghost", &[Point::default()]));
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn gc_expires_idle_strokes_only() {
		let buffer = buffer().await;
		buffer.start("old", stroke("old", 1), meta("r"));
		buffer.start("new", stroke("new", 1), meta("r"));

		// nothing is older than the ttl yet
		assert_eq!(buffer.gc(Instant::now()), 0);

		// from the vantage of the far future everything expired
		let later = Instant::now() + Duration::from_secs(601);
		assert_eq!(buffer.gc(later), 2);
		assert_eq!(buffer.len(), 0);
		assert!(buffer.end("old").is_none());
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn snapshot_filters_by_room_and_layer() {
		let buffer = buffer().await;
		buffer.start("a", stroke("a", 1), meta("r1"));
		buffer.start("b", stroke("b", 1), meta("r2"));

		let mut other_layer = meta("r1");
		other_layer.layer = 5;
		buffer.start("c", stroke("c", 1), other_layer);

		let snap = buffer.snapshot("r1", 0);
		assert_eq!(snap.len(), 1);
		assert_eq!(snap[0].0.id, "a");
	}
}
