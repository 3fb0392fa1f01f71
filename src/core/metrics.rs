use std::sync::atomic::AtomicU64;

/// Counters exposing the drop/evict policies of the bounded queues, so
/// degraded durability and slow-consumer eviction are observable rather than
/// silent.
#[derive(Default)]
pub struct Metrics {
	/// Requests handled by the HTTP/WS surface.
	pub requests_count: AtomicU64,

	/// Persistence jobs dropped because the write queue was full.
	pub persist_dropped: AtomicU64,

	/// Persistence jobs that failed at the store; the actor keeps running.
	pub persist_errors: AtomicU64,

	/// Members evicted from a room because their send queue was full.
	pub sends_evicted: AtomicU64,

	/// Buffered strokes discarded by TTL expiry without being persisted.
	pub strokes_expired: AtomicU64,
}

impl Metrics {
	#[must_use]
	pub fn new() -> Self { Self::default() }
}
