use std::{
	path::{Path, PathBuf},
	sync::{Arc, Mutex},
	time::Duration,
};

use rusqlite::Connection;
use scrawl_core::{Error, Result, Server, debug, err, info};

use crate::schema;

/// Connection management for the embedded store: exactly one writer
/// connection (taken only by the persistence actor) and a small pool of
/// read connections usable concurrently under WAL.
pub struct Engine {
	path: PathBuf,
	busy_timeout: Duration,
	writer: Mutex<Connection>,
	readers: Mutex<Vec<Connection>>,
	pool_size: usize,
}

impl Engine {
	pub(crate) fn open(server: &Arc<Server>) -> Result<Arc<Self>> {
		let config = &server.config;
		let path = config.database_path.clone();
		let busy_timeout = Duration::from_millis(config.db_busy_timeout_ms);

		let writer = connect(&path, busy_timeout)?;
		schema::bootstrap(&writer)?;

		info!(path = %path.display(), "Opened database");

		Ok(Arc::new(Self {
			path,
			busy_timeout,
			writer: Mutex::new(writer),
			readers: Mutex::new(Vec::new()),
			pool_size: config.db_read_connections.max(1),
		}))
	}

	/// Run a closure on the writer connection. Serialization of writers is
	/// the persistence actor's job; this lock only keeps the engine Sync.
	pub fn with_write<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
		let mut conn = self.writer.lock()?;
		f(&mut conn)
	}

	/// Run a closure on a pooled read connection. Readers never block the
	/// writer under WAL; a missing pool slot opens a fresh connection.
	pub fn with_read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
		let conn = self.checkout()?;
		let ret = f(&conn);
		self.checkin(conn);
		ret
	}

	fn checkout(&self) -> Result<Connection> {
		if let Some(conn) = self.readers.lock()?.pop() {
			return Ok(conn);
		}

		debug!(path = %self.path.display(), "Opening additional read connection");
		connect(&self.path, self.busy_timeout)
	}

	fn checkin(&self, conn: Connection) {
		if let Ok(mut pool) = self.readers.lock() {
			if pool.len() < self.pool_size {
				pool.push(conn);
			}
		}
	}
}

fn connect(path: &Path, busy_timeout: Duration) -> Result<Connection> {
	let conn = Connection::open(path).map_err(or_else)?;

	conn.busy_timeout(busy_timeout).map_err(or_else)?;
	conn.pragma_update(None, "journal_mode", "WAL")
		.map_err(or_else)?;
	conn.pragma_update(None, "synchronous", "NORMAL")
		.map_err(or_else)?;
	conn.pragma_update(None, "foreign_keys", "ON")
		.map_err(or_else)?;

	Ok(conn)
}

/// Map driver errors into the crate error. Queries that find nothing are a
/// NotFound rather than a store fault.
#[cold]
pub fn or_else(e: rusqlite::Error) -> Error {
	match e {
		| rusqlite::Error::QueryReturnedNoRows => err!(NotFound("no rows returned")),
		| _ => Error::Database(e.to_string().into()),
	}
}
