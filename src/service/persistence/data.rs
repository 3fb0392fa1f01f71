use rusqlite::{Connection, params};
use scrawl_core::{
	Result,
	board::{DomObject, Event, Role, Transform},
};
use scrawl_database::or_else;

pub(super) fn insert_event(conn: &mut Connection, event: &Event) -> Result {
	conn.prepare_cached(
		"INSERT INTO events
			(id, room_id, user_id, entity_id, op, payload, layer, created_at)
			VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
	)
	.map_err(or_else)?
	.execute(params![
		event.id,
		event.room_id,
		event.user_id,
		event.entity_id,
		event.op,
		event.payload,
		event.layer,
		event.created_at,
	])
	.map_err(or_else)?;

	Ok(())
}

pub(super) fn dom_create(
	conn: &mut Connection,
	room_id: &str,
	user_id: &str,
	dom: &DomObject,
	created_at: i64,
) -> Result {
	conn.prepare_cached(
		"INSERT INTO dom_objects
			(id, room_id, user_id, kind, x, y, rot, w, h, layer, payload,
			 is_removed, created_at, updated_at)
			VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?12)
			ON CONFLICT (id) DO NOTHING",
	)
	.map_err(or_else)?
	.execute(params![
		dom.id,
		room_id,
		user_id,
		dom.kind,
		dom.transform.x,
		dom.transform.y,
		dom.transform.rot,
		dom.transform.w,
		dom.transform.h,
		dom.layer_index,
		dom.payload,
		created_at,
	])
	.map_err(or_else)?;

	Ok(())
}

/// Tombstoned rows are left untouched; a transform never resurrects one.
pub(super) fn dom_transform(
	conn: &mut Connection,
	room_id: &str,
	dom_id: &str,
	transform: &Transform,
	updated_at: i64,
) -> Result {
	conn.prepare_cached(
		"UPDATE dom_objects
			SET x = ?1, y = ?2, rot = ?3, w = ?4, h = ?5, updated_at = ?6
			WHERE id = ?7 AND room_id = ?8 AND is_removed = 0",
	)
	.map_err(or_else)?
	.execute(params![
		transform.x,
		transform.y,
		transform.rot,
		transform.w,
		transform.h,
		updated_at,
		dom_id,
		room_id,
	])
	.map_err(or_else)?;

	Ok(())
}

pub(super) fn dom_payload(
	conn: &mut Connection,
	room_id: &str,
	dom_id: &str,
	payload: &str,
	updated_at: i64,
) -> Result {
	conn.prepare_cached(
		"UPDATE dom_objects
			SET payload = ?1, updated_at = ?2
			WHERE id = ?3 AND room_id = ?4 AND is_removed = 0",
	)
	.map_err(or_else)?
	.execute(params![payload, updated_at, dom_id, room_id])
	.map_err(or_else)?;

	Ok(())
}

/// Idempotent: re-tombstoning a tombstoned row changes nothing.
pub(super) fn dom_remove(
	conn: &mut Connection,
	room_id: &str,
	dom_id: &str,
	updated_at: i64,
) -> Result {
	conn.prepare_cached(
		"UPDATE dom_objects
			SET is_removed = 1, updated_at = ?1
			WHERE id = ?2 AND room_id = ?3 AND is_removed = 0",
	)
	.map_err(or_else)?
	.execute(params![updated_at, dom_id, room_id])
	.map_err(or_else)?;

	Ok(())
}

/// Room row, owner membership and the public base layer, all-or-nothing.
pub(super) fn room_create(
	conn: &mut Connection,
	room_id: &str,
	owner_id: &str,
	public: bool,
	created_at: i64,
) -> Result {
	let txn = conn.transaction().map_err(or_else)?;

	txn.execute(
		"INSERT INTO rooms (room_id, owner_id, public, created_at)
			VALUES (?1, ?2, ?3, ?4)
			ON CONFLICT (room_id) DO NOTHING",
		params![room_id, owner_id, public, created_at],
	)
	.map_err(or_else)?;

	txn.execute(
		"INSERT INTO users_rooms (user_id, room_id, role, joined_at)
			VALUES (?1, ?2, ?3, ?4)
			ON CONFLICT (user_id, room_id) DO UPDATE SET role = excluded.role",
		params![owner_id, room_id, Role::Owner.as_str(), created_at],
	)
	.map_err(or_else)?;

	txn.execute(
		"INSERT INTO layers (room_id, layer_index, owner_id, name, public, created_at)
			VALUES (?1, 0, ?2, 'Base Layer', 1, ?3)
			ON CONFLICT (room_id, layer_index) DO NOTHING",
		params![room_id, owner_id, created_at],
	)
	.map_err(or_else)?;

	txn.commit().map_err(or_else)
}

pub(super) fn room_edit_user(
	conn: &mut Connection,
	room_id: &str,
	user_id: &str,
	role: Role,
	joined_at: i64,
) -> Result {
	conn.prepare_cached(
		"INSERT INTO users_rooms (user_id, room_id, role, joined_at)
			VALUES (?1, ?2, ?3, ?4)
			ON CONFLICT (user_id, room_id) DO UPDATE SET role = excluded.role",
	)
	.map_err(or_else)?
	.execute(params![user_id, room_id, role.as_str(), joined_at])
	.map_err(or_else)?;

	Ok(())
}

/// Profile fields follow the IdP on re-login; the stored role does not.
pub(super) fn user_upsert(
	conn: &mut Connection,
	user_id: &str,
	name: &str,
	given_name: &str,
	email: &str,
	created_at: i64,
) -> Result {
	conn.prepare_cached(
		"INSERT INTO users_data (user_id, role, name, given_name, email, created_at)
			VALUES (?1, 'guest', ?2, ?3, ?4, ?5)
			ON CONFLICT (user_id) DO UPDATE SET
				name = excluded.name,
				given_name = excluded.given_name,
				email = excluded.email",
	)
	.map_err(or_else)?
	.execute(params![user_id, name, given_name, email, created_at])
	.map_err(or_else)?;

	Ok(())
}

/// Assign the next free index, insert the layer and grant the owner's ACL in
/// one transaction. Returns the assigned index.
pub(super) fn layer_create(
	conn: &mut Connection,
	room_id: &str,
	owner_id: &str,
	name: &str,
	public: bool,
	created_at: i64,
) -> Result<i64> {
	let txn = conn.transaction().map_err(or_else)?;

	let index: i64 = txn
		.query_row(
			"SELECT COALESCE(MAX(layer_index), 0) + 1 FROM layers WHERE room_id = ?1",
			params![room_id],
			|row| row.get(0),
		)
		.map_err(or_else)?;

	txn.execute(
		"INSERT INTO layers (room_id, layer_index, owner_id, name, public, created_at)
			VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
		params![room_id, index, owner_id, name, public, created_at],
	)
	.map_err(or_else)?;

	txn.execute(
		"INSERT INTO users_layers (room_id, layer_index, user_id)
			VALUES (?1, ?2, ?3)",
		params![room_id, index, owner_id],
	)
	.map_err(or_else)?;

	txn.commit().map_err(or_else)?;
	Ok(index)
}
