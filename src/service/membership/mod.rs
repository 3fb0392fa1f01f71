mod data;

use std::sync::Arc;

use scrawl_core::{Err, Result, board::Role, debug_info};

use self::data::Data;
use crate::{OnceServices, service};

/// Room membership, roles and layer ACLs. First-touch authorization
/// performs the writes it needs (membership upsert, possibly room
/// creation); all of them are idempotent upserts so concurrent first-joins
/// of the same user converge.
pub struct Service {
	services: Arc<OnceServices>,
	db: Data,
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			services: args.services.clone(),
			db: Data::new(args.db),
		}))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	/// Authorization on first room touch. Existing members keep their role;
	/// global moderators own (and if needed create) the room; everyone else
	/// is admitted as a member only where viewing is permitted.
	pub async fn ensure_user_in_room(&self, room_id: &str, user_id: &str) -> Result<Role> {
		if let Some(role) = self.db.membership_role(room_id, user_id).await? {
			return Ok(role);
		}

		let global = self.services.users().global_role(user_id).await?;
		if global >= Role::Moderator {
			if self.db.room_exists(room_id).await? {
				self.services
					.persistence()
					.room_edit_user(room_id, user_id, Role::Owner);
			} else {
				debug_info!(room_id, user_id, "creating room on first touch");
				self.services
					.persistence()
					.room_create(room_id, user_id, false);
			}

			return Ok(Role::Owner);
		}

		if self.can_view(room_id, user_id).await? {
			self.services
				.persistence()
				.room_edit_user(room_id, user_id, Role::Member);
			return Ok(Role::Member);
		}

		Err!(Forbidden("no access to room {room_id}"))
	}

	/// Whether the user may see the room at all without being a member.
	pub async fn can_view(&self, room_id: &str, _user_id: &str) -> Result<bool> {
		self.db.room_public(room_id).await
	}

	/// Layer ACL gate: public layers, the layer's owner, and users granted
	/// an ACL row may use it. A missing layer denies.
	pub async fn check_can_use_layer(
		&self,
		room_id: &str,
		index: i64,
		user_id: &str,
	) -> Result<bool> {
		let Some((owner_id, public)) = self.db.layer_record(room_id, index).await? else {
			return Ok(false);
		};

		if public || owner_id == user_id {
			return Ok(true);
		}

		self.db.layer_acl_exists(room_id, index, user_id).await
	}

	/// The user's existing private layer in this room, if any.
	pub async fn private_layer_for(&self, room_id: &str, user_id: &str) -> Result<Option<i64>> {
		self.db.private_layer_for(room_id, user_id).await
	}

	/// Create a private layer through the persistence actor and wait for
	/// its assigned index.
	pub async fn create_private_layer(&self, room_id: &str, user_id: &str) -> Result<i64> {
		let name = format!("{user_id}'s layer");
		let index = self
			.services
			.persistence()
			.layer_create(room_id, user_id, &name, false)
			.await?;

		debug_info!(room_id, user_id, index, "created private layer");
		Ok(index)
	}

	pub async fn membership_role(&self, room_id: &str, user_id: &str) -> Result<Option<Role>> {
		self.db.membership_role(room_id, user_id).await
	}

	/// Member list with roles, for the users surface.
	pub async fn room_members(&self, room_id: &str) -> Result<Vec<(String, Role)>> {
		self.db.room_members(room_id).await
	}
}
