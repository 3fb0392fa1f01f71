mod data;

use std::sync::Arc;

use scrawl_core::{Result, board::Role, utils::fnv1a32};

use self::data::Data;
use crate::{OnceServices, service};

/// User records and identity-derived presentation data.
pub struct Service {
	services: Arc<OnceServices>,
	db: Data,
}

/// One row of users_data.
#[derive(Clone, Debug, Default)]
pub struct UserRow {
	pub user_id: String,
	pub role: Role,
	pub name: String,
	pub given_name: String,
	pub email: String,
	pub created_at: i64,
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
	/// Deterministic presentation color: the user id hashes to an HSL hue,
	/// so every client renders the same user the same way with no
	/// coordination.
	#[must_use]
	pub fn color_for(user_id: &str) -> String {
		let hue = fnv1a32(user_id.as_bytes()) % 360;
		format!("hsl({hue}, 70%, 55%)")
	}

	/// Global authorization tier; unknown users are guests.
	pub async fn global_role(&self, user_id: &str) -> Result<Role> {
		Ok(self
			.db
			.profile(user_id)
			.await?
			.map(|row| row.role)
			.unwrap_or_default())
	}

	pub async fn profile(&self, user_id: &str) -> Result<Option<UserRow>> {
		self.db.profile(user_id).await
	}

	pub async fn by_email(&self, email: &str) -> Result<Option<String>> {
		self.db.by_email(email).await
	}

	/// Upsert the user row from verified identity data.
	pub fn upsert(&self, user_id: &str, name: &str, given_name: &str, email: &str) {
		self.services
			.persistence()
			.user_upsert(user_id, name, given_name, email);
	}
}

#[cfg(test)]
mod tests {
	use super::Service;

	#[test]
	fn color_is_deterministic_and_bounded() {
		let a = Service::color_for("user-a");
		assert_eq!(a, Service::color_for("user-a"));
		assert!(a.starts_with("hsl("));

		let hue: u32 = a
			.strip_prefix("hsl(")
			.and_then(|rest| rest.split(',').next())
			.and_then(|hue| hue.parse().ok())
			.unwrap();
		assert!(hue < 360);
	}

	#[test]
	fn different_users_usually_differ() {
		assert_ne!(Service::color_for("alice"), Service::color_for("bob"));
	}
}
