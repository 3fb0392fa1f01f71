use serde::{Deserialize, Serialize};

/// Authorization tier, per user globally and per membership. Ordered; a
/// higher role implies every lower one.
#[derive(
	Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	#[default]
	Guest,
	Member,
	Moderator,
	Owner,
}

impl Role {
	#[must_use]
	pub fn parse(role: &str) -> Self {
		match role {
			| "member" => Self::Member,
			| "moderator" => Self::Moderator,
			| "owner" => Self::Owner,
			| _ => Self::Guest,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			| Self::Guest => "guest",
			| Self::Member => "member",
			| Self::Moderator => "moderator",
			| Self::Owner => "owner",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::Role;

	#[test]
	fn ordering() {
		assert!(Role::Guest < Role::Member);
		assert!(Role::Member < Role::Moderator);
		assert!(Role::Moderator < Role::Owner);
	}

	#[test]
	fn round_trips_storage_form() {
		for role in [Role::Guest, Role::Member, Role::Moderator, Role::Owner] {
			assert_eq!(Role::parse(role.as_str()), role);
		}
	}

	#[test]
	fn unknown_is_guest() {
		assert_eq!(Role::parse("sudo"), Role::Guest);
	}
}
