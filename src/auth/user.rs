//! Local user model owned by the storage layer.

// self
use crate::{_prelude::*, auth::Username};

/// Numeric primary key of a local user.
pub type UserId = u64;

/// Persisted local identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Primary key.
	pub id: UserId,
	/// Unique login name.
	pub username: Username,
	/// Email address; empty when the provider did not share one.
	pub email: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Inactive users cannot log in through a social backend.
	pub is_active: bool,
	/// Creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub date_joined: OffsetDateTime,
}

/// Profile data for a user that does not exist yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
	/// Unique login name chosen by the completion pipeline.
	pub username: Username,
	/// Email address.
	pub email: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
}
