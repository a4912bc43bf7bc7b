//! Storage contracts for users, social associations, API tokens, and sessions.

pub mod memory;

pub use memory::MemoryStorage;

// self
use crate::{
	_prelude::*,
	auth::{AuthToken, NewUser, Secret, SocialUser, User, UserId},
};

/// Boxed future returned by every [`SocialStorage`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract the strategy binds to the social backends.
///
/// The contract mirrors what a host framework's user model, authtoken table, and session
/// store provide; implementations must be safe to share across concurrent requests.
pub trait SocialStorage
where
	Self: Send + Sync,
{
	/// Fetches a user by primary key.
	fn user(&self, id: UserId) -> StoreFuture<'_, Option<User>>;

	/// Returns true when `username` is already taken.
	fn username_exists<'a>(&'a self, username: &'a str) -> StoreFuture<'a, bool>;

	/// Persists a new active user.
	///
	/// Fails with [`StoreError::Conflict`] when the username is taken.
	fn create_user(&self, user: NewUser) -> StoreFuture<'_, User>;

	/// Removes a user together with its tokens and sessions.
	fn delete_user(&self, id: UserId) -> StoreFuture<'_, ()>;

	/// Looks up the association for a provider account.
	fn social_user<'a>(&'a self, provider: &'a str, uid: &'a str)
	-> StoreFuture<'a, Option<SocialUser>>;

	/// Links a provider account to `user`.
	///
	/// Fails with [`StoreError::Conflict`] when the account is already linked.
	fn create_social_user<'a>(
		&'a self,
		user: &'a User,
		provider: &'a str,
		uid: &'a str,
		extra_data: JsonMap<String, JsonValue>,
	) -> StoreFuture<'a, SocialUser>;

	/// Replaces the stored provider payload of an association.
	fn update_extra_data(
		&self,
		social_id: u64,
		extra_data: JsonMap<String, JsonValue>,
	) -> StoreFuture<'_, SocialUser>;

	/// Returns the user's API token, issuing one on first use.
	fn get_or_create_token<'a>(&'a self, user: &'a User) -> StoreFuture<'a, AuthToken>;

	/// Resolves the owner of an API token key.
	fn token_user<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<User>>;

	/// Starts a session for `user`, remembering the backend that authenticated it.
	fn login<'a>(&'a self, user: &'a User, social: &'a SocialUser) -> StoreFuture<'a, Session>;

	/// Resolves the user bound to a session key.
	fn session_user<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<User>>;
}

/// Authenticated session created by [`SocialStorage::login`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
	/// Cookie value.
	pub key: Secret,
	/// Logged-in user.
	pub user_id: UserId,
	/// Backend recorded for the login (`social_auth_last_login_backend`).
	pub backend: String,
}

/// Error type produced by [`SocialStorage`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A uniqueness constraint rejected the write.
	#[error("Conflict: {message}.")]
	Conflict {
		/// Human-readable error payload.
		message: String,
	},
	/// A referenced row does not exist.
	#[error("Missing record: {message}.")]
	Missing {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("database unreachable"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
