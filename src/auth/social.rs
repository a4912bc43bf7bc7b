//! Association between a provider account and a local user.

// self
use crate::{
	_prelude::*,
	auth::{BackendName, UserId},
};

/// Persisted `(provider, uid) -> user` link plus the provider's token payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SocialUser {
	/// Primary key.
	pub id: u64,
	/// Local user that owns the provider account.
	pub user_id: UserId,
	/// Backend that authenticated the account.
	pub provider: BackendName,
	/// Provider-side account identifier.
	pub uid: String,
	/// Provider token payload (access token, expiry, ...), refreshed on every login.
	pub extra_data: JsonMap<String, JsonValue>,
}
impl SocialUser {
	/// Access token captured at the most recent login, if the backend stored one.
	pub fn access_token(&self) -> Option<&str> {
		self.extra_data.get("access_token").and_then(JsonValue::as_str)
	}
}
