//! API token and session key wrappers that redact sensitive material.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, auth::UserId};

const TOKEN_KEY_BYTES: usize = 20;
const SESSION_KEY_LEN: usize = 32;

/// Redacted secret wrapper keeping key material out of logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Bearer token issued to a user, one per user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
	/// 40 lowercase hex characters.
	pub key: Secret,
	/// Owner of the token.
	pub user_id: UserId,
	/// Issue instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created: OffsetDateTime,
}
impl AuthToken {
	/// Issues a fresh token for `user_id`.
	pub fn generate(user_id: UserId) -> Self {
		let bytes: [u8; TOKEN_KEY_BYTES] = rand::rng().random();
		let key = bytes.iter().map(|byte| format!("{byte:02x}")).collect::<String>();

		Self { key: Secret::new(key), user_id, created: OffsetDateTime::now_utc() }
	}
}

/// Generates a session key suitable for the session cookie.
pub fn generate_session_key() -> Secret {
	let key = rand::rng()
		.sample_iter(Alphanumeric)
		.take(SESSION_KEY_LEN)
		.map(|byte| char::from(byte).to_ascii_lowercase())
		.collect::<String>();

	Secret::new(key)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = Secret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "Secret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn generated_token_keys_are_hex() {
		let token = AuthToken::generate(7);

		assert_eq!(token.key.expose().len(), 40);
		assert!(token.key.expose().chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
		assert_eq!(token.user_id, 7);
		assert_ne!(AuthToken::generate(7).key, token.key);
	}

	#[test]
	fn session_keys_are_lowercase_alphanumeric() {
		let key = generate_session_key();

		assert_eq!(key.expose().len(), 32);
		assert!(key.expose().chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
	}
}
