//! Strongly typed identifiers enforced across the social auth domain.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $max:expr, $allowed:expr) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view, $max, $allowed)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value, $max, $allowed)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (backend, username).
		kind: &'static str,
	},
	/// The identifier contains a character outside the allowed set.
	#[error("{kind} identifier contains the invalid character {character:?}.")]
	InvalidCharacter {
		/// Kind of identifier (backend, username).
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (backend, username).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { BackendName, "Name of a social backend as it appears in the URL.", "Backend", 64, is_backend_char }
def_id! { Username, "Login name of a local user.", "Username", 150, is_username_char }

fn is_backend_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_username_char(c: char) -> bool {
	c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

fn validate_view(
	kind: &'static str,
	view: &str,
	max: usize,
	allowed: fn(char) -> bool,
) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if let Some(character) = view.chars().find(|c| !allowed(*c)) {
		return Err(IdentifierError::InvalidCharacter { kind, character });
	}
	if view.chars().count() > max {
		return Err(IdentifierError::TooLong { kind, max });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn backend_names_follow_url_charset() {
		assert!(BackendName::new("facebook").is_ok());
		assert!(BackendName::new("google-oauth2").is_ok());
		assert_eq!(BackendName::new("").unwrap_err(), IdentifierError::Empty { kind: "Backend" });
		assert!(matches!(
			BackendName::new("face book"),
			Err(IdentifierError::InvalidCharacter { character: ' ', .. })
		));
		assert!(matches!(
			BackendName::new("x".repeat(65)),
			Err(IdentifierError::TooLong { max: 64, .. })
		));
	}

	#[test]
	fn usernames_accept_email_like_values() {
		let username = Username::new("john.doe+social@example.com")
			.expect("Email-like usernames should be accepted.");

		assert_eq!(format!("{username:?}"), "Username(john.doe+social@example.com)");
		assert!(Username::new("john doe").is_err());
	}

	#[test]
	fn identifiers_round_trip_through_serde() {
		let name: BackendName =
			serde_json::from_str("\"twitter\"").expect("Backend name should deserialize.");

		assert_eq!(&*name, "twitter");
		assert!(serde_json::from_str::<BackendName>("\"bad name\"").is_err());
	}
}
