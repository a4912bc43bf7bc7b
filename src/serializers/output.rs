//! Output serializers: the response body of a successful login.

// self
use crate::{_prelude::*, auth::User, error::ConfigError, store::SocialStorage};

/// Response shape produced by a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputSerializer {
	/// User fields.
	User,
	/// `{"token": ...}` only.
	Token,
	/// User fields plus `token`.
	UserToken,
}
impl OutputSerializer {
	/// Renders `user`, issuing the API token when the shape needs one.
	pub async fn serialize(self, storage: &dyn SocialStorage, user: &User) -> Result<JsonValue> {
		let value = match self {
			Self::User => serde_json::to_value(UserPayload::from(user)),
			Self::Token => {
				let token = storage.get_or_create_token(user).await?;

				serde_json::to_value(TokenPayload { token: token.key.expose() })
			},
			Self::UserToken => {
				let token = storage.get_or_create_token(user).await?;

				serde_json::to_value(UserTokenPayload {
					user: UserPayload::from(user),
					token: token.key.expose(),
				})
			},
		}
		.map_err(ConfigError::from)?;

		Ok(value)
	}
}

#[derive(Serialize)]
struct UserPayload<'a> {
	id: u64,
	username: &'a str,
	email: &'a str,
	first_name: &'a str,
	last_name: &'a str,
}
impl<'a> From<&'a User> for UserPayload<'a> {
	fn from(user: &'a User) -> Self {
		Self {
			id: user.id,
			username: &user.username,
			email: &user.email,
			first_name: &user.first_name,
			last_name: &user.last_name,
		}
	}
}

#[derive(Serialize)]
struct TokenPayload<'a> {
	token: &'a str,
}

#[derive(Serialize)]
struct UserTokenPayload<'a> {
	#[serde(flatten)]
	user: UserPayload<'a>,
	token: &'a str,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::{NewUser, Username},
		store::MemoryStorage,
	};

	async fn user(storage: &MemoryStorage) -> User {
		storage
			.create_user(NewUser {
				username: Username::new("ada").expect("Username should be valid."),
				email: "ada@example.com".into(),
				first_name: "Ada".into(),
				last_name: "Lovelace".into(),
			})
			.await
			.expect("User should be created.")
	}

	#[tokio::test]
	async fn shapes_match_their_views() {
		let storage = MemoryStorage::default();
		let user = user(&storage).await;
		let plain =
			OutputSerializer::User.serialize(&storage, &user).await.expect("User should render.");

		assert_eq!(
			plain,
			serde_json::json!({
				"id": user.id,
				"username": "ada",
				"email": "ada@example.com",
				"first_name": "Ada",
				"last_name": "Lovelace"
			})
		);

		let token =
			OutputSerializer::Token.serialize(&storage, &user).await.expect("Token should render.");
		let object = token.as_object().expect("Token payload should be an object.");

		assert_eq!(object.len(), 1);
		assert_eq!(object["token"].as_str().map(str::len), Some(40));

		let both = OutputSerializer::UserToken
			.serialize(&storage, &user)
			.await
			.expect("User and token should render.");

		assert_eq!(both["email"], "ada@example.com");
		assert_eq!(both["token"], object["token"]);
	}
}
