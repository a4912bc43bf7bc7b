//! Thread-safe in-memory [`SocialStorage`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{
		AuthToken, BackendName, NewUser, SocialUser, User, UserId, generate_session_key,
	},
	store::{Session, SocialStorage, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<Tables>>;

#[derive(Debug, Default)]
struct Tables {
	users: BTreeMap<UserId, User>,
	social_users: BTreeMap<u64, SocialUser>,
	tokens: HashMap<String, AuthToken>,
	sessions: HashMap<String, Session>,
	next_user_id: UserId,
	next_social_id: u64,
}

/// Storage backend that keeps every table in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(StoreMap);
impl MemoryStorage {
	/// Snapshot of every stored user, ordered by id.
	pub fn users(&self) -> Vec<User> {
		self.0.read().users.values().cloned().collect()
	}

	/// Finds a stored user by email.
	pub fn user_by_email(&self, email: &str) -> Option<User> {
		self.0.read().users.values().find(|user| user.email == email).cloned()
	}

	/// Snapshot of every social association.
	pub fn social_users(&self) -> Vec<SocialUser> {
		self.0.read().social_users.values().cloned().collect()
	}

	/// Snapshot of every live session.
	pub fn sessions(&self) -> Vec<Session> {
		self.0.read().sessions.values().cloned().collect()
	}

	/// Flips the active flag of a stored user.
	pub fn set_active(&self, id: UserId, active: bool) {
		if let Some(user) = self.0.write().users.get_mut(&id) {
			user.is_active = active;
		}
	}

	fn create_user_now(map: StoreMap, new_user: NewUser) -> Result<User, StoreError> {
		let mut guard = map.write();

		if guard.users.values().any(|user| user.username == new_user.username) {
			return Err(StoreError::Conflict {
				message: format!("username `{}` already exists", new_user.username),
			});
		}

		guard.next_user_id += 1;

		let user = User {
			id: guard.next_user_id,
			username: new_user.username,
			email: new_user.email,
			first_name: new_user.first_name,
			last_name: new_user.last_name,
			is_active: true,
			date_joined: OffsetDateTime::now_utc(),
		};

		guard.users.insert(user.id, user.clone());

		Ok(user)
	}

	fn create_social_user_now(
		map: StoreMap,
		user_id: UserId,
		provider: &str,
		uid: &str,
		extra_data: JsonMap<String, JsonValue>,
	) -> Result<SocialUser, StoreError> {
		let provider = BackendName::new(provider)
			.map_err(|e| StoreError::Backend { message: e.to_string() })?;
		let mut guard = map.write();

		if !guard.users.contains_key(&user_id) {
			return Err(StoreError::Missing { message: format!("user {user_id}") });
		}
		if guard.social_users.values().any(|social| social.provider == provider && social.uid == uid)
		{
			return Err(StoreError::Conflict {
				message: format!("{provider} account {uid} is already linked"),
			});
		}

		guard.next_social_id += 1;

		let social = SocialUser {
			id: guard.next_social_id,
			user_id,
			provider,
			uid: uid.to_owned(),
			extra_data,
		};

		guard.social_users.insert(social.id, social.clone());

		Ok(social)
	}

	fn update_extra_data_now(
		map: StoreMap,
		social_id: u64,
		extra_data: JsonMap<String, JsonValue>,
	) -> Result<SocialUser, StoreError> {
		let mut guard = map.write();
		let social = guard
			.social_users
			.get_mut(&social_id)
			.ok_or_else(|| StoreError::Missing { message: format!("social user {social_id}") })?;

		social.extra_data = extra_data;

		Ok(social.clone())
	}

	fn get_or_create_token_now(map: StoreMap, user_id: UserId) -> AuthToken {
		let mut guard = map.write();

		if let Some(token) = guard.tokens.values().find(|token| token.user_id == user_id) {
			return token.clone();
		}

		let token = AuthToken::generate(user_id);

		guard.tokens.insert(token.key.expose().to_owned(), token.clone());

		token
	}

	fn login_now(map: StoreMap, user_id: UserId, backend: String) -> Session {
		let session = Session { key: generate_session_key(), user_id, backend };

		map.write().sessions.insert(session.key.expose().to_owned(), session.clone());

		session
	}
}
impl SocialStorage for MemoryStorage {
	fn user(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().users.get(&id).cloned()) })
	}

	fn username_exists<'a>(&'a self, username: &'a str) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(map.read().users.values().any(|user| &*user.username == username))
		})
	}

	fn create_user(&self, user: NewUser) -> StoreFuture<'_, User> {
		let map = self.0.clone();

		Box::pin(async move { Self::create_user_now(map, user) })
	}

	fn delete_user(&self, id: UserId) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			let mut guard = map.write();

			guard.users.remove(&id);
			guard.tokens.retain(|_, token| token.user_id != id);
			guard.sessions.retain(|_, session| session.user_id != id);

			Ok(())
		})
	}

	fn social_user<'a>(
		&'a self,
		provider: &'a str,
		uid: &'a str,
	) -> StoreFuture<'a, Option<SocialUser>> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(map
				.read()
				.social_users
				.values()
				.find(|social| &*social.provider == provider && social.uid == uid)
				.cloned())
		})
	}

	fn create_social_user<'a>(
		&'a self,
		user: &'a User,
		provider: &'a str,
		uid: &'a str,
		extra_data: JsonMap<String, JsonValue>,
	) -> StoreFuture<'a, SocialUser> {
		let map = self.0.clone();

		Box::pin(async move { Self::create_social_user_now(map, user.id, provider, uid, extra_data) })
	}

	fn update_extra_data(
		&self,
		social_id: u64,
		extra_data: JsonMap<String, JsonValue>,
	) -> StoreFuture<'_, SocialUser> {
		let map = self.0.clone();

		Box::pin(async move { Self::update_extra_data_now(map, social_id, extra_data) })
	}

	fn get_or_create_token<'a>(&'a self, user: &'a User) -> StoreFuture<'a, AuthToken> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_or_create_token_now(map, user.id)) })
	}

	fn token_user<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<User>> {
		let map = self.0.clone();

		Box::pin(async move {
			let guard = map.read();
			let user =
				guard.tokens.get(key).and_then(|token| guard.users.get(&token.user_id)).cloned();

			Ok(user)
		})
	}

	fn login<'a>(&'a self, user: &'a User, social: &'a SocialUser) -> StoreFuture<'a, Session> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::login_now(map, user.id, social.provider.to_string())) })
	}

	fn session_user<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<User>> {
		let map = self.0.clone();

		Box::pin(async move {
			let guard = map.read();
			let user =
				guard.sessions.get(key).and_then(|session| guard.users.get(&session.user_id)).cloned();

			Ok(user)
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::Username;

	fn new_user(username: &str) -> NewUser {
		NewUser {
			username: Username::new(username).expect("Username fixture should be valid."),
			email: format!("{username}@example.com"),
			first_name: String::new(),
			last_name: String::new(),
		}
	}

	#[tokio::test]
	async fn usernames_are_unique() {
		let store = MemoryStorage::default();

		store.create_user(new_user("alice")).await.expect("First user should be created.");

		let err = store
			.create_user(new_user("alice"))
			.await
			.expect_err("Duplicate usernames should be rejected.");

		assert!(matches!(err, StoreError::Conflict { .. }));
		assert!(store.username_exists("alice").await.expect("Lookup should succeed."));
	}

	#[tokio::test]
	async fn tokens_are_issued_once_per_user() {
		let store = MemoryStorage::default();
		let user = store.create_user(new_user("bob")).await.expect("User should be created.");
		let first = store.get_or_create_token(&user).await.expect("Token should be issued.");
		let second = store.get_or_create_token(&user).await.expect("Token should be reused.");

		assert_eq!(first.key, second.key);

		let owner = store
			.token_user(first.key.expose())
			.await
			.expect("Token lookup should succeed.")
			.expect("Token should resolve to its owner.");

		assert_eq!(owner.id, user.id);
	}

	#[tokio::test]
	async fn sessions_resolve_to_their_user() {
		let store = MemoryStorage::default();
		let user = store.create_user(new_user("carol")).await.expect("User should be created.");
		let social = store
			.create_social_user(&user, "facebook", "123", JsonMap::new())
			.await
			.expect("Association should be created.");
		let session = store.login(&user, &social).await.expect("Login should succeed.");

		assert_eq!(session.backend, "facebook");

		let resolved = store
			.session_user(session.key.expose())
			.await
			.expect("Session lookup should succeed.")
			.expect("Session should resolve to its user.");

		assert_eq!(resolved.id, user.id);
		assert!(store.session_user("unknown").await.expect("Lookup should succeed.").is_none());
	}

	#[tokio::test]
	async fn social_accounts_link_once() {
		let store = MemoryStorage::default();
		let user = store.create_user(new_user("dave")).await.expect("User should be created.");

		store
			.create_social_user(&user, "twitter", "42", JsonMap::new())
			.await
			.expect("Association should be created.");

		let err = store
			.create_social_user(&user, "twitter", "42", JsonMap::new())
			.await
			.expect_err("Duplicate associations should be rejected.");

		assert!(matches!(err, StoreError::Conflict { .. }));
	}

	#[tokio::test]
	async fn deleted_users_take_their_credentials_along() {
		let store = MemoryStorage::default();
		let user = store.create_user(new_user("erin")).await.expect("User should be created.");
		let token = store.get_or_create_token(&user).await.expect("Token should be issued.");

		store.delete_user(user.id).await.expect("Deletion should succeed.");

		assert!(store.users().is_empty());
		assert!(store.token_user(token.key.expose()).await.expect("Lookup should succeed.").is_none());
		assert!(!store.username_exists("erin").await.expect("Lookup should succeed."));
	}
}
