//! Completion pipeline: maps a provider identity onto a local user.
//!
//! Steps, in order: look the social account up, refuse it when it belongs to a different
//! authenticated user, pick or create the local user, create or refresh the association,
//! and reject inactive users.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	auth::{BackendName, NewUser, SocialUser, User, Username},
	backend::{ProviderIdentity, UserDetails},
	error::AuthError,
	store::{SocialStorage, StoreError},
};

const USERNAME_MAX_LENGTH: usize = 150;
const USERNAME_SUFFIX_BYTES: usize = 8;
const USERNAME_ATTEMPTS: usize = 8;

/// Result of a completed social login.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedLogin {
	/// Local user the provider account resolved to.
	pub user: User,
	/// Association used for this login, with refreshed extra data.
	pub social_user: SocialUser,
	/// True when the user was created by this login.
	pub is_new: bool,
}

pub(crate) async fn run(
	storage: &dyn SocialStorage,
	backend: &BackendName,
	identity: ProviderIdentity,
	current: Option<User>,
) -> Result<CompletedLogin> {
	let ProviderIdentity { uid, details, extra_data } = identity;
	let existing = storage.social_user(backend, &uid).await?;

	let (user, social_user, is_new) = match existing {
		Some(social) => {
			let (user, social) = resume(storage, backend, social, current, extra_data).await?;

			(user, social, false)
		},
		None => {
			let (user, is_new) = match current {
				Some(current) => (current, false),
				None => (create_user(storage, &details, &uid).await?, true),
			};

			match storage.create_social_user(&user, backend, &uid, extra_data.clone()).await {
				Ok(social) => {
					tracing::debug!(backend = %backend, user_id = user.id, "social account linked");

					(user, social, is_new)
				},
				// A concurrent login linked the account between the lookup and the insert.
				Err(StoreError::Conflict { .. }) => {
					let social = storage.social_user(backend, &uid).await?.ok_or_else(|| {
						StoreError::Missing { message: format!("{backend} account {uid}") }
					})?;
					let current = if is_new {
						storage.delete_user(user.id).await?;

						None
					} else {
						Some(user)
					};
					let (user, social) = resume(storage, backend, social, current, extra_data).await?;

					tracing::debug!(
						backend = %backend,
						user_id = user.id,
						"social account was linked by a concurrent login"
					);

					(user, social, false)
				},
				Err(e) => return Err(e.into()),
			}
		},
	};

	if !user.is_active {
		return Err(AuthError::Forbidden.into());
	}

	Ok(CompletedLogin { user, social_user, is_new })
}

// Continues with an existing association, refusing it when it belongs to someone else.
async fn resume(
	storage: &dyn SocialStorage,
	backend: &BackendName,
	social: SocialUser,
	current: Option<User>,
	extra_data: JsonMap<String, JsonValue>,
) -> Result<(User, SocialUser)> {
	let user = match current {
		Some(current) if current.id != social.user_id =>
			return Err(AuthError::AlreadyAssociated { backend: backend.to_string() }.into()),
		Some(current) => current,
		None => storage.user(social.user_id).await?.ok_or_else(|| StoreError::Missing {
			message: format!("user {} linked to {backend} account {}", social.user_id, social.uid),
		})?,
	};
	let social = storage.update_extra_data(social.id, extra_data).await?;

	Ok((user, social))
}

// Tries the derived username, then suffixed variants; a candidate taken between the existence
// check and the insert moves on to the next one.
async fn create_user(storage: &dyn SocialStorage, details: &UserDetails, uid: &str) -> Result<User> {
	let base = username_base(details, uid);
	let (first_name, last_name) = split_names(details);

	for attempt in 0..=USERNAME_ATTEMPTS {
		let candidate = if attempt == 0 { base.clone() } else { with_suffix(&base) };

		if storage.username_exists(&candidate).await? {
			continue;
		}

		let new_user = NewUser {
			username: to_username(&candidate)?,
			email: details.email.clone().unwrap_or_default(),
			first_name: first_name.clone(),
			last_name: last_name.clone(),
		};

		match storage.create_user(new_user).await {
			Ok(user) => return Ok(user),
			Err(StoreError::Conflict { .. }) => continue,
			Err(e) => return Err(e.into()),
		}
	}

	Err(StoreError::Conflict { message: format!("no free username derived from `{base}`") }.into())
}

fn username_base(details: &UserDetails, uid: &str) -> String {
	let email_local = details.email.as_deref().and_then(|email| email.split('@').next());
	let raw = [details.username.as_deref(), email_local, Some(uid)]
		.into_iter()
		.flatten()
		.map(clean_username)
		.find(|candidate| !candidate.is_empty())
		.unwrap_or_else(|| "user".into());

	raw.chars().take(USERNAME_MAX_LENGTH).collect()
}

fn clean_username(raw: &str) -> String {
	raw.trim()
		.chars()
		.filter(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
		.collect()
}

fn with_suffix(base: &str) -> String {
	let bytes: [u8; USERNAME_SUFFIX_BYTES] = rand::rng().random();
	let suffix = bytes.iter().map(|byte| format!("{byte:02x}")).collect::<String>();
	let keep = USERNAME_MAX_LENGTH - suffix.len();

	base.chars().take(keep).chain(suffix.chars()).collect()
}

fn to_username(value: &str) -> Result<Username> {
	Username::new(value).map_err(|e| {
		AuthError::Failed { reason: format!("provider username is unusable: {e}") }.into()
	})
}

fn split_names(details: &UserDetails) -> (String, String) {
	match (&details.first_name, &details.last_name, &details.fullname) {
		(None, None, Some(fullname)) => match fullname.trim().split_once(' ') {
			Some((first, last)) => (first.to_owned(), last.trim().to_owned()),
			None => (fullname.trim().to_owned(), String::new()),
		},
		(first, last, _) => (first.clone().unwrap_or_default(), last.clone().unwrap_or_default()),
	}
}
