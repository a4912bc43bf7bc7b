//! Session cookie login.

// crates.io
use cookie::{Cookie, SameSite};
// self
use crate::{
	backend::{AttachedBackend, BackendFuture, CompletedLogin},
	obs::ViewKind,
	serializers::OutputSerializer,
	views::{LoginEffect, SocialAuthView},
};

/// Logs the user in with a session cookie and answers with the user fields.
///
/// `POST` is CSRF protected: the CSRF cookie must be echoed in the CSRF header.
#[derive(Clone, Copy, Debug, Default)]
pub struct SocialSessionAuthView;
impl SocialAuthView for SocialSessionAuthView {
	fn kind(&self) -> ViewKind {
		ViewKind::Session
	}

	fn name(&self) -> &'static str {
		"Social Session Auth"
	}

	fn serializer(&self) -> OutputSerializer {
		OutputSerializer::User
	}

	fn enforce_csrf(&self) -> bool {
		true
	}

	fn do_login<'a>(
		&'a self,
		attached: &'a AttachedBackend,
		login: &'a CompletedLogin,
	) -> BackendFuture<'a, LoginEffect> {
		Box::pin(async move {
			let strategy = attached.strategy();
			let session = strategy.storage().login(&login.user, &login.social_user).await?;
			let cookie = Cookie::build((
				strategy.settings().session_cookie_name.clone(),
				session.key.expose().to_owned(),
			))
			.path("/")
			.http_only(true)
			.same_site(SameSite::Lax)
			.build();

			tracing::debug!(user_id = login.user.id, backend = %session.backend, "session started");

			Ok(LoginEffect { cookies: vec![cookie] })
		})
	}
}
