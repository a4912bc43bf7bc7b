//! Route tables binding the social login views to axum routers.

// crates.io
use axum::{
	Router,
	body::Bytes,
	extract::{Path, State},
	http::{HeaderMap, Uri},
	response::Response,
	routing::post,
};
// self
use crate::{
	_prelude::*,
	backend::BackendRegistry,
	config::Settings,
	store::SocialStorage,
	views::{
		BaseSocialAuthView, SocialAuthView, SocialSessionAuthView, SocialTokenOnlyAuthView,
		SocialTokenUserAuthView,
	},
};

/// Application state shared by every social login route.
#[derive(Clone)]
pub struct SocialAuthState {
	/// Injected settings.
	pub settings: Arc<Settings>,
	/// User, association, token, and session persistence.
	pub storage: Arc<dyn SocialStorage>,
	/// Configured backends.
	pub backends: Arc<BackendRegistry>,
}
impl SocialAuthState {
	/// Bundles settings, storage, and backends.
	pub fn new(settings: Settings, storage: Arc<dyn SocialStorage>, backends: BackendRegistry) -> Self {
		Self { settings: Arc::new(settings), storage, backends: Arc::new(backends) }
	}
}
impl Debug for SocialAuthState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SocialAuthState")
			.field("settings", &self.settings)
			.field("backends", &self.backends.names())
			.finish_non_exhaustive()
	}
}

/// Named routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UrlName {
	/// `/social/session/{backend}/`.
	LoginSocialSession,
	/// `/social/token_user/{backend}/`.
	LoginSocialTokenUser,
	/// `/social/token/{backend}/`.
	LoginSocialToken,
}
impl UrlName {
	/// Route name.
	pub const fn as_str(self) -> &'static str {
		match self {
			UrlName::LoginSocialSession => "login_social_session",
			UrlName::LoginSocialTokenUser => "login_social_token_user",
			UrlName::LoginSocialToken => "login_social_token",
		}
	}

	/// Route pattern as registered with the router.
	pub const fn pattern(self) -> &'static str {
		match self {
			UrlName::LoginSocialSession => "/social/session/{backend}/",
			UrlName::LoginSocialTokenUser => "/social/token_user/{backend}/",
			UrlName::LoginSocialToken => "/social/token/{backend}/",
		}
	}

	/// Reverses the route for `backend`.
	pub fn path(self, backend: &str) -> String {
		self.pattern().replace("{backend}", backend)
	}
}
impl FromStr for UrlName {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		[Self::LoginSocialSession, Self::LoginSocialTokenUser, Self::LoginSocialToken]
			.into_iter()
			.find(|name| name.as_str() == s)
			.ok_or_else(|| format!("unknown route name `{s}`"))
	}
}

struct ViewState<V> {
	app: SocialAuthState,
	view: Arc<V>,
}
impl<V> Clone for ViewState<V> {
	fn clone(&self) -> Self {
		Self { app: self.app.clone(), view: self.view.clone() }
	}
}

/// Session login route.
pub fn session_urls(state: SocialAuthState) -> Router {
	route(UrlName::LoginSocialSession, SocialSessionAuthView, state)
}

/// Token and token-plus-user login routes.
pub fn token_urls(state: SocialAuthState) -> Router {
	route(UrlName::LoginSocialTokenUser, SocialTokenUserAuthView, state.clone())
		.merge(route(UrlName::LoginSocialToken, SocialTokenOnlyAuthView, state))
}

/// Every social login route.
pub fn urls(state: SocialAuthState) -> Router {
	session_urls(state.clone()).merge(token_urls(state))
}

fn route<V>(name: UrlName, view: V, app: SocialAuthState) -> Router
where
	V: SocialAuthView,
{
	Router::new()
		.route(name.pattern(), post(login::<V>).options(options::<V>))
		.with_state(ViewState { app, view: Arc::new(view) })
}

async fn login<V>(
	State(state): State<ViewState<V>>,
	Path(backend): Path<String>,
	uri: Uri,
	headers: HeaderMap,
	body: Bytes,
) -> Response
where
	V: SocialAuthView,
{
	BaseSocialAuthView::new(state.view.as_ref(), &state.app)
		.post(&backend, &uri, headers, body)
		.await
}

async fn options<V>(
	State(state): State<ViewState<V>>,
	Path(backend): Path<String>,
	uri: Uri,
	headers: HeaderMap,
) -> Response
where
	V: SocialAuthView,
{
	BaseSocialAuthView::new(state.view.as_ref(), &state.app).options(&backend, &uri, headers).await
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn routes_reverse_by_name() {
		assert_eq!(UrlName::LoginSocialSession.path("facebook"), "/social/session/facebook/");
		assert_eq!(
			"login_social_token".parse::<UrlName>().map(|name| name.path("twitter")),
			Ok("/social/token/twitter/".to_owned())
		);
		assert!("login".parse::<UrlName>().is_err());
	}
}
