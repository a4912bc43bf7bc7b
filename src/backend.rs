//! Social backends and the request-scoped handle the views drive.
//!
//! A [`Backend`] knows one provider's handshake. The [`BackendRegistry`] holds every configured
//! backend; attaching one to a request yields an [`AttachedBackend`] that carries the
//! request's [`Strategy`], redirect URI, and state-check policy. Completing an attached
//! backend runs the provider exchange followed by the [`pipeline`] that maps the provider
//! identity onto a local user.

pub mod oauth2;
pub mod pipeline;

pub use self::oauth2::*;
pub use pipeline::CompletedLogin;

// self
use crate::{
	_prelude::*,
	auth::{BackendName, User},
	error::AuthError,
	serializers::AuthData,
	strategy::Strategy,
};

/// Boxed future returned by [`Backend`] operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Handshake family implemented by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
	/// Three-legged OAuth 1.0a (request token, then access token).
	OAuth1,
	/// OAuth 2.0 authorization code grant.
	OAuth2,
}

/// OAuth `state` verification policy applied during completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StateCheck {
	/// Skip verification; the front-end owns the `state` round trip.
	#[default]
	Disabled,
	/// The payload's `state` must equal the stored value.
	Expect(String),
}

/// Everything a backend needs to finish one handshake.
#[derive(Clone, Debug)]
pub struct HandshakeContext {
	/// Request payload (body fields plus `provider`).
	pub auth_data: AuthData,
	/// Redirect URI the provider issued the grant for.
	pub redirect_uri: String,
	/// `state` verification policy.
	pub state_check: StateCheck,
}
impl HandshakeContext {
	/// Returns a payload field rendered as a string.
	///
	/// Numbers are stringified; `null`, arrays, and objects are treated as absent.
	pub fn param(&self, name: &str) -> Option<String> {
		match self.auth_data.get(name)? {
			JsonValue::String(value) => Some(value.to_owned()),
			JsonValue::Number(value) => Some(value.to_string()),
			JsonValue::Bool(value) => Some(value.to_string()),
			_ => None,
		}
	}

	/// Verifies the payload's `state` against the configured policy.
	pub fn verify_state(&self) -> Result<(), AuthError> {
		match &self.state_check {
			StateCheck::Disabled => Ok(()),
			StateCheck::Expect(expected) => match self.param("state") {
				Some(state) if &state == expected => Ok(()),
				_ => Err(AuthError::StateMismatch),
			},
		}
	}
}

/// Profile details reported by the provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
	/// Preferred login name.
	pub username: Option<String>,
	/// Email address.
	pub email: Option<String>,
	/// Given name.
	pub first_name: Option<String>,
	/// Family name.
	pub last_name: Option<String>,
	/// Display name.
	pub fullname: Option<String>,
}

/// Identity established by a successful provider exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderIdentity {
	/// Provider-side account identifier.
	pub uid: String,
	/// Profile details used when creating a local user.
	pub details: UserDetails,
	/// Provider payload persisted on the social association.
	pub extra_data: JsonMap<String, JsonValue>,
}
impl ProviderIdentity {
	/// Creates an identity with empty details.
	pub fn new(uid: impl Into<String>) -> Self {
		Self { uid: uid.into(), details: UserDetails::default(), extra_data: JsonMap::new() }
	}
}

/// One provider's handshake.
///
/// Implementations are shared across requests and must be `Send + Sync`; request-scoped data
/// arrives through [`HandshakeContext`].
pub trait Backend
where
	Self: 'static + Send + Sync + Debug,
{
	/// Name the backend is registered and routed under.
	fn name(&self) -> &BackendName;

	/// Handshake family.
	fn protocol(&self) -> Protocol;

	/// Payload field whose presence marks the second OAuth 1.0a stage.
	fn token_parameter_name(&self) -> &'static str {
		"oauth_token"
	}

	/// Obtains an unauthorized request token (OAuth 1.0a stage 1).
	///
	/// Returns the provider's URL-encoded token response verbatim.
	fn unauthorized_token<'a>(&'a self, ctx: &'a HandshakeContext) -> BackendFuture<'a, String> {
		let _ = ctx;
		let err = AuthError::Unsupported {
			backend: self.name().to_string(),
			stage: "unauthorized token retrieval",
		};

		Box::pin(async move { Err(err.into()) })
	}

	/// Finishes the handshake and reports the provider identity.
	fn auth_complete<'a>(&'a self, ctx: &'a HandshakeContext) -> BackendFuture<'a, ProviderIdentity>;
}

/// Backend bound to a single request.
#[derive(Clone, Debug)]
pub struct AttachedBackend {
	backend: Arc<dyn Backend>,
	strategy: Strategy,
	redirect_uri: String,
	state_check: StateCheck,
}
impl AttachedBackend {
	/// Binds `backend` to the request behind `strategy`.
	pub fn new(backend: Arc<dyn Backend>, strategy: Strategy, redirect_uri: String) -> Self {
		Self { backend, strategy, redirect_uri, state_check: StateCheck::default() }
	}

	/// Backend name.
	pub fn name(&self) -> &BackendName {
		self.backend.name()
	}

	/// Backend protocol.
	pub fn protocol(&self) -> Protocol {
		self.backend.protocol()
	}

	/// Returns true for OAuth 1.0a backends.
	pub fn is_oauth1(&self) -> bool {
		matches!(self.protocol(), Protocol::OAuth1)
	}

	/// Payload field that marks the second OAuth 1.0a stage.
	pub fn token_parameter_name(&self) -> &'static str {
		self.backend.token_parameter_name()
	}

	/// Strategy the backend is bound to.
	pub fn strategy(&self) -> &Strategy {
		&self.strategy
	}

	/// Redirect URI used for the exchange.
	pub fn redirect_uri(&self) -> &str {
		&self.redirect_uri
	}

	/// Overrides the redirect URI used for the exchange.
	pub fn set_redirect_uri(&mut self, uri: impl Into<String>) {
		self.redirect_uri = uri.into();
	}

	/// Requires the payload `state` to equal `expected`.
	pub fn expect_state(&mut self, expected: impl Into<String>) {
		self.state_check = StateCheck::Expect(expected.into());
	}

	/// Skips OAuth `state` verification.
	pub fn disable_state_check(&mut self) {
		self.state_check = StateCheck::Disabled;
	}

	/// Current `state` verification policy.
	pub fn state_check(&self) -> &StateCheck {
		&self.state_check
	}

	/// Runs OAuth 1.0a stage 1 and returns the provider's URL-encoded token response.
	pub async fn set_unauthorized_token(&self, auth_data: AuthData) -> Result<String> {
		let ctx = self.context(auth_data);

		self.backend.unauthorized_token(&ctx).await
	}

	/// Completes the handshake and maps the provider identity onto a local user.
	///
	/// `user` is the already-authenticated request user; when present, the social account is
	/// linked to it instead of a new user being created.
	pub async fn complete(&self, auth_data: AuthData, user: Option<User>) -> Result<CompletedLogin> {
		let ctx = self.context(auth_data);
		let identity = self.backend.auth_complete(&ctx).await?;

		pipeline::run(self.strategy.storage().as_ref(), self.name(), identity, user).await
	}

	fn context(&self, auth_data: AuthData) -> HandshakeContext {
		HandshakeContext {
			auth_data,
			redirect_uri: self.redirect_uri.clone(),
			state_check: self.state_check.clone(),
		}
	}
}

/// Backends available to the views, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct BackendRegistry {
	backends: HashMap<BackendName, Arc<dyn Backend>>,
}
impl BackendRegistry {
	/// Registers a backend, replacing any previous backend with the same name.
	pub fn register(&mut self, backend: Arc<dyn Backend>) -> &mut Self {
		self.backends.insert(backend.name().clone(), backend);

		self
	}

	/// Looks a backend up by name.
	pub fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
		self.backends.get(name).cloned()
	}

	/// Registered backend names, sorted.
	pub fn names(&self) -> Vec<&BackendName> {
		let mut names = self.backends.keys().collect::<Vec<_>>();

		names.sort();

		names
	}

	/// Attaches the backend called `name` to the request behind `strategy`.
	///
	/// The default redirect URI is the configured `oauth_redirect_uri` made absolute against
	/// the request.
	pub fn attach(&self, strategy: Strategy, name: &str) -> Result<AttachedBackend> {
		let backend = self.get(name).ok_or_else(|| Error::not_found("Backend not found"))?;
		let redirect_uri = strategy.build_absolute_uri(&strategy.settings().oauth_redirect_uri);

		tracing::debug!(backend = name, redirect_uri = %redirect_uri, "backend attached");

		Ok(AttachedBackend::new(backend, strategy, redirect_uri))
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		config::Settings,
		store::{MemoryStorage, SocialStorage},
		strategy::load_strategy,
	};

	fn registry() -> BackendRegistry {
		let mut registry = BackendRegistry::default();

		registry.register(Arc::new(RecordingBackend::oauth2(
			"facebook",
			ScriptedOutcome::Identity { uid: "1".into(), email: "a@example.com".into() },
		)));

		registry
	}

	fn strategy() -> Strategy {
		let storage: Arc<dyn SocialStorage> = Arc::new(MemoryStorage::default());

		load_strategy(storage, Arc::new(Settings::default()), None)
	}

	#[test]
	fn unknown_backends_are_not_found() {
		let err = registry().attach(strategy(), "myspace").expect_err("Unknown backend must fail.");

		assert!(matches!(err, Error::NotFound { ref detail } if detail == "Backend not found"));
	}

	#[test]
	fn attachment_uses_configured_redirect() {
		let attached = registry().attach(strategy(), "facebook").expect("Backend should attach.");

		assert_eq!(attached.redirect_uri(), "/");
		assert_eq!(attached.state_check(), &StateCheck::Disabled);
		assert!(!attached.is_oauth1());
	}

	#[tokio::test]
	async fn completion_links_through_the_strategy_storage() {
		let memory = Arc::new(MemoryStorage::default());
		let storage: Arc<dyn SocialStorage> = memory.clone();
		let strategy = load_strategy(storage, Arc::new(Settings::default()), None);
		let attached = registry().attach(strategy, "facebook").expect("Backend should attach.");
		let login = attached
			.complete(auth_data([("code", "abc")]), None)
			.await
			.expect("Completion should succeed.");

		assert!(login.is_new);
		assert_eq!(login.user.email, "a@example.com");
		assert_eq!(memory.social_users().len(), 1);
		assert_eq!(memory.social_users()[0].user_id, login.user.id);
	}

	#[test]
	fn state_verification_follows_policy() {
		let mut ctx = HandshakeContext {
			auth_data: auth_data([("state", "abc")]),
			redirect_uri: "/".into(),
			state_check: StateCheck::Expect("abc".into()),
		};

		assert!(ctx.verify_state().is_ok());

		ctx.state_check = StateCheck::Expect("xyz".into());

		assert!(matches!(ctx.verify_state(), Err(AuthError::StateMismatch)));

		ctx.state_check = StateCheck::Disabled;

		assert!(ctx.verify_state().is_ok());
	}

	#[tokio::test]
	async fn oauth1_stage_one_is_unsupported_by_default() {
		#[derive(Debug)]
		struct Bare(BackendName);
		impl Backend for Bare {
			fn name(&self) -> &BackendName {
				&self.0
			}

			fn protocol(&self) -> Protocol {
				Protocol::OAuth1
			}

			fn auth_complete<'a>(
				&'a self,
				_ctx: &'a HandshakeContext,
			) -> BackendFuture<'a, ProviderIdentity> {
				Box::pin(async { Ok(ProviderIdentity::new("1")) })
			}
		}

		let backend = Arc::new(Bare(BackendName::new("twitter").expect("Name should be valid.")));
		let attached = AttachedBackend::new(backend, strategy(), "/".into());
		let err = attached
			.set_unauthorized_token(AuthData::new())
			.await
			.expect_err("Default stage 1 must be unsupported.");

		assert!(matches!(err, Error::Auth(AuthError::Unsupported { .. })));
	}
}
