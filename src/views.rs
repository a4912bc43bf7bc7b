//! Social login views.
//!
//! [`BaseSocialAuthView`] runs the shared request state machine:
//!
//! 1. Resolve the request user, check permissions, and collect the payload (body fields plus
//!    the `provider` taken from the URL).
//! 2. Attach the backend named in the URL to the request.
//! 3. OAuth 1.0a requests without a token hand the provider's request token back to the
//!    client; everything else is validated by the protocol's input serializer.
//! 4. Complete the handshake, render the view's output serializer, and run the view's login
//!    side effect exactly once.
//!
//! The concrete views differ only in their output shape and login side effect.

pub mod session;
pub mod token;

pub use session::SocialSessionAuthView;
pub use token::{SocialTokenOnlyAuthView, SocialTokenUserAuthView};

// crates.io
use axum::{
	Json,
	body::Bytes,
	http::{
		HeaderMap, HeaderValue, Method, StatusCode, Uri,
		header::{CACHE_CONTROL, CONTENT_TYPE, SET_COOKIE},
	},
	response::{IntoResponse, Response},
};
use cookie::Cookie;
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	backend::{AttachedBackend, BackendFuture, CompletedLogin},
	config::Settings,
	error::{ConfigError, ValidationError},
	metadata::{self, IntrospectableView},
	obs::{self, LoginOutcome, ViewKind, ViewSpan, ViewStage},
	permissions::{AllowAny, Permission, check_permissions},
	serializers::{AuthData, AuthInput, InputSerializer, OutputSerializer},
	strategy::{RequestContext, load_strategy},
	urls::SocialAuthState,
};

const NEVER_CACHE: &str = "max-age=0, no-cache, no-store, must-revalidate, private";
const DEFAULT_PERMISSIONS: &[&dyn Permission] = &[&AllowAny];
const ALLOWED_METHODS: &[Method] = &[Method::POST, Method::OPTIONS];
const INVALID_REDIRECT: &str = "Enter a valid URL.";

/// Side effects a view's login step asks the response to carry.
#[derive(Clone, Debug, Default)]
pub struct LoginEffect {
	/// Cookies to set on the response.
	pub cookies: Vec<Cookie<'static>>,
}

/// Hooks a concrete social login view customizes.
pub trait SocialAuthView
where
	Self: 'static + Send + Sync,
{
	/// View flavor, used for spans and metrics.
	fn kind(&self) -> ViewKind;

	/// Human-readable view name.
	fn name(&self) -> &'static str;

	/// Response shape of a successful login.
	fn serializer(&self) -> OutputSerializer;

	/// Whether `POST` requires a matching CSRF cookie and header.
	fn enforce_csrf(&self) -> bool {
		false
	}

	/// Permissions checked before the view runs.
	fn permissions(&self) -> &[&'static dyn Permission] {
		DEFAULT_PERMISSIONS
	}

	/// Login side effect, run once after a successful completion.
	fn do_login<'a>(
		&'a self,
		attached: &'a AttachedBackend,
		login: &'a CompletedLogin,
	) -> BackendFuture<'a, LoginEffect> {
		let _ = (attached, login);

		Box::pin(async { Ok(LoginEffect::default()) })
	}
}

/// Shared request state machine bound to one view and the application state.
#[derive(Debug)]
pub struct BaseSocialAuthView<'a, V>
where
	V: ?Sized,
{
	view: &'a V,
	state: &'a SocialAuthState,
}
impl<'a, V> BaseSocialAuthView<'a, V>
where
	V: ?Sized + SocialAuthView,
{
	/// Binds `view` to `state`.
	pub fn new(view: &'a V, state: &'a SocialAuthState) -> Self {
		Self { view, state }
	}

	/// Handles `POST` for `backend`.
	pub async fn post(&self, backend: &str, uri: &Uri, headers: HeaderMap, body: Bytes) -> Response {
		let kind = self.view.kind();
		let span = ViewSpan::new(kind, backend);

		obs::record_login_outcome(kind, LoginOutcome::Attempt);

		let response = match span.instrument(self.run(&span, backend, uri, headers, body)).await {
			Ok(response) => {
				obs::record_login_outcome(kind, LoginOutcome::Success);

				response
			},
			Err(e) => {
				obs::record_login_outcome(kind, LoginOutcome::Failure);

				e.into_response()
			},
		};

		never_cache(response)
	}

	/// Handles `OPTIONS` for `backend` by rendering the view's metadata document.
	pub async fn options(&self, backend: &str, uri: &Uri, headers: HeaderMap) -> Response {
		let result = async {
			let request = self.authenticate(uri, headers).await?;
			let strategy = load_strategy(
				self.state.storage.clone(),
				self.state.settings.clone(),
				Some(request.clone()),
			);
			let attached = self.state.backends.attach(strategy, backend)?;
			let introspection = Introspection {
				view: self.view,
				serializer: InputSerializer::for_protocol(attached.protocol()),
			};

			metadata::metadata(&introspection, &request)
		}
		.await;

		match result {
			Ok(document) => (StatusCode::OK, Json(document)).into_response(),
			Err(e) => e.into_response(),
		}
	}

	async fn run(
		&self,
		span: &ViewSpan,
		backend: &str,
		uri: &Uri,
		headers: HeaderMap,
		body: Bytes,
	) -> Result<Response> {
		let request = self.authenticate(uri, headers).await?;

		check_permissions(self.view.permissions(), &request)?;

		let auth_data = self.get_auth_data(&request, backend, &body)?;

		if self.view.enforce_csrf() {
			enforce_csrf(&request, &self.state.settings)?;
		}

		let strategy =
			load_strategy(self.state.storage.clone(), self.state.settings.clone(), Some(request));
		let mut attached = self.state.backends.attach(strategy, backend)?;

		span.stage(ViewStage::BackendAttached);

		let serializer_in = InputSerializer::for_protocol(attached.protocol());

		if serializer_in == InputSerializer::OAuth1
			&& !auth_data.contains_key(attached.token_parameter_name())
		{
			let raw = attached.set_unauthorized_token(auth_data).await.inspect_err(log_failure)?;

			span.stage(ViewStage::OAuth1Stage1);
			tracing::debug!(backend, "returning OAuth 1.0a request token");

			return Ok((StatusCode::OK, Json(parse_qs(&raw))).into_response());
		}

		let input = serializer_in.validate(&auth_data)?;

		span.stage(ViewStage::InputValidated);

		let login =
			self.get_object(&mut attached, &input, auth_data).await.inspect_err(log_failure)?;

		span.stage(ViewStage::Completed);
		span.user(login.user.id);

		let payload =
			self.view.serializer().serialize(self.state.storage.as_ref(), &login.user).await?;
		let effect = self.view.do_login(&attached, &login).await?;
		let mut response = (StatusCode::OK, Json(payload)).into_response();

		for cookie in effect.cookies {
			let value = HeaderValue::from_str(&cookie.to_string()).map_err(|_| {
				ConfigError::InvalidSetting { key: "cookie", value: cookie.name().to_owned() }
			})?;

			response.headers_mut().append(SET_COOKIE, value);
		}

		span.stage(ViewStage::Responded);

		Ok(response)
	}

	async fn authenticate(&self, uri: &Uri, headers: HeaderMap) -> Result<RequestContext> {
		let request =
			RequestContext::authenticate(headers, self.state.storage.as_ref(), &self.state.settings)
				.await?;

		Ok(request.with_authority(uri.authority().map(ToString::to_string)))
	}

	/// Collects the payload: body fields plus `provider` from the URL, which wins.
	fn get_auth_data(&self, request: &RequestContext, backend: &str, body: &[u8]) -> Result<AuthData> {
		let mut auth_data = parse_body(request.headers(), body)?;

		auth_data.insert("provider".into(), backend.into());

		Ok(auth_data)
	}

	/// Applies the redirect URI policy, then completes the handshake.
	///
	/// Redirect priority: the validated `redirect_uri`, then the absolute redirect setting,
	/// then (when enabled) the request `Origin` joined with the default redirect path. Relative
	/// values are resolved against the request host.
	async fn get_object(
		&self,
		attached: &mut AttachedBackend,
		input: &AuthInput,
		mut auth_data: AuthData,
	) -> Result<CompletedLogin> {
		let settings = &self.state.settings;
		let requested = match input {
			AuthInput::OAuth2(input) => input.redirect_uri.clone(),
			AuthInput::OAuth1(_) => match auth_data.get("redirect_uri") {
				Some(JsonValue::String(uri)) =>
					Some(uri.trim().to_owned()).filter(|uri| !uri.is_empty()),
				_ => None,
			},
		};
		let absolute = settings.oauth_absolute_redirect_uri.clone().filter(|uri| !uri.is_empty());
		let manual = match (requested, absolute) {
			(Some(uri), _) => Some((uri, RedirectSource::Payload)),
			(None, Some(uri)) => Some((uri, RedirectSource::Setting)),
			(None, None) => None,
		};

		auth_data.remove("redirect_uri");

		let source = match manual {
			Some((uri, source)) => {
				let uri = attached.strategy().build_absolute_uri(&uri);

				attached.set_redirect_uri(uri);

				source
			},
			None => {
				if settings.domain_from_origin {
					let derived = attached
						.strategy()
						.request_origin()
						.and_then(|origin| origin_redirect(origin, attached.redirect_uri()));

					if let Some(uri) = derived {
						attached.set_redirect_uri(uri);
					}
				}

				RedirectSource::Request
			},
		};

		check_redirect(attached.redirect_uri(), source)?;

		let user = attached.strategy().request_user().cloned();

		attached.disable_state_check();
		attached.complete(auth_data, user).await
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RedirectSource {
	Payload,
	Setting,
	Request,
}

struct Introspection<'a, V>
where
	V: ?Sized,
{
	view: &'a V,
	serializer: InputSerializer,
}
impl<V> IntrospectableView for Introspection<'_, V>
where
	V: ?Sized + SocialAuthView,
{
	fn name(&self) -> &str {
		self.view.name()
	}

	fn description(&self) -> &str {
		""
	}

	fn allowed_methods(&self) -> &[Method] {
		ALLOWED_METHODS
	}

	fn check_permissions(&self, request: &RequestContext) -> Result<()> {
		check_permissions(self.view.permissions(), request)
	}

	fn serializer_in(&self) -> InputSerializer {
		self.serializer
	}
}

// The exchange needs an absolute URL; a relative one means the host could not be resolved.
fn check_redirect(uri: &str, source: RedirectSource) -> Result<()> {
	if Url::parse(uri).is_ok_and(|url| url.has_host()) {
		return Ok(());
	}

	match source {
		RedirectSource::Payload => {
			let mut errors = ValidationError::default();

			errors.push("redirect_uri", INVALID_REDIRECT);

			Err(errors.into())
		},
		RedirectSource::Setting => Err(ConfigError::InvalidSetting {
			key: "oauth_absolute_redirect_uri",
			value: uri.to_owned(),
		}
		.into()),
		RedirectSource::Request =>
			Err(Error::api(StatusCode::BAD_REQUEST, "Unable to determine the request host.")),
	}
}

fn log_failure(e: &Error) {
	if e.is_completion_failure() {
		tracing::error!(error = %e, "social login failed");
	}
}

fn never_cache(mut response: Response) -> Response {
	response.headers_mut().insert(CACHE_CONTROL, HeaderValue::from_static(NEVER_CACHE));

	response
}

fn parse_body(headers: &HeaderMap, body: &[u8]) -> Result<AuthData> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(AuthData::new());
	}

	let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).unwrap_or("");
	let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

	match essence.as_str() {
		"application/json" => match serde_json::from_slice::<JsonValue>(body) {
			Ok(JsonValue::Object(map)) => Ok(map),
			Ok(_) => Err(Error::api(StatusCode::BAD_REQUEST, "JSON parse error - expected an object.")),
			Err(e) => Err(Error::api(StatusCode::BAD_REQUEST, format!("JSON parse error - {e}"))),
		},
		"application/x-www-form-urlencoded" => serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
			.map(|pairs| pairs.into_iter().map(|(key, value)| (key, value.into())).collect())
			.map_err(|e| Error::api(StatusCode::BAD_REQUEST, format!("Form parse error - {e}"))),
		_ => Err(Error::api(
			StatusCode::UNSUPPORTED_MEDIA_TYPE,
			format!("Unsupported media type \"{content_type}\" in request."),
		)),
	}
}

// First value wins for repeated keys.
fn parse_qs(raw: &str) -> JsonValue {
	let mut map = JsonMap::new();

	for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
		map.entry(key.into_owned()).or_insert_with(|| value.into_owned().into());
	}

	JsonValue::Object(map)
}

fn origin_redirect(origin: &str, redirect_uri: &str) -> Option<String> {
	let origin = Url::parse(origin).ok()?;

	if !origin.has_host() {
		return None;
	}

	let path = match Url::parse(redirect_uri) {
		Ok(url) => url.path().to_owned(),
		Err(_) => redirect_uri.split(['?', '#']).next().unwrap_or_default().to_owned(),
	};
	let base = Url::parse(&origin.origin().ascii_serialization()).ok()?;

	base.join(&path).ok().map(String::from)
}

fn enforce_csrf(request: &RequestContext, settings: &Settings) -> Result<()> {
	let Some(cookie) = request.cookie(&settings.csrf_cookie_name) else {
		return Err(Error::permission_denied("CSRF Failed: CSRF cookie not set."));
	};

	match request.header(&settings.csrf_header_name) {
		None => Err(Error::permission_denied("CSRF Failed: CSRF token missing.")),
		Some(token) if bool::from(token.as_bytes().ct_eq(cookie.as_bytes())) => Ok(()),
		Some(_) => Err(Error::permission_denied("CSRF Failed: CSRF token incorrect.")),
	}
}
