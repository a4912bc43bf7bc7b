//! Request-scoped strategy binding the storage backend to the incoming request.

// crates.io
use axum::http::{
	HeaderMap, StatusCode,
	header::{AUTHORIZATION, COOKIE, HOST, ORIGIN},
};
use cookie::Cookie;
// self
use crate::{
	_prelude::*,
	auth::User,
	config::Settings,
	store::SocialStorage,
};

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const TOKEN_KEYWORD: &str = "Token";

/// Request translation layer: headers, cookies, and the resolved request user.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
	headers: HeaderMap,
	authority: Option<String>,
	user: Option<User>,
}
impl RequestContext {
	/// Wraps the request headers; the request user stays anonymous.
	pub fn new(headers: HeaderMap) -> Self {
		Self { headers, authority: None, user: None }
	}

	/// Wraps the request headers and resolves the request user.
	///
	/// A session cookie is tried first, then an `Authorization: Token <key>` header. A token
	/// header that does not resolve to an active user is rejected with HTTP 401.
	pub async fn authenticate(
		headers: HeaderMap,
		storage: &dyn SocialStorage,
		settings: &Settings,
	) -> Result<Self> {
		let mut ctx = Self::new(headers);

		if let Some(key) = ctx.cookie(&settings.session_cookie_name) {
			ctx.user = storage.session_user(&key).await?.filter(|user| user.is_active);
		}
		if ctx.user.is_some() {
			return Ok(ctx);
		}
		if let Some(key) = ctx.token_key()? {
			let user = storage
				.token_user(&key)
				.await?
				.ok_or_else(|| Error::api(StatusCode::UNAUTHORIZED, "Invalid token."))?;

			if !user.is_active {
				return Err(Error::api(StatusCode::UNAUTHORIZED, "User inactive or deleted."));
			}

			ctx.user = Some(user);
		}

		Ok(ctx)
	}

	/// Records the authority of the request target, used when no `Host` header is sent.
	pub fn with_authority(mut self, authority: Option<String>) -> Self {
		self.authority = authority;

		self
	}

	/// Replaces the request user.
	pub fn with_user(mut self, user: Option<User>) -> Self {
		self.user = user;

		self
	}

	/// Request headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Returns a header as a string, ignoring values that are not visible ASCII.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// Returns the value of the named cookie.
	pub fn cookie(&self, name: &str) -> Option<String> {
		self.headers
			.get_all(COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(Cookie::split_parse)
			.filter_map(|cookie| cookie.ok())
			.find(|cookie| cookie.name() == name)
			.map(|cookie| cookie.value().to_owned())
	}

	/// `Host` header, falling back to the request target's authority (HTTP/2 `:authority`).
	pub fn host(&self) -> Option<&str> {
		self.headers
			.get(HOST)
			.and_then(|value| value.to_str().ok())
			.filter(|host| !host.is_empty())
			.or(self.authority.as_deref())
	}

	/// Request scheme; `https` only when a proxy says so through `X-Forwarded-Proto`.
	pub fn scheme(&self) -> &'static str {
		match self.header(FORWARDED_PROTO) {
			Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
			_ => "http",
		}
	}

	/// `Origin` header.
	pub fn origin(&self) -> Option<&str> {
		self.headers.get(ORIGIN).and_then(|value| value.to_str().ok())
	}

	/// Resolved request user, if any.
	pub fn user(&self) -> Option<&User> {
		self.user.as_ref()
	}

	/// Returns true when the request carries an authenticated user.
	pub fn is_authenticated(&self) -> bool {
		self.user.is_some()
	}

	fn token_key(&self) -> Result<Option<String>> {
		let Some(value) = self.headers.get(AUTHORIZATION) else {
			return Ok(None);
		};
		let value = value.to_str().map_err(|_| {
			Error::api(
				StatusCode::UNAUTHORIZED,
				"Invalid token header. Token string should not contain invalid characters.",
			)
		})?;
		let mut parts = value.split_whitespace();

		if !parts.next().is_some_and(|keyword| keyword.eq_ignore_ascii_case(TOKEN_KEYWORD)) {
			return Ok(None);
		}

		match (parts.next(), parts.next()) {
			(Some(key), None) => Ok(Some(key.to_owned())),
			(None, _) => Err(Error::api(
				StatusCode::UNAUTHORIZED,
				"Invalid token header. No credentials provided.",
			)),
			(Some(_), Some(_)) => Err(Error::api(
				StatusCode::UNAUTHORIZED,
				"Invalid token header. Token string should not contain spaces.",
			)),
		}
	}
}

/// Binds the storage backend and settings to one request.
#[derive(Clone)]
pub struct Strategy {
	storage: Arc<dyn SocialStorage>,
	settings: Arc<Settings>,
	request: Option<RequestContext>,
}
impl Strategy {
	/// Storage backend.
	pub fn storage(&self) -> &Arc<dyn SocialStorage> {
		&self.storage
	}

	/// Injected settings.
	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Request context, when the strategy was loaded for a request.
	pub fn request(&self) -> Option<&RequestContext> {
		self.request.as_ref()
	}

	/// Authenticated request user, if any.
	pub fn request_user(&self) -> Option<&User> {
		self.request.as_ref().and_then(RequestContext::user)
	}

	/// Request `Origin` header, if any.
	pub fn request_origin(&self) -> Option<&str> {
		self.request.as_ref().and_then(RequestContext::origin)
	}

	/// Makes `path` absolute against the request's `scheme://host`.
	///
	/// Absolute URLs pass through unchanged, as does everything when no request (or no `Host`
	/// header) is available.
	pub fn build_absolute_uri(&self, path: &str) -> String {
		if Url::parse(path).is_ok() {
			return path.to_owned();
		}

		let Some(request) = &self.request else {
			return path.to_owned();
		};
		let Some(host) = request.host() else {
			return path.to_owned();
		};

		Url::parse(&format!("{}://{host}/", request.scheme()))
			.and_then(|base| base.join(path))
			.map(String::from)
			.unwrap_or_else(|_| path.to_owned())
	}
}
impl Debug for Strategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Strategy")
			.field("settings", &self.settings)
			.field("request", &self.request)
			.finish_non_exhaustive()
	}
}

/// Builds the request-scoped [`Strategy`].
pub fn load_strategy(
	storage: Arc<dyn SocialStorage>,
	settings: Arc<Settings>,
	request: Option<RequestContext>,
) -> Strategy {
	Strategy { storage, settings, request }
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::http::HeaderValue;
	// self
	use super::*;
	use crate::{
		auth::{NewUser, Username},
		store::MemoryStorage,
	};

	fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
		let mut map = HeaderMap::new();

		for (name, value) in pairs {
			map.append(*name, HeaderValue::from_static(value));
		}

		map
	}

	fn strategy(request: Option<RequestContext>) -> Strategy {
		load_strategy(Arc::new(MemoryStorage::default()), Arc::new(Settings::default()), request)
	}

	#[test]
	fn absolute_uris_follow_the_request_host() {
		let ctx = RequestContext::new(headers(&[("host", "api.example.com")]));

		assert_eq!(strategy(Some(ctx)).build_absolute_uri("/"), "http://api.example.com/");

		let ctx = RequestContext::new(headers(&[
			("host", "api.example.com:8443"),
			("x-forwarded-proto", "https"),
		]));

		assert_eq!(
			strategy(Some(ctx)).build_absolute_uri("/complete/"),
			"https://api.example.com:8443/complete/"
		);
		assert_eq!(strategy(None).build_absolute_uri("/"), "/");
		assert_eq!(
			strategy(None).build_absolute_uri("https://app.example.com/cb"),
			"https://app.example.com/cb"
		);
	}

	#[test]
	fn authority_stands_in_for_a_missing_host() {
		let ctx = RequestContext::new(HeaderMap::new())
			.with_authority(Some("api.example.com:8000".into()));

		assert_eq!(ctx.host(), Some("api.example.com:8000"));
		assert_eq!(
			strategy(Some(ctx)).build_absolute_uri("/complete/"),
			"http://api.example.com:8000/complete/"
		);

		let ctx = RequestContext::new(headers(&[("host", "api.example.com")]))
			.with_authority(Some("internal:8000".into()));

		assert_eq!(ctx.host(), Some("api.example.com"));
		assert!(RequestContext::new(HeaderMap::new()).host().is_none());
	}

	#[test]
	fn cookies_are_read_across_headers() {
		let ctx = RequestContext::new(headers(&[
			("cookie", "theme=dark; csrftoken=abc"),
			("cookie", "sessionid=xyz"),
		]));

		assert_eq!(ctx.cookie("csrftoken").as_deref(), Some("abc"));
		assert_eq!(ctx.cookie("sessionid").as_deref(), Some("xyz"));
		assert!(ctx.cookie("missing").is_none());
	}

	#[tokio::test]
	async fn token_header_resolves_the_owner() {
		let storage = MemoryStorage::default();
		let user = storage
			.create_user(NewUser {
				username: Username::new("ada").expect("Username should be valid."),
				email: "ada@example.com".into(),
				first_name: String::new(),
				last_name: String::new(),
			})
			.await
			.expect("User should be created.");
		let token = storage.get_or_create_token(&user).await.expect("Token should be issued.");
		let mut map = HeaderMap::new();

		map.insert(
			AUTHORIZATION,
			HeaderValue::from_str(&format!("Token {}", token.key.expose()))
				.expect("Header should be valid."),
		);

		let ctx = RequestContext::authenticate(map, &storage, &Settings::default())
			.await
			.expect("Token should authenticate.");

		assert_eq!(ctx.user().map(|user| user.id), Some(user.id));

		let err = RequestContext::authenticate(
			headers(&[("authorization", "Token nope")]),
			&storage,
			&Settings::default(),
		)
		.await
		.expect_err("Unknown tokens must be rejected.");

		assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

		let anonymous = RequestContext::authenticate(
			headers(&[("authorization", "Bearer abc")]),
			&storage,
			&Settings::default(),
		)
		.await
		.expect("Other schemes are ignored.");

		assert!(!anonymous.is_authenticated());
	}
}
