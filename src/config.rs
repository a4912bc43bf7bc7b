//! Runtime settings consumed by the social auth views.
//!
//! Settings are injected at router construction instead of being looked up globally. They
//! deserialize from any serde source (missing keys fall back to defaults) and can be read from
//! the `REST_SOCIAL_*` environment variables via [`Settings::from_env`].

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Settings shared by every social auth view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Base redirect URI attached to every backend (`REST_SOCIAL_OAUTH_REDIRECT_URI`).
	///
	/// Relative values are resolved against the incoming request's scheme and host.
	pub oauth_redirect_uri: String,
	/// Derive the redirect scheme and host from the request `Origin` header
	/// (`REST_SOCIAL_DOMAIN_FROM_ORIGIN`).
	pub domain_from_origin: bool,
	/// Absolute redirect URI used when the payload carries none
	/// (`REST_SOCIAL_OAUTH_ABSOLUTE_REDIRECT_URI`).
	pub oauth_absolute_redirect_uri: Option<String>,
	/// Cookie carrying the CSRF token (`REST_SOCIAL_CSRF_COOKIE_NAME`).
	pub csrf_cookie_name: String,
	/// Header that must echo the CSRF cookie (`REST_SOCIAL_CSRF_HEADER_NAME`).
	pub csrf_header_name: String,
	/// Cookie carrying the session key (`REST_SOCIAL_SESSION_COOKIE_NAME`).
	pub session_cookie_name: String,
}
impl Settings {
	const ENV_OAUTH_REDIRECT_URI: &'static str = "REST_SOCIAL_OAUTH_REDIRECT_URI";
	const ENV_DOMAIN_FROM_ORIGIN: &'static str = "REST_SOCIAL_DOMAIN_FROM_ORIGIN";
	const ENV_ABSOLUTE_REDIRECT_URI: &'static str = "REST_SOCIAL_OAUTH_ABSOLUTE_REDIRECT_URI";
	const ENV_CSRF_COOKIE_NAME: &'static str = "REST_SOCIAL_CSRF_COOKIE_NAME";
	const ENV_CSRF_HEADER_NAME: &'static str = "REST_SOCIAL_CSRF_HEADER_NAME";
	const ENV_SESSION_COOKIE_NAME: &'static str = "REST_SOCIAL_SESSION_COOKIE_NAME";

	/// Reads settings from the process environment, keeping defaults for unset keys.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	/// Reads settings through an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&'static str) -> Option<String>,
	{
		let mut settings = Self::default();

		if let Some(value) = lookup(Self::ENV_OAUTH_REDIRECT_URI) {
			settings.oauth_redirect_uri = value;
		}
		if let Some(value) = lookup(Self::ENV_DOMAIN_FROM_ORIGIN) {
			settings.domain_from_origin = parse_flag(Self::ENV_DOMAIN_FROM_ORIGIN, value)?;
		}
		if let Some(value) = lookup(Self::ENV_ABSOLUTE_REDIRECT_URI) {
			settings.oauth_absolute_redirect_uri = Some(value).filter(|v| !v.is_empty());
		}
		if let Some(value) = lookup(Self::ENV_CSRF_COOKIE_NAME) {
			settings.csrf_cookie_name = value;
		}
		if let Some(value) = lookup(Self::ENV_CSRF_HEADER_NAME) {
			settings.csrf_header_name = value;
		}
		if let Some(value) = lookup(Self::ENV_SESSION_COOKIE_NAME) {
			settings.session_cookie_name = value;
		}

		Ok(settings)
	}

	/// Overrides the absolute redirect fallback.
	pub fn with_absolute_redirect_uri(mut self, uri: impl Into<String>) -> Self {
		self.oauth_absolute_redirect_uri = Some(uri.into());

		self
	}

	/// Overrides the Origin-derived redirect flag.
	pub fn with_domain_from_origin(mut self, enabled: bool) -> Self {
		self.domain_from_origin = enabled;

		self
	}

	/// Overrides the base redirect URI.
	pub fn with_oauth_redirect_uri(mut self, uri: impl Into<String>) -> Self {
		self.oauth_redirect_uri = uri.into();

		self
	}
}
impl Default for Settings {
	fn default() -> Self {
		Self {
			oauth_redirect_uri: "/".into(),
			domain_from_origin: true,
			oauth_absolute_redirect_uri: None,
			csrf_cookie_name: "csrftoken".into(),
			csrf_header_name: "X-CSRFToken".into(),
			session_cookie_name: "sessionid".into(),
		}
	}
}

fn parse_flag(key: &'static str, value: String) -> Result<bool, ConfigError> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::InvalidSetting { key, value }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let settings = Settings::default();

		assert_eq!(settings.oauth_redirect_uri, "/");
		assert!(settings.domain_from_origin);
		assert!(settings.oauth_absolute_redirect_uri.is_none());
		assert_eq!(settings.session_cookie_name, "sessionid");
	}

	#[test]
	fn lookup_overrides_and_validates_flags() {
		let settings = Settings::from_lookup(|key| match key {
			"REST_SOCIAL_DOMAIN_FROM_ORIGIN" => Some("off".into()),
			"REST_SOCIAL_OAUTH_ABSOLUTE_REDIRECT_URI" => Some("http://myproject.com/".into()),
			_ => None,
		})
		.expect("Valid environment should load.");

		assert!(!settings.domain_from_origin);
		assert_eq!(settings.oauth_absolute_redirect_uri.as_deref(), Some("http://myproject.com/"));

		let err = Settings::from_lookup(|key| {
			(key == "REST_SOCIAL_DOMAIN_FROM_ORIGIN").then(|| "maybe".into())
		})
		.expect_err("Unknown flag values should be rejected.");

		assert!(matches!(err, ConfigError::InvalidSetting { key: "REST_SOCIAL_DOMAIN_FROM_ORIGIN", .. }));
	}

	#[test]
	fn partial_json_keeps_defaults() {
		let settings: Settings = serde_json::from_str(r#"{"domain_from_origin":false}"#)
			.expect("Partial settings should deserialize.");

		assert!(!settings.domain_from_origin);
		assert_eq!(settings.csrf_header_name, "X-CSRFToken");
	}
}
