// std
use std::iter::IntoIterator;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	auth::BackendName,
	provider::{ClientAuthMethod, ProviderDescriptor, ProviderEndpoints, ProviderQuirks},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// User-info endpoint is mandatory.
	#[error("Missing user-info endpoint.")]
	MissingUserInfoEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The uid field mapping cannot be blank.
	#[error("The user data uid field cannot be empty.")]
	EmptyUidField,
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Backend name for the descriptor being constructed.
	pub name: BackendName,
	/// Token endpoint used for the code exchange.
	pub token_endpoint: Option<Url>,
	/// User-info endpoint.
	pub user_info_endpoint: Option<Url>,
	/// Scopes sent along with the code exchange.
	pub scopes: Vec<String>,
	/// Preferred client authentication method for the token endpoint.
	pub preferred_client_auth_method: ClientAuthMethod,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided backend name.
	pub fn new(name: BackendName) -> Self {
		Self {
			name,
			token_endpoint: None,
			user_info_endpoint: None,
			scopes: Vec::new(),
			preferred_client_auth_method: ClientAuthMethod::default(),
			quirks: ProviderQuirks::default(),
		}
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the user-info endpoint.
	pub fn user_info_endpoint(mut self, url: Url) -> Self {
		self.user_info_endpoint = Some(url);

		self
	}

	/// Adds scopes to the exchange.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes.extend(scopes.into_iter().map(Into::into));

		self
	}

	/// Overrides the preferred client authentication method.
	pub fn preferred_client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.preferred_client_auth_method = method;

		self
	}

	/// Overrides the provider quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let user_info =
			self.user_info_endpoint.ok_or(ProviderDescriptorError::MissingUserInfoEndpoint)?;
		let descriptor = ProviderDescriptor {
			name: self.name,
			endpoints: ProviderEndpoints { token, user_info },
			scopes: self.scopes,
			preferred_client_auth_method: self.preferred_client_auth_method,
			quirks: self.quirks,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("user_info", &self.endpoints.user_info)?;

		if self.quirks.user_data_fields.uid.trim().is_empty() {
			return Err(ProviderDescriptorError::EmptyUidField);
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	match (url.scheme(), url.host()) {
		("https", _) => Ok(()),
		// Loopback providers (local development, mock servers) may speak plain HTTP.
		("http", Some(Host::Domain("localhost"))) => Ok(()),
		("http", Some(Host::Ipv4(ip))) if ip.is_loopback() => Ok(()),
		("http", Some(Host::Ipv6(ip))) if ip.is_loopback() => Ok(()),
		_ => Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::provider::{UserDataFields, UserInfoAuth};

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse descriptor URL fixture.")
	}

	fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptor::builder(
			BackendName::new("facebook").expect("Backend name fixture should be valid."),
		)
	}

	#[test]
	fn descriptor_requires_secure_endpoints() {
		let err = builder()
			.token_endpoint(url("http://graph.example.com/oauth/access_token"))
			.user_info_endpoint(url("https://graph.example.com/me"))
			.build()
			.expect_err("Plain HTTP token endpoints should be rejected.");

		assert!(matches!(err, ProviderDescriptorError::InsecureEndpoint { endpoint: "token", .. }));

		let err = builder()
			.token_endpoint(url("https://graph.example.com/oauth/access_token"))
			.build()
			.expect_err("The user-info endpoint is mandatory.");

		assert_eq!(err, ProviderDescriptorError::MissingUserInfoEndpoint);
	}

	#[test]
	fn loopback_endpoints_may_use_http() {
		for token in ["http://127.0.0.1:8080/token", "http://localhost/token", "http://[::1]/token"] {
			builder()
				.token_endpoint(url(token))
				.user_info_endpoint(url("https://graph.example.com/me"))
				.build()
				.expect("Loopback endpoints should be accepted over HTTP.");
		}

		let err = builder()
			.token_endpoint(url("https://graph.example.com/oauth/access_token"))
			.user_info_endpoint(url("ftp://127.0.0.1/me"))
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ProviderDescriptorError::InsecureEndpoint { endpoint: "user_info", .. }));
	}

	#[test]
	fn descriptor_keeps_quirks_and_scopes() {
		let quirks = ProviderQuirks {
			user_info_auth: UserInfoAuth::QueryParameter,
			user_data_fields: UserDataFields::default(),
		};
		let descriptor = builder()
			.token_endpoint(url("https://graph.example.com/oauth/access_token"))
			.user_info_endpoint(url("https://graph.example.com/me"))
			.scopes(["email", "public_profile"])
			.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
			.quirks(quirks)
			.build()
			.expect("Descriptor should build for secure endpoints.");

		assert_eq!(descriptor.scopes, vec!["email".to_owned(), "public_profile".to_owned()]);
		assert_eq!(descriptor.quirks.user_info_auth, UserInfoAuth::QueryParameter);
		assert_eq!(descriptor.quirks.user_data_fields.uid, "id");
	}

	#[test]
	fn blank_uid_mapping_is_rejected() {
		let mut quirks = ProviderQuirks::default();

		quirks.user_data_fields.uid = " ".into();

		let err = builder()
			.token_endpoint(url("https://graph.example.com/oauth/access_token"))
			.user_info_endpoint(url("https://graph.example.com/me"))
			.quirks(quirks)
			.build()
			.expect_err("Blank uid mappings should be rejected.");

		assert_eq!(err, ProviderDescriptorError::EmptyUidField);
	}
}
