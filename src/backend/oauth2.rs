//! Descriptor-driven OAuth 2.0 backend.

// self
use crate::{
	_prelude::*,
	auth::BackendName,
	backend::{Backend, BackendFuture, HandshakeContext, Protocol, ProviderIdentity, UserDetails},
	error::AuthError,
	http::ProviderHttpClient,
	oauth::{BasicFacade, TokenGrant, TransportErrorMapper},
	provider::ProviderDescriptor,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// OAuth 2.0 backend talking to the provider through reqwest.
#[cfg(feature = "reqwest")]
pub type ReqwestOAuth2Backend = OAuth2Backend<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// OAuth 2.0 authorization code backend configured by a [`ProviderDescriptor`].
///
/// Completion exchanges the `code` at the token endpoint, fetches the user-info document with
/// the issued access token, and reads the identity out of it using the descriptor's
/// [`UserDataFields`](crate::provider::UserDataFields) mapping.
pub struct OAuth2Backend<C, M>
where
	C: ProviderHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	descriptor: ProviderDescriptor,
	facade: BasicFacade<C, M>,
}
#[cfg(feature = "reqwest")]
impl ReqwestOAuth2Backend {
	/// Builds a backend that talks to the provider through a default reqwest client.
	pub fn new(
		descriptor: ProviderDescriptor,
		client_id: &str,
		client_secret: Option<&str>,
	) -> Result<Self> {
		Self::with_http_client(
			descriptor,
			client_id,
			client_secret,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> OAuth2Backend<C, M>
where
	C: ProviderHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Builds a backend on top of a caller-supplied transport and error mapper.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		client_id: &str,
		client_secret: Option<&str>,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let facade = BasicFacade::from_descriptor(
			&descriptor,
			client_id,
			client_secret,
			http_client.into(),
			error_mapper.into(),
		)?;

		Ok(Self { descriptor, facade })
	}

	/// Descriptor the backend was built from.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	async fn complete(&self, ctx: &HandshakeContext) -> Result<ProviderIdentity> {
		ctx.verify_state()?;

		if let Some(error) = ctx.param("error") {
			let reason = ctx.param("error_description").unwrap_or(error);

			return Err(AuthError::Canceled { reason }.into());
		}

		let code = ctx.param("code").ok_or(AuthError::MissingParameter { parameter: "code" })?;
		let grant = self.facade.exchange_code(&code, &ctx.redirect_uri).await?;
		let data = self
			.facade
			.fetch_user_info(
				&self.descriptor.endpoints.user_info,
				self.descriptor.quirks.user_info_auth,
				&grant.access_token,
			)
			.await?;

		self.identity(&data, grant)
	}

	fn identity(&self, data: &JsonMap<String, JsonValue>, grant: TokenGrant) -> Result<ProviderIdentity> {
		let fields = &self.descriptor.quirks.user_data_fields;
		let uid = match data.get(&fields.uid) {
			Some(JsonValue::String(value)) if !value.is_empty() => value.to_owned(),
			Some(JsonValue::Number(value)) => value.to_string(),
			_ => return Err(AuthError::MissingUid { field: fields.uid.clone() }.into()),
		};
		let text = |field: &str| {
			data.get(field).and_then(JsonValue::as_str).filter(|v| !v.is_empty()).map(str::to_owned)
		};
		let details = UserDetails {
			username: text(&fields.username),
			email: text(&fields.email),
			first_name: text(&fields.first_name),
			last_name: text(&fields.last_name),
			fullname: text(&fields.fullname),
		};
		let mut extra_data = JsonMap::new();

		extra_data.insert("access_token".into(), grant.access_token.into());
		extra_data.insert("token_type".into(), grant.token_type.into());
		extra_data.insert(
			"expires".into(),
			grant.expires_in.map(|lifetime| lifetime.whole_seconds().into()).unwrap_or(JsonValue::Null),
		);

		if let Some(refresh_token) = grant.refresh_token {
			extra_data.insert("refresh_token".into(), refresh_token.into());
		}

		extra_data.insert("auth_time".into(), OffsetDateTime::now_utc().unix_timestamp().into());

		Ok(ProviderIdentity { uid, details, extra_data })
	}
}
impl<C, M> Backend for OAuth2Backend<C, M>
where
	C: ProviderHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn name(&self) -> &BackendName {
		&self.descriptor.name
	}

	fn protocol(&self) -> Protocol {
		Protocol::OAuth2
	}

	fn auth_complete<'a>(&'a self, ctx: &'a HandshakeContext) -> BackendFuture<'a, ProviderIdentity> {
		Box::pin(self.complete(ctx))
	}
}
impl<C, M> Debug for OAuth2Backend<C, M>
where
	C: ProviderHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Backend")
			.field("name", &self.descriptor.name)
			.field("facade", &self.facade)
			.finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	fn backend() -> ReqwestOAuth2Backend {
		let descriptor = ProviderDescriptor::builder(
			BackendName::new("github").expect("Backend fixture should be valid."),
		)
		.token_endpoint(Url::parse("https://github.example.com/token").expect("URL should parse."))
		.user_info_endpoint(Url::parse("https://api.github.example.com/user").expect("URL should parse."))
		.build()
		.expect("Descriptor should build.");

		ReqwestOAuth2Backend::new(descriptor, "client", Some("secret")).expect("Backend should build.")
	}

	fn grant() -> TokenGrant {
		TokenGrant {
			access_token: "access".into(),
			token_type: "bearer".into(),
			expires_in: Some(Duration::seconds(3600)),
			refresh_token: None,
		}
	}

	#[test]
	fn numeric_uids_and_profile_fields_are_extracted() {
		let data = serde_json::json!({ "id": 583231, "username": "octocat", "name": "The Octocat" });
		let identity = backend()
			.identity(data.as_object().expect("Fixture should be an object."), grant())
			.expect("Identity should be extracted.");

		assert_eq!(identity.uid, "583231");
		assert_eq!(identity.details.username.as_deref(), Some("octocat"));
		assert_eq!(identity.details.fullname.as_deref(), Some("The Octocat"));
		assert!(identity.details.email.is_none());
		assert_eq!(identity.extra_data["access_token"], "access");
		assert_eq!(identity.extra_data["expires"], 3600);
		assert!(!identity.extra_data.contains_key("refresh_token"));
	}

	#[test]
	fn missing_uid_is_an_auth_failure() {
		let data = serde_json::json!({ "login": "octocat" });
		let err = backend()
			.identity(data.as_object().expect("Fixture should be an object."), grant())
			.expect_err("Payloads without the uid field must fail.");

		assert!(matches!(err, Error::Auth(AuthError::MissingUid { ref field }) if field == "id"));
	}

	#[tokio::test]
	async fn provider_errors_short_circuit_before_the_exchange() {
		let ctx = HandshakeContext {
			auth_data: crate::_preludet::auth_data([("error", "access_denied")]),
			redirect_uri: "https://app.example.com/".into(),
			state_check: Default::default(),
		};
		let err = backend().complete(&ctx).await.expect_err("Provider errors must cancel.");

		assert!(matches!(err, Error::Auth(AuthError::Canceled { ref reason }) if reason == "access_denied"));
	}
}
