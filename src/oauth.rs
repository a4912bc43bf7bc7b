//! OAuth 2.0 client facade built on the `oauth2` crate.
//!
//! The facade performs the two provider calls a social login needs: the authorization code
//! exchange and the user-info fetch. Failures are folded into the crate taxonomy: OAuth error
//! payloads on HTTP 400 become [`AuthError`], every other non-success status and all transport
//! failures become [`HttpError`].

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, HttpClientError, RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	error::{AuthError, ConfigError, HttpError},
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{ClientAuthMethod, ProviderDescriptor, UserInfoAuth},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		endpoint: &Url,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: &Url,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => HttpError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(message),
			_ => map_generic_transport_error("unknown transport failure"),
		}
	}
}

/// Token payload returned by a successful code exchange.
#[derive(Clone, Debug)]
pub struct TokenGrant {
	/// Access token used to call the user-info endpoint.
	pub access_token: String,
	/// Token type reported by the provider (usually `bearer`).
	pub token_type: String,
	/// Lifetime reported by the provider.
	pub expires_in: Option<Duration>,
	/// Refresh token, when the provider issued one.
	pub refresh_token: Option<String>,
}

pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	token_endpoint: Url,
	scopes: Vec<String>,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: Option<&str>,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut oauth_client =
			BasicClient::new(ClientId::new(client_id.to_owned())).set_token_uri(token_url);

		if let Some(secret) = client_secret {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.to_owned()));
		}
		if matches!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			token_endpoint: descriptor.endpoints.token.clone(),
			scopes: descriptor.scopes.clone(),
			http_client,
			error_mapper,
		})
	}

	/// Exchanges an authorization code for a token grant.
	pub(crate) async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let redirect_url = RedirectUrl::new(redirect_uri.to_owned()).map_err(|source| {
			ConfigError::InvalidRedirect { uri: redirect_uri.to_owned(), source }
		})?;
		let mut request = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_redirect_uri(Cow::Owned(redirect_url));

		if !self.scopes.is_empty() {
			request = request.add_extra_param("scope", self.scopes.join(" "));
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| {
				map_request_error(&self.token_endpoint, meta.take(), err, self.error_mapper.as_ref())
			})?;
		let expires_in = response
			.expires_in()
			.and_then(|lifetime| i64::try_from(lifetime.as_secs()).ok())
			.map(Duration::seconds);

		Ok(TokenGrant {
			access_token: response.access_token().secret().to_owned(),
			token_type: response.token_type().as_ref().to_owned(),
			expires_in,
			refresh_token: response.refresh_token().map(|token| token.secret().to_owned()),
		})
	}

	/// Fetches the user-info document with the freshly issued access token.
	pub(crate) async fn fetch_user_info(
		&self,
		endpoint: &Url,
		placement: UserInfoAuth,
		access_token: &str,
	) -> Result<JsonMap<String, JsonValue>> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let mut url = endpoint.clone();
		let mut builder = Request::builder().method(Method::GET).header(ACCEPT, "application/json");

		match placement {
			UserInfoAuth::BearerHeader =>
				builder = builder.header(AUTHORIZATION, format!("Bearer {access_token}")),
			UserInfoAuth::QueryParameter => {
				url.query_pairs_mut().append_pair("access_token", access_token);
			},
		}

		let request = builder.uri(url.as_str()).body(Vec::new()).map_err(ConfigError::from)?;
		let response = instrumented.call(request).await.map_err(|err| {
			self.error_mapper.map_transport_error(endpoint, meta.take().as_ref(), err)
		})?;
		let status = response.status();

		if !status.is_success() {
			return Err(HttpError::Status { status: status.as_u16(), url: endpoint.to_string() }.into());
		}

		let mut deserializer = serde_json::Deserializer::from_slice(response.body());

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| AuthError::MalformedResponse { source }.into())
	}
}
impl<C, M> Debug for BasicFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BasicFacade").field("token_endpoint", &self.token_endpoint).finish()
	}
}

fn map_request_error<E, M>(
	endpoint: &Url,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(endpoint, response, meta_status(meta_ref)),
		RequestTokenError::Request(error) => mapper.map_transport_error(endpoint, meta_ref, error),
		RequestTokenError::Parse(source, _body) => match meta_status(meta_ref) {
			Some(status) if status >= 400 =>
				HttpError::Status { status, url: endpoint.to_string() }.into(),
			_ => AuthError::MalformedResponse { source }.into(),
		},
		RequestTokenError::Other(message) => match meta_status(meta_ref) {
			Some(status) if status >= 400 =>
				HttpError::Status { status, url: endpoint.to_string() }.into(),
			_ => AuthError::Failed { reason: message }.into(),
		},
	}
}

// Token endpoints answer a rejected code with HTTP 400; anything else is a transport-level
// failure even when the body carries an OAuth error document.
fn map_server_response_error(
	endpoint: &Url,
	response: BasicErrorResponse,
	status: Option<u16>,
) -> Error {
	let reason = match response.error_description() {
		Some(description) => description.clone(),
		None => response.error().as_ref().to_owned(),
	};

	match status {
		None | Some(400) => AuthError::Canceled { reason }.into(),
		Some(status) => HttpError::Status { status, url: endpoint.to_string() }.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: &Url, meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if let Some(status) = meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())) {
		return HttpError::Status { status, url: endpoint.to_string() }.into();
	}

	HttpError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(message: impl Display) -> Error {
	HttpError::network(std::io::Error::other(message.to_string())).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{auth::BackendName, http::ReqwestHttpClient};

	fn descriptor(method: ClientAuthMethod) -> ProviderDescriptor {
		ProviderDescriptor::builder(
			BackendName::new("test-provider").expect("Failed to construct backend name."),
		)
		.token_endpoint(
			Url::parse("https://example.com/oauth2/token")
				.expect("Failed to parse token endpoint URL."),
		)
		.user_info_endpoint(
			Url::parse("https://example.com/me").expect("Failed to parse user-info URL."),
		)
		.preferred_client_auth_method(method)
		.build()
		.expect("Failed to build provider descriptor.")
	}

	#[test]
	fn builds_basic_and_post_auth_clients() {
		for method in [ClientAuthMethod::ClientSecretBasic, ClientAuthMethod::ClientSecretPost] {
			let result = <BasicFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>>::from_descriptor(
				&descriptor(method),
				"client-id",
				Some("secret"),
				Arc::new(ReqwestHttpClient::default()),
				Arc::new(ReqwestTransportErrorMapper),
			);

			assert!(result.is_ok());
		}
	}

	#[test]
	fn rejected_codes_become_auth_errors_and_other_statuses_http_errors() {
		let endpoint = Url::parse("https://example.com/oauth2/token").expect("URL should parse.");
		let response: BasicErrorResponse = serde_json::from_str(
			r#"{"error":"invalid_grant","error_description":"Code was already redeemed"}"#,
		)
		.expect("Error response fixture should deserialize.");
		let err = map_server_response_error(&endpoint, response.clone(), Some(400));

		assert!(matches!(err, Error::Auth(AuthError::Canceled { ref reason }) if reason == "Code was already redeemed"));

		let err = map_server_response_error(&endpoint, response, Some(401));

		assert!(matches!(err, Error::Http(HttpError::Status { status: 401, .. })));
	}
}
