//! Crate-level error types shared across views, backends, and storage.

// crates.io
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Each variant maps onto exactly one HTTP outcome; see [`Error::status`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// Request input failed serializer validation.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Provider-side authentication failure raised while completing the handshake.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Transport or HTTP status failure raised while talking to the provider.
	#[error(transparent)]
	Http(#[from] HttpError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Caller lacks permission for the requested action.
	#[error("Permission denied: {detail}")]
	PermissionDenied {
		/// Human-readable reason surfaced to the client.
		detail: String,
	},
	/// Requested resource (usually a backend) does not exist.
	#[error("Not found: {detail}")]
	NotFound {
		/// Human-readable reason surfaced to the client.
		detail: String,
	},
	/// Generic API failure carrying its own status code.
	#[error("API error ({status}): {detail}")]
	Api {
		/// HTTP status code to respond with.
		status: u16,
		/// Human-readable reason surfaced to the client.
		detail: String,
	},
}
impl Error {
	/// Builds a [`Error::PermissionDenied`] with the provided detail.
	pub fn permission_denied(detail: impl Into<String>) -> Self {
		Self::PermissionDenied { detail: detail.into() }
	}

	/// Builds a [`Error::NotFound`] with the provided detail.
	pub fn not_found(detail: impl Into<String>) -> Self {
		Self::NotFound { detail: detail.into() }
	}

	/// Builds a [`Error::Api`] with the provided status and detail.
	pub fn api(status: StatusCode, detail: impl Into<String>) -> Self {
		Self::Api { status: status.as_u16(), detail: detail.into() }
	}

	/// Returns true for the failures a provider completion may legitimately raise.
	pub fn is_completion_failure(&self) -> bool {
		matches!(self, Self::Auth(_) | Self::Http(_))
	}

	/// HTTP status the error is rendered with.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(_) | Self::Auth(_) | Self::Http(_) => StatusCode::BAD_REQUEST,
			Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
			Self::NotFound { .. } => StatusCode::NOT_FOUND,
			Self::Api { status, .. } =>
				StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
			Self::Storage(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = self.status();

		match self {
			Self::Validation(errors) => (status, Json(errors)).into_response(),
			// Completion failures are logged at the call site and answered without a body.
			Self::Auth(_) | Self::Http(_) => status.into_response(),
			Self::PermissionDenied { detail }
			| Self::NotFound { detail }
			| Self::Api { detail, .. } =>
				(status, Json(serde_json::json!({ "detail": detail }))).into_response(),
			Self::Storage(_) | Self::Config(_) => {
				tracing::error!(error = %self, "request failed with a server error");

				(status, Json(serde_json::json!({ "detail": "A server error occurred." })))
					.into_response()
			},
		}
	}
}

/// Field-level validation failures keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ThisError)]
#[error("Invalid input for {} field(s).", .fields.len())]
#[serde(transparent)]
pub struct ValidationError {
	/// Messages collected for each offending field.
	pub fields: BTreeMap<String, Vec<String>>,
}
impl ValidationError {
	/// Records a message against a field.
	pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
		self.fields.entry(field.into()).or_default().push(message.into());
	}

	/// Returns true when no field failed validation.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Messages recorded against `field`, if any.
	pub fn messages(&self, field: &str) -> Option<&[String]> {
		self.fields.get(field).map(Vec::as_slice)
	}
}

/// Authentication failures reported by a social backend.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Provider refused or the user canceled the grant.
	#[error("Authentication process canceled: {reason}.")]
	Canceled {
		/// Provider- or backend-supplied reason string.
		reason: String,
	},
	/// Provider response could not be turned into an identity.
	#[error("Authentication failed: {reason}.")]
	Failed {
		/// Provider- or backend-supplied reason string.
		reason: String,
	},
	/// Request lacks a parameter the backend needs.
	#[error("Missing needed parameter {parameter}.")]
	MissingParameter {
		/// Name of the missing parameter.
		parameter: &'static str,
	},
	/// OAuth `state` verification failed.
	#[error("Session value state missing or mismatched.")]
	StateMismatch,
	/// Provider user data lacks the configured uid field.
	#[error("Provider user data is missing the `{field}` identifier.")]
	MissingUid {
		/// Configured uid field name.
		field: String,
	},
	/// Provider returned a payload that does not deserialize.
	#[error("Provider returned a malformed payload.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Social account is already linked to another local user.
	#[error("This {backend} account is already in use.")]
	AlreadyAssociated {
		/// Backend the social account belongs to.
		backend: String,
	},
	/// Local user is not allowed to authenticate (e.g. inactive).
	#[error("Your credentials aren't allowed.")]
	Forbidden,
	/// Backend does not implement the requested stage.
	#[error("Backend `{backend}` does not support {stage}.")]
	Unsupported {
		/// Backend name.
		backend: String,
		/// Stage label.
		stage: &'static str,
	},
}

/// HTTP-level failures raised while calling provider endpoints.
#[derive(Debug, ThisError)]
pub enum HttpError {
	/// Provider responded with a non-success status.
	#[error("Provider endpoint {url} responded with HTTP {status}.")]
	Status {
		/// HTTP status code returned by the provider.
		status: u16,
		/// Endpoint that failed.
		url: String,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
}
impl HttpError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for HttpError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Configuration and wiring failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI `{uri}` is invalid.")]
	InvalidRedirect {
		/// Offending redirect URI.
		uri: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Environment variable holds a value that does not parse.
	#[error("Setting `{key}` has an invalid value `{value}`.")]
	InvalidSetting {
		/// Setting key.
		key: &'static str,
		/// Raw value.
		value: String,
	},
	/// Response payload could not be serialized.
	#[error("Response payload could not be serialized.")]
	Serialization(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
