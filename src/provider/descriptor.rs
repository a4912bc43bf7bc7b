//! Provider descriptor data structures and helpers shared by OAuth 2.0 backends.
//!
//! The module exposes validated metadata plus supporting builder utilities so providers can
//! describe their endpoints in a transport-agnostic way.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use quirks::*;

// self
use crate::{_prelude::*, auth::BackendName};

/// Preferred client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Token endpoint used for the code exchange.
	pub token: Url,
	/// Endpoint returning the authenticated user's profile.
	pub user_info: Url,
}

/// Immutable provider descriptor consumed by [`OAuth2Backend`](crate::backend::OAuth2Backend).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Backend name the descriptor is registered under.
	pub name: BackendName,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Scopes requested by the front-end; echoed into the token exchange when non-empty.
	pub scopes: Vec<String>,
	/// Preferred client authentication mechanism.
	pub preferred_client_auth_method: ClientAuthMethod,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided backend name.
	pub fn builder(name: BackendName) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(name)
	}
}
