//! Social login REST endpoints for axum: exchange an OAuth 1.0a/2.0 provider credential for a
//! session cookie, an API token, or both, in one POST.

#![deny(clippy::all, missing_docs)]

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod metadata;
pub mod oauth;
pub mod obs;
pub mod permissions;
pub mod provider;
pub mod serializers;
pub mod store;
pub mod strategy;
pub mod urls;
pub mod views;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or
	//! the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		auth::BackendName,
		backend::{
			Backend, BackendFuture, BackendRegistry, HandshakeContext, Protocol, ProviderIdentity,
		},
		config::Settings,
		error::{AuthError, HttpError},
		http::ReqwestHttpClient,
		serializers::AuthData,
		store::{MemoryStorage, SocialStorage},
		urls::SocialAuthState,
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Wires a [`SocialAuthState`] around an in-memory storage and the provided backends.
	pub fn build_test_state(
		settings: Settings,
		backends: impl IntoIterator<Item = Arc<dyn Backend>>,
	) -> (SocialAuthState, Arc<MemoryStorage>) {
		let storage_backend = Arc::new(MemoryStorage::default());
		let storage: Arc<dyn SocialStorage> = storage_backend.clone();
		let mut registry = BackendRegistry::default();

		for backend in backends {
			registry.register(backend);
		}

		(SocialAuthState::new(settings, storage, registry), storage_backend)
	}

	/// Outcome scripted into a [`RecordingBackend`].
	#[derive(Clone, Debug)]
	pub enum ScriptedOutcome {
		/// Completion succeeds with the provided uid and email.
		Identity {
			/// Provider-side user identifier.
			uid: String,
			/// Email reported by the provider.
			email: String,
		},
		/// Completion fails with an [`AuthError::Canceled`].
		AuthFailure,
		/// Completion fails with an [`HttpError::Status`].
		HttpFailure(u16),
	}
	impl ScriptedOutcome {
		fn into_result(self) -> Result<(String, String)> {
			match self {
				Self::Identity { uid, email } => Ok((uid, email)),
				Self::AuthFailure =>
					Err(AuthError::Canceled { reason: "Provider denied the grant.".into() }.into()),
				Self::HttpFailure(status) =>
					Err(HttpError::Status { status, url: "https://fake.example.com".into() }.into()),
			}
		}
	}

	/// Fake provider backend that records every handshake context it receives.
	#[derive(Debug)]
	pub struct RecordingBackend {
		name: BackendName,
		protocol: Protocol,
		outcome: ScriptedOutcome,
		unauthorized_token: String,
		completions: AtomicUsize,
		stage_one_calls: AtomicUsize,
		contexts: Mutex<Vec<HandshakeContext>>,
	}
	impl RecordingBackend {
		/// Creates an OAuth 2.0 flavored fake.
		pub fn oauth2(name: &str, outcome: ScriptedOutcome) -> Self {
			Self::new(name, Protocol::OAuth2, outcome)
		}

		/// Creates an OAuth 1.0a flavored fake that hands out `unauthorized_token` in stage 1.
		///
		/// Failing outcomes fail stage 1 as well.
		pub fn oauth1(name: &str, outcome: ScriptedOutcome, unauthorized_token: &str) -> Self {
			let mut backend = Self::new(name, Protocol::OAuth1, outcome);

			backend.unauthorized_token = unauthorized_token.to_owned();

			backend
		}

		fn new(name: &str, protocol: Protocol, outcome: ScriptedOutcome) -> Self {
			Self {
				name: BackendName::new(name).expect("Fake backend name should be valid."),
				protocol,
				outcome,
				unauthorized_token: String::new(),
				completions: AtomicUsize::new(0),
				stage_one_calls: AtomicUsize::new(0),
				contexts: Mutex::new(Vec::new()),
			}
		}

		/// Number of `auth_complete` invocations observed so far.
		pub fn completions(&self) -> usize {
			self.completions.load(Ordering::SeqCst)
		}

		/// Number of `unauthorized_token` invocations observed so far.
		pub fn stage_one_calls(&self) -> usize {
			self.stage_one_calls.load(Ordering::SeqCst)
		}

		/// Handshake context captured by the most recent completion.
		pub fn last_context(&self) -> Option<HandshakeContext> {
			self.contexts.lock().last().cloned()
		}
	}
	impl Backend for RecordingBackend {
		fn name(&self) -> &BackendName {
			&self.name
		}

		fn protocol(&self) -> Protocol {
			self.protocol
		}

		fn unauthorized_token<'a>(&'a self, _ctx: &'a HandshakeContext) -> BackendFuture<'a, String> {
			self.stage_one_calls.fetch_add(1, Ordering::SeqCst);

			let result =
				self.outcome.clone().into_result().map(|_| self.unauthorized_token.clone());

			Box::pin(async move { result })
		}

		fn auth_complete<'a>(
			&'a self,
			ctx: &'a HandshakeContext,
		) -> BackendFuture<'a, ProviderIdentity> {
			self.completions.fetch_add(1, Ordering::SeqCst);
			self.contexts.lock().push(ctx.clone());

			let outcome = self.outcome.clone();

			Box::pin(async move {
				let (uid, email) = outcome.into_result()?;
				let mut identity = ProviderIdentity::new(uid);

				identity.details.username = email.split('@').next().map(str::to_owned);
				identity.details.email = Some(email);
				identity.extra_data.insert("access_token".into(), "fake-access".into());

				Ok(identity)
			})
		}
	}

	/// Builds an [`AuthData`] map from string pairs.
	pub fn auth_data<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> AuthData {
		pairs.into_iter().map(|(key, value)| (key.to_owned(), value.into())).collect()
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map as JsonMap, Value as JsonValue};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use axum;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))]
use {color_eyre as _, httpmock as _, tower as _, tracing_subscriber as _};
