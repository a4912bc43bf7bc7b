//! Observability helpers for the social auth views.
//!
//! Every view run is wrapped in a `rest_social_auth.view` span carrying the `view` label and
//! the `stage` the request reached. With the `metrics` feature enabled, each attempt, success,
//! and failure increments the `rest_social_auth_login_total` counter labeled by `view` and
//! `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// View flavors observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewKind {
	/// Session cookie login.
	Session,
	/// Token-only login.
	TokenOnly,
	/// Token plus user fields login.
	TokenUser,
}
impl ViewKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ViewKind::Session => "session",
			ViewKind::TokenOnly => "token",
			ViewKind::TokenUser => "token_user",
		}
	}
}
impl Display for ViewKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each login attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoginOutcome {
	/// A request entered the view.
	Attempt,
	/// The login completed.
	Success,
	/// The request was answered with an error.
	Failure,
}
impl LoginOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			LoginOutcome::Attempt => "attempt",
			LoginOutcome::Success => "success",
			LoginOutcome::Failure => "failure",
		}
	}
}
impl Display for LoginOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Stages of a view run, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewStage {
	/// Payload extracted from the request.
	Received,
	/// Backend looked up and bound to the request.
	BackendAttached,
	/// Input serializer accepted the payload.
	InputValidated,
	/// OAuth 1.0a request token handed back to the client.
	OAuth1Stage1,
	/// Provider handshake and user mapping finished.
	Completed,
	/// Response rendered.
	Responded,
}
impl ViewStage {
	/// Returns a stable label suitable for span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ViewStage::Received => "received",
			ViewStage::BackendAttached => "backend_attached",
			ViewStage::InputValidated => "input_validated",
			ViewStage::OAuth1Stage1 => "oauth1_stage1",
			ViewStage::Completed => "completed",
			ViewStage::Responded => "responded",
		}
	}
}
