//! Input validation and output rendering for the social auth views.

pub mod input;
pub mod output;

pub use input::*;
pub use output::*;

// self
use crate::_prelude::*;

/// Request payload: body fields plus the `provider` taken from the URL.
pub type AuthData = JsonMap<String, JsonValue>;

/// Field description rendered by `OPTIONS` introspection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
	/// Field type; every social auth input is a string.
	#[serde(rename = "type")]
	pub kind: &'static str,
	/// Whether the field must be supplied.
	pub required: bool,
	/// Whether the field is output-only.
	pub read_only: bool,
	/// Human-readable label.
	pub label: &'static str,
}
