//! `OPTIONS` introspection for the social auth views.
//!
//! The document mirrors a browsable-API metadata response: the view's name and description,
//! the media types it renders and parses, and, for each write method the caller may use, the
//! fields the input serializer expects.

// crates.io
use axum::http::Method;
// self
use crate::{
	_prelude::*,
	serializers::{FieldInfo, InputSerializer},
	strategy::RequestContext,
};

const RENDERS: &[&str] = &["application/json"];
const PARSES: &[&str] = &["application/json", "application/x-www-form-urlencoded"];

/// View surface needed to build its metadata document.
pub trait IntrospectableView {
	/// Human-readable view name.
	fn name(&self) -> &str;

	/// Human-readable view description.
	fn description(&self) -> &str;

	/// HTTP methods the view answers.
	fn allowed_methods(&self) -> &[Method];

	/// Global permission check.
	fn check_permissions(&self, request: &RequestContext) -> Result<()>;

	/// Object-level lookup run for `PUT`.
	fn get_object(&self, request: &RequestContext) -> Result<()> {
		let _ = request;

		Ok(())
	}

	/// Input serializer the view validates with.
	fn serializer_in(&self) -> InputSerializer;
}

/// Fields accepted per write method, keyed by method name.
pub type Actions = BTreeMap<String, BTreeMap<&'static str, FieldInfo>>;

/// Describes the input fields of every write method the request may use.
///
/// Methods whose permission or object checks fail with a permission, API, or not-found error
/// are omitted; any other error is propagated.
pub fn determine_actions<V>(view: &V, request: &RequestContext) -> Result<Actions>
where
	V: ?Sized + IntrospectableView,
{
	let mut actions = Actions::new();

	for method in [Method::PUT, Method::POST] {
		if !view.allowed_methods().contains(&method) {
			continue;
		}

		let outcome = view.check_permissions(request).and_then(|()| {
			if method == Method::PUT { view.get_object(request) } else { Ok(()) }
		});

		match outcome {
			Ok(()) => {
				actions.insert(method.to_string(), view.serializer_in().fields());
			},
			Err(Error::PermissionDenied { .. } | Error::Api { .. } | Error::NotFound { .. }) => (),
			Err(e) => return Err(e),
		}
	}

	Ok(actions)
}

/// Builds the full metadata document served on `OPTIONS`.
pub fn metadata<V>(view: &V, request: &RequestContext) -> Result<JsonValue>
where
	V: ?Sized + IntrospectableView,
{
	let actions = determine_actions(view, request)?;
	let mut document = serde_json::json!({
		"name": view.name(),
		"description": view.description(),
		"renders": RENDERS,
		"parses": PARSES,
	});

	if !actions.is_empty() {
		document["actions"] = serde_json::to_value(actions).map_err(crate::error::ConfigError::from)?;
	}

	Ok(document)
}
