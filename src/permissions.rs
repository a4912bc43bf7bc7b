//! View-level permission checks.

// self
use crate::{_prelude::*, strategy::RequestContext};

/// Global permission evaluated before a view runs.
pub trait Permission
where
	Self: Send + Sync + Debug,
{
	/// Returns true when the request may proceed.
	fn has_permission(&self, request: &RequestContext) -> bool;

	/// Detail rendered when the check fails.
	fn message(&self) -> &str {
		"You do not have permission to perform this action."
	}
}

/// Lets every request through; the default for the social auth views.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAny;
impl Permission for AllowAny {
	fn has_permission(&self, _: &RequestContext) -> bool {
		true
	}
}

/// Requires an authenticated request user.
#[derive(Clone, Copy, Debug, Default)]
pub struct IsAuthenticated;
impl Permission for IsAuthenticated {
	fn has_permission(&self, request: &RequestContext) -> bool {
		request.is_authenticated()
	}

	fn message(&self) -> &str {
		"Authentication credentials were not provided."
	}
}

/// Runs every permission in order and fails on the first denial.
pub fn check_permissions(permissions: &[&dyn Permission], request: &RequestContext) -> Result<()> {
	match permissions.iter().find(|permission| !permission.has_permission(request)) {
		Some(permission) => Err(Error::permission_denied(permission.message())),
		None => Ok(()),
	}
}
