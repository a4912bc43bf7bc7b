//! API token logins.

// self
use crate::{obs::ViewKind, serializers::OutputSerializer, views::SocialAuthView};

/// Answers with the user's API token only.
#[derive(Clone, Copy, Debug, Default)]
pub struct SocialTokenOnlyAuthView;
impl SocialAuthView for SocialTokenOnlyAuthView {
	fn kind(&self) -> ViewKind {
		ViewKind::TokenOnly
	}

	fn name(&self) -> &'static str {
		"Social Token Only Auth"
	}

	fn serializer(&self) -> OutputSerializer {
		OutputSerializer::Token
	}
}

/// Answers with the user fields plus the user's API token.
#[derive(Clone, Copy, Debug, Default)]
pub struct SocialTokenUserAuthView;
impl SocialAuthView for SocialTokenUserAuthView {
	fn kind(&self) -> ViewKind {
		ViewKind::TokenUser
	}

	fn name(&self) -> &'static str {
		"Social Token User Auth"
	}

	fn serializer(&self) -> OutputSerializer {
		OutputSerializer::UserToken
	}
}
