// self
use crate::_prelude::*;

/// How the access token is presented to the user-info endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserInfoAuth {
	#[default]
	/// `Authorization: Bearer <token>` header.
	BearerHeader,
	/// `access_token=<token>` query parameter (Facebook Graph style).
	QueryParameter,
}

/// Field names used to read identity details out of the user-info payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDataFields {
	/// Field carrying the provider-side account id.
	pub uid: String,
	/// Field carrying the preferred login name.
	pub username: String,
	/// Field carrying the email address.
	pub email: String,
	/// Field carrying the given name.
	pub first_name: String,
	/// Field carrying the family name.
	pub last_name: String,
	/// Field carrying the display name, split when given/family names are absent.
	pub fullname: String,
}
impl Default for UserDataFields {
	fn default() -> Self {
		Self {
			uid: "id".into(),
			username: "username".into(),
			email: "email".into(),
			first_name: "first_name".into(),
			last_name: "last_name".into(),
			fullname: "name".into(),
		}
	}
}

/// Provider-specific quirks that influence how the backend behaves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Token placement for the user-info call.
	pub user_info_auth: UserInfoAuth,
	/// User-info payload field mapping.
	pub user_data_fields: UserDataFields,
}
