//! Input serializers for the two handshake families.

// self
use crate::{
	_prelude::*,
	backend::Protocol,
	error::ValidationError,
	serializers::{AuthData, FieldInfo},
};

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_STRING: &str = "Not a valid string.";

struct FieldSpec {
	name: &'static str,
	label: &'static str,
	required: bool,
}

const OAUTH1_FIELDS: &[FieldSpec] = &[
	FieldSpec { name: "provider", label: "Provider", required: true },
	FieldSpec { name: "oauth_token", label: "Oauth token", required: true },
	FieldSpec { name: "oauth_verifier", label: "Oauth verifier", required: true },
];
const OAUTH2_FIELDS: &[FieldSpec] = &[
	FieldSpec { name: "provider", label: "Provider", required: true },
	FieldSpec { name: "code", label: "Code", required: true },
	FieldSpec { name: "redirect_uri", label: "Redirect uri", required: false },
];

/// Input serializer variant chosen from the attached backend's protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSerializer {
	/// `provider`, `oauth_token`, `oauth_verifier`.
	OAuth1,
	/// `provider`, `code`, optional `redirect_uri`.
	OAuth2,
}
impl InputSerializer {
	/// Picks the variant for `protocol`.
	pub fn for_protocol(protocol: Protocol) -> Self {
		match protocol {
			Protocol::OAuth1 => Self::OAuth1,
			Protocol::OAuth2 => Self::OAuth2,
		}
	}

	/// Field descriptions keyed by field name.
	pub fn fields(self) -> BTreeMap<&'static str, FieldInfo> {
		self.specs()
			.iter()
			.map(|spec| {
				let info = FieldInfo {
					kind: "string",
					required: spec.required,
					read_only: false,
					label: spec.label,
				};

				(spec.name, info)
			})
			.collect()
	}

	/// Validates `data`, collecting every failing field.
	pub fn validate(self, data: &AuthData) -> Result<AuthInput, ValidationError> {
		let mut errors = ValidationError::default();
		let mut values = HashMap::new();

		for spec in self.specs() {
			match char_field(data.get(spec.name), spec.required) {
				Ok(Some(value)) => {
					values.insert(spec.name, value);
				},
				Ok(None) => (),
				Err(message) => errors.push(spec.name, message),
			}
		}

		if !errors.is_empty() {
			return Err(errors);
		}

		let mut take = |name: &str| values.remove(name);
		let input = match self {
			Self::OAuth1 => AuthInput::OAuth1(OAuth1Input {
				provider: take("provider").unwrap_or_default(),
				oauth_token: take("oauth_token").unwrap_or_default(),
				oauth_verifier: take("oauth_verifier").unwrap_or_default(),
			}),
			Self::OAuth2 => AuthInput::OAuth2(OAuth2Input {
				provider: take("provider").unwrap_or_default(),
				code: take("code").unwrap_or_default(),
				redirect_uri: take("redirect_uri"),
			}),
		};

		Ok(input)
	}

	fn specs(self) -> &'static [FieldSpec] {
		match self {
			Self::OAuth1 => OAUTH1_FIELDS,
			Self::OAuth2 => OAUTH2_FIELDS,
		}
	}
}

/// Validated request input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthInput {
	/// OAuth 1.0a second-stage input.
	OAuth1(OAuth1Input),
	/// OAuth 2.0 input.
	OAuth2(OAuth2Input),
}
impl AuthInput {
	/// Backend name the input targets.
	pub fn provider(&self) -> &str {
		match self {
			Self::OAuth1(input) => &input.provider,
			Self::OAuth2(input) => &input.provider,
		}
	}
}

/// OAuth 1.0a second-stage input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuth1Input {
	/// Backend name.
	pub provider: String,
	/// Authorized request token.
	pub oauth_token: String,
	/// Verifier returned by the provider.
	pub oauth_verifier: String,
}

/// OAuth 2.0 input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuth2Input {
	/// Backend name.
	pub provider: String,
	/// Authorization code.
	pub code: String,
	/// Redirect URI the code was issued for, when it differs from the default.
	pub redirect_uri: Option<String>,
}

// Strings are trimmed; numbers are accepted and stringified.
fn char_field(value: Option<&JsonValue>, required: bool) -> Result<Option<String>, &'static str> {
	let text = match value {
		None if required => return Err(REQUIRED),
		None => return Ok(None),
		Some(JsonValue::Null) => return Err(NOT_NULL),
		Some(JsonValue::String(text)) => text.trim().to_owned(),
		Some(JsonValue::Number(number)) => number.to_string(),
		Some(_) => return Err(NOT_STRING),
	};

	if text.is_empty() {
		return Err(NOT_BLANK);
	}

	Ok(Some(text))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn data(value: JsonValue) -> AuthData {
		value.as_object().cloned().expect("Fixture should be a JSON object.")
	}

	#[test]
	fn oauth2_input_accepts_optional_redirect() {
		let input = InputSerializer::OAuth2
			.validate(&data(serde_json::json!({ "provider": "facebook", "code": " abc " })))
			.expect("Valid input should pass.");

		assert_eq!(
			input,
			AuthInput::OAuth2(OAuth2Input {
				provider: "facebook".into(),
				code: "abc".into(),
				redirect_uri: None,
			})
		);
		assert_eq!(input.provider(), "facebook");
	}

	#[test]
	fn every_failing_field_is_reported() {
		let err = InputSerializer::OAuth2
			.validate(&data(serde_json::json!({ "provider": "facebook", "redirect_uri": "  " })))
			.expect_err("Missing code must fail.");

		assert_eq!(err.messages("code"), Some(&[REQUIRED.to_owned()][..]));
		assert_eq!(err.messages("redirect_uri"), Some(&[NOT_BLANK.to_owned()][..]));
		assert!(err.messages("provider").is_none());

		let err = InputSerializer::OAuth1
			.validate(&data(serde_json::json!({
				"provider": "twitter",
				"oauth_token": null,
				"oauth_verifier": ["x"]
			})))
			.expect_err("Null and non-string values must fail.");

		assert_eq!(err.messages("oauth_token"), Some(&[NOT_NULL.to_owned()][..]));
		assert_eq!(err.messages("oauth_verifier"), Some(&[NOT_STRING.to_owned()][..]));
	}

	#[test]
	fn numeric_values_are_stringified() {
		let input = InputSerializer::OAuth1
			.validate(&data(serde_json::json!({
				"provider": "twitter",
				"oauth_token": 1234,
				"oauth_verifier": "v"
			})))
			.expect("Numbers are valid strings.");

		assert!(matches!(input, AuthInput::OAuth1(OAuth1Input { ref oauth_token, .. }) if oauth_token == "1234"));
	}

	#[test]
	fn field_descriptions_follow_the_variant() {
		let fields = InputSerializer::for_protocol(Protocol::OAuth2).fields();

		assert_eq!(fields.keys().copied().collect::<Vec<_>>(), ["code", "provider", "redirect_uri"]);
		assert!(!fields["redirect_uri"].required);
		assert_eq!(fields["code"].label, "Code");

		let fields = InputSerializer::for_protocol(Protocol::OAuth1).fields();

		assert!(fields.contains_key("oauth_verifier"));
		assert!(!fields.contains_key("code"));
	}
}
