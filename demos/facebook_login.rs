//! Serves the social login routes with a Facebook backend on `127.0.0.1:8000`.
//!
//! Set `FACEBOOK_CLIENT_ID` and `FACEBOOK_CLIENT_SECRET`, then post the authorization code the
//! front-end received to `/social/token/facebook/`.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use tokio::net::TcpListener;
use url::Url;
// self
use rest_social_auth::{
	auth::BackendName,
	backend::{BackendRegistry, ReqwestOAuth2Backend},
	config::Settings,
	provider::{ClientAuthMethod, ProviderDescriptor, ProviderQuirks, UserInfoAuth},
	store::{MemoryStorage, SocialStorage},
	urls::{SocialAuthState, urls},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let descriptor = ProviderDescriptor::builder(BackendName::new("facebook")?)
		.token_endpoint(Url::parse("https://graph.facebook.com/v19.0/oauth/access_token")?)
		.user_info_endpoint(Url::parse("https://graph.facebook.com/v19.0/me?fields=id,name,email")?)
		.scopes(["email"])
		.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
		.quirks(ProviderQuirks { user_info_auth: UserInfoAuth::QueryParameter, ..Default::default() })
		.build()?;
	let client_id = env::var("FACEBOOK_CLIENT_ID")?;
	let client_secret = env::var("FACEBOOK_CLIENT_SECRET")?;
	let mut backends = BackendRegistry::default();

	backends.register(Arc::new(ReqwestOAuth2Backend::new(
		descriptor,
		&client_id,
		Some(&client_secret),
	)?));

	let storage: Arc<dyn SocialStorage> = Arc::new(MemoryStorage::default());
	let state = SocialAuthState::new(Settings::from_env()?, storage, backends);
	let listener = TcpListener::bind("127.0.0.1:8000").await?;

	println!("Listening on http://{}.", listener.local_addr()?);

	axum::serve(listener, urls(state)).await?;

	Ok(())
}
