//! Session lifecycle helpers: login, logout, and the "is session valid" predicate route guards
//! call before entering protected views.

// crates.io
use ::http::Method;
// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, CredentialPair},
	gateway::Gateway,
	http::{ApiRequest, HttpTransport},
	obs::{FlowKind, FlowSpan},
};

/// Payload returned by the login endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
	/// Issued access + refresh tokens (the `access` and `refresh` fields).
	#[serde(flatten)]
	pub credentials: CredentialPair,
	/// User profile returned alongside the tokens.
	#[serde(default)]
	pub user: serde_json::Value,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
	username: &'a str,
	password: &'a str,
}

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Exchanges a username and password for a credential pair and stores it.
	///
	/// Login goes out without a bearer credential and never triggers a renewal: a rejected
	/// login is reported as the [`Error::Status`] it produced.
	pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
		let span = FlowSpan::new(FlowKind::Session, "login");
		let result: Result<LoginResponse> = span
			.instrument(async move {
				let url = self.config.login_url.clone();
				let mut request = ApiRequest::new(Method::POST, url.clone());

				request.headers = self.config.default_headers.clone();

				let request = request.json(&LoginRequest { username, password })?;
				let login: LoginResponse = self.dispatch(request).await?.json(&url)?;

				self.store.save_pair(login.credentials.clone()).await?;

				Ok(login)
			})
			.await;

		span.finish(&result);

		result
	}

	/// Drops both stored credentials. The backend keeps no session state, so nothing is sent.
	pub async fn logout(&self) -> Result<()> {
		let span = FlowSpan::new(FlowKind::Session, "logout");
		let result: Result<()> = span.instrument(async move { Ok(self.store.clear().await?) }).await;

		span.finish(&result);

		result
	}

	/// Whether an access token is stored; route guards call this before protected views.
	pub async fn is_session_valid(&self) -> Result<bool> {
		Ok(self
			.store
			.get(CredentialKey::Access)
			.await?
			.is_some_and(|token| !token.is_empty()))
	}
}
