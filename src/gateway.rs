//! Authenticated request gateway.
//!
//! [`Gateway`] wraps an [`HttpTransport`] with two hooks. Before a request leaves, the current
//! access token is read from the [`CredentialStore`] and attached as a bearer credential. When
//! a response comes back with the configured auth-failure status, the request is parked behind a
//! single shared renewal (see [`renewal`]) and replayed once with the renewed credential.
//! Non-auth failures, transport errors, and a second auth failure after a replay all propagate
//! to the caller unchanged.

pub mod login;
pub mod renewal;

pub use login::*;
pub use renewal::*;

// crates.io
use ::http::Method;
// self
use crate::{
	_prelude::*,
	auth::CredentialKey,
	config::GatewayConfig,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{FlowKind, FlowSpan},
	session::SessionExpiredHandler,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Attaches credentials to outgoing requests and renews them transparently.
///
/// Clones share the renewal coordinator, so every clone participates in the same renewal
/// waves.
pub struct Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound request, renewal included.
	pub transport: Arc<T>,
	/// Credential store holding the access and refresh tokens.
	pub store: Arc<dyn CredentialStore>,
	/// Handler invoked when the session cannot be renewed.
	pub session_handler: Arc<dyn SessionExpiredHandler>,
	/// Resolved gateway configuration.
	pub config: GatewayConfig,
	/// Shared counters for renewal outcomes.
	pub renewal_metrics: Arc<RenewalMetrics>,
	renewal: Arc<RenewalCoordinator>,
}
impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a gateway around a caller-provided transport.
	pub fn with_transport(
		config: GatewayConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
		session_handler: Arc<dyn SessionExpiredHandler>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			session_handler,
			config,
			renewal_metrics: Default::default(),
			renewal: Default::default(),
		}
	}

	/// Whether a renewal is currently in flight.
	pub fn is_renewing(&self) -> bool {
		self.renewal.is_renewing()
	}

	/// Number of requests parked behind the in-flight renewal.
	pub fn queued_requests(&self) -> usize {
		self.renewal.queued()
	}

	/// Builds a request for `path` relative to the base URL, carrying the default headers.
	pub fn request(&self, method: Method, path: &str) -> Result<ApiRequest> {
		let mut request = ApiRequest::new(method, self.config.endpoint(path)?);

		request.headers = self.config.default_headers.clone();

		Ok(request)
	}

	/// Sends a `GET` request to `path`.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.send(self.request(Method::GET, path)?).await
	}

	/// Sends a `DELETE` request to `path`.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.send(self.request(Method::DELETE, path)?).await
	}

	/// Sends a `POST` request with a JSON body to `path`.
	pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(self.request(Method::POST, path)?.json(body)?).await
	}

	/// Sends a `PUT` request with a JSON body to `path`.
	pub async fn put_json<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(self.request(Method::PUT, path)?.json(body)?).await
	}

	/// Sends a `PATCH` request with a JSON body to `path`.
	pub async fn patch_json<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.send(self.request(Method::PATCH, path)?.json(body)?).await
	}

	/// Sends `request` with the current credential, renewing and replaying it once on an auth
	/// failure.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let span = FlowSpan::new(FlowKind::Request, "send");
		let result: Result<ApiResponse> = span
			.instrument(async move {
				let mut request = request;

				self.attach_credential(&mut request).await?;

				match self.dispatch(request.clone()).await {
					Ok(response) => Ok(response),
					Err(err) => self.handle_failure(request, err).await,
				}
			})
			.await;

		span.finish(&result);

		result
	}

	/// Pre-send hook: sets the stored access token as the bearer credential.
	///
	/// A missing or empty token is not an error; the request goes out unauthenticated.
	pub async fn attach_credential(&self, request: &mut ApiRequest) -> Result<()> {
		let token = self.store.get(CredentialKey::Access).await?;

		if let Some(token) = token.filter(|token| !token.is_empty()) {
			request.set_bearer(&token)?;
		}

		Ok(())
	}

	/// Post-receive hook: recovers `error` through a renewal when it is the first auth failure
	/// seen by `request`, and returns it unchanged otherwise.
	pub async fn handle_failure(
		&self,
		mut request: ApiRequest,
		error: Error,
	) -> Result<ApiResponse> {
		if !self.is_auth_failure(&error) || request.is_retried() {
			return Err(error);
		}

		request.mark_retried();

		self.coordinate_renewal(request, error).await
	}

	/// Whether `error` carries the configured auth-failure status.
	pub fn is_auth_failure(&self, error: &Error) -> bool {
		error.status().is_some_and(|status| self.config.is_auth_failure(status))
	}

	/// Executes `request` exactly as given, mapping non-2xx responses to [`Error::Status`].
	pub(crate) async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		let url = request.url.to_string();
		let response = self.transport.execute(request).await?;

		if response.is_success() {
			Ok(response)
		} else {
			Err(Error::Status { status: response.status.as_u16(), url, body: response.text() })
		}
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a gateway that provisions its own reqwest transport from `config`.
	pub fn new(
		config: GatewayConfig,
		store: Arc<dyn CredentialStore>,
		session_handler: Arc<dyn SessionExpiredHandler>,
	) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, transport, store, session_handler))
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			session_handler: self.session_handler.clone(),
			config: self.config.clone(),
			renewal_metrics: self.renewal_metrics.clone(),
			renewal: self.renewal.clone(),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("base_url", &self.config.base_url.as_str())
			.field("renewing", &self.is_renewing())
			.field("queued_requests", &self.queued_requests())
			.finish()
	}
}
