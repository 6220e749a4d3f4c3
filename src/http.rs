//! Transport primitives for gateway requests.
//!
//! The module exposes the owned [`ApiRequest`] descriptor the gateway attaches credentials to
//! and replays after renewal, the buffered [`ApiResponse`] it inspects, and the
//! [`HttpTransport`] trait that is the gateway's only dependency on an HTTP stack. Transports
//! never interpret status codes: any response that arrives is returned as `Ok`, and only
//! failures to obtain a response surface as [`TransportError`].

// crates.io
use ::http::{
	HeaderMap, HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransportError},
};
#[cfg(feature = "reqwest")] use crate::config::GatewayConfig;

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing gateway requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// clone of a gateway, and the returned futures must be `Send` so callers can spawn requests
/// onto multi-threaded executors. The same descriptor may be executed more than once when the
/// gateway replays it after a renewal; implementations must not consume state from it.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the response, whatever its status.
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Owned, replayable description of an outgoing request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Request headers, including the bearer credential once attached.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None, retried: false }
	}

	/// Serializes `body` as JSON and sets the matching content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: ::http::HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets `token` as the bearer credential, replacing any previous one.
	pub fn set_bearer(&mut self, token: &TokenSecret) -> Result<(), ConfigError> {
		self.headers.insert(AUTHORIZATION, token.bearer()?);

		Ok(())
	}

	/// Returns the attached `Authorization` header, if any.
	pub fn authorization(&self) -> Option<&HeaderValue> {
		self.headers.get(AUTHORIZATION)
	}

	/// Whether the request has already been replayed after a renewal.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}
}

/// Buffered HTTP response returned by an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// Response status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with empty headers.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Whether the status is in the 2xx range.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns the body lossily decoded as UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing field path on error.
	pub fn json<T>(&self, url: &Url) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { url: url.to_string(), source })
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Build it with [`ReqwestTransport::from_config`] so the configured timeout applies to every
/// call, renewal included; a timed-out call surfaces as [`TransportError::Timeout`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring the gateway's timeout.
	pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(config.timeout).build()?;

		Ok(Self(client))
	}

	fn map_error(url: &Url, e: ReqwestError) -> TransportError {
		if e.is_timeout() {
			TransportError::timeout(url, e)
		} else {
			TransportError::network(url, e)
		}
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let ApiRequest { method, url, headers, body, .. } = request;
			let mut builder = client.request(method, url.clone()).headers(headers);

			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(|e| Self::map_error(&url, e))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(|e| Self::map_error(&url, e))?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}
