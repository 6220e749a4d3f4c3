//! Gateway configuration: backend location, endpoint paths, timeout, and auth-failure status.

// std
use std::time::Duration as StdDuration;
// crates.io
use ::http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE};
// self
use crate::{_prelude::*, error::ConfigError};

/// Errors raised while constructing or validating a [`GatewayConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum GatewayConfigError {
	/// Base URL must use `http` or `https`.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot carry relative paths (e.g., `mailto:` or `data:` URLs).
	#[error("The base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoint paths are joined onto the base URL and must stay relative.
	#[error("The {endpoint} path must be relative to the base URL: {path}.")]
	AbsoluteEndpointPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Offending path.
		path: String,
	},
	/// A zero timeout would fail every request immediately.
	#[error("The request timeout must be greater than zero.")]
	ZeroTimeout,
	/// Only client-error statuses can signal a rejected credential.
	#[error("The auth-failure status must be a 4xx code, got {status}.")]
	InvalidAuthFailureStatus {
		/// Status that was supplied.
		status: u16,
	},
}

/// Resolved gateway configuration.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
	/// Base URL every request path is joined onto; always ends with `/`.
	pub base_url: Url,
	/// Absolute URL of the credential renewal endpoint.
	pub renewal_url: Url,
	/// Absolute URL of the login endpoint.
	pub login_url: Url,
	/// Timeout applied to every transport call, renewal included.
	pub timeout: StdDuration,
	/// Status code that signals an invalid or expired access token.
	pub auth_failure_status: StatusCode,
	/// Headers added to every request built through the gateway helpers.
	pub default_headers: HeaderMap,
}
impl GatewayConfig {
	/// Default transport timeout.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(5);
	/// Default renewal endpoint path, relative to the base URL.
	pub const DEFAULT_RENEWAL_PATH: &'static str = "token/refresh/";
	/// Default login endpoint path, relative to the base URL.
	pub const DEFAULT_LOGIN_PATH: &'static str = "users/login/";

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Resolves a request path against the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Whether `status` marks a rejected access token.
	pub fn is_auth_failure(&self, status: u16) -> bool {
		self.auth_failure_status.as_u16() == status
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	/// Backend base URL.
	pub base_url: Url,
	/// Renewal endpoint path relative to the base URL.
	pub renewal_path: String,
	/// Login endpoint path relative to the base URL.
	pub login_path: String,
	/// Transport timeout.
	pub timeout: StdDuration,
	/// Auth-failure status code.
	pub auth_failure_status: u16,
	/// Headers added to every request.
	pub default_headers: HeaderMap,
}
impl GatewayConfigBuilder {
	/// Creates a new builder seeded with the provided base URL and defaults.
	pub fn new(base_url: Url) -> Self {
		let mut default_headers = HeaderMap::new();

		default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Self {
			base_url,
			renewal_path: GatewayConfig::DEFAULT_RENEWAL_PATH.into(),
			login_path: GatewayConfig::DEFAULT_LOGIN_PATH.into(),
			timeout: GatewayConfig::DEFAULT_TIMEOUT,
			auth_failure_status: StatusCode::UNAUTHORIZED.as_u16(),
			default_headers,
		}
	}

	/// Overrides the renewal endpoint path.
	pub fn renewal_path(mut self, path: impl Into<String>) -> Self {
		self.renewal_path = path.into();

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the transport timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the status code treated as an authentication failure.
	pub fn auth_failure_status(mut self, status: u16) -> Self {
		self.auth_failure_status = status;

		self
	}

	/// Adds or replaces a default header.
	pub fn default_header(mut self, name: ::http::HeaderName, value: HeaderValue) -> Self {
		self.default_headers.insert(name, value);

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<GatewayConfig, GatewayConfigError> {
		let base_url = normalize_base(self.base_url)?;
		let renewal_url = resolve_endpoint(&base_url, "renewal", &self.renewal_path)?;
		let login_url = resolve_endpoint(&base_url, "login", &self.login_path)?;

		if self.timeout.is_zero() {
			return Err(GatewayConfigError::ZeroTimeout);
		}

		let auth_failure_status = StatusCode::from_u16(self.auth_failure_status)
			.ok()
			.filter(StatusCode::is_client_error)
			.ok_or(GatewayConfigError::InvalidAuthFailureStatus {
				status: self.auth_failure_status,
			})?;

		Ok(GatewayConfig {
			base_url,
			renewal_url,
			login_url,
			timeout: self.timeout,
			auth_failure_status,
			default_headers: self.default_headers,
		})
	}
}

fn normalize_base(mut url: Url) -> Result<Url, GatewayConfigError> {
	if !matches!(url.scheme(), "http" | "https") {
		return Err(GatewayConfigError::UnsupportedScheme { url: url.to_string() });
	}
	if url.cannot_be_a_base() {
		return Err(GatewayConfigError::CannotBeABase { url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}

fn resolve_endpoint(
	base: &Url,
	endpoint: &'static str,
	path: &str,
) -> Result<Url, GatewayConfigError> {
	let absolute = || GatewayConfigError::AbsoluteEndpointPath { endpoint, path: path.to_owned() };

	if path.starts_with('/') || Url::parse(path).is_ok() {
		return Err(absolute());
	}

	base.join(path).map_err(|_| absolute())
}
