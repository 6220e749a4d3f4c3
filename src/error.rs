//! Gateway-level error types shared across the transport, store, and renewal layers.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Credential renewal failed; the session is over.
	#[error(transparent)]
	Renewal(#[from] RenewalError),

	/// Server answered with a non-success status.
	#[error("Request to {url} failed with HTTP status {status}.")]
	Status {
		/// HTTP status code returned by the server.
		status: u16,
		/// Request URL that produced the response.
		url: String,
		/// Raw response body, lossily decoded.
		body: String,
	},
	/// Response body could not be decoded into the requested type.
	#[error("Response body from {url} could not be decoded.")]
	Decode {
		/// Request URL that produced the response.
		url: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns the HTTP status carried by [`Error::Status`], if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Whether this error ended the session (renewal failed or was impossible).
	pub fn is_session_expired(&self) -> bool {
		matches!(self, Self::Renewal(e) if *e != RenewalError::Abandoned)
	}
}

/// Configuration and request-construction failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Gateway configuration failed validation.
	#[error(transparent)]
	Gateway(#[from] crate::config::GatewayConfigError),
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header value contains characters that cannot be sent.
	#[error("Header value is invalid.")]
	InvalidHeader(#[from] ::http::header::InvalidHeaderValue),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Request URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The transport gave up waiting for a response.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Request URL.
		url: String,
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { url: url.to_string(), source: Box::new(src) }
	}
}

/// Renewal failures broadcast to every request waiting on the same renewal.
///
/// The type is [`Clone`] because one outcome settles the whole renewal wave.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RenewalError {
	/// No refresh token is stored, so renewal cannot be attempted.
	#[error("No refresh token is stored; the session cannot be renewed.")]
	MissingRefreshToken,
	/// Renewal request could not be built.
	#[error("Renewal request could not be built: {message}.")]
	Request {
		/// Rendered construction failure.
		message: String,
	},
	/// Renewal endpoint answered with a non-success status.
	#[error("Renewal endpoint rejected the refresh token with HTTP status {status}: {message}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Response body preview.
		message: String,
	},
	/// Renewal call never produced a response (network failure or timeout).
	#[error("Renewal request failed in transport: {message}.")]
	Transport {
		/// Rendered transport failure.
		message: String,
	},
	/// Renewal endpoint answered 2xx with a body lacking a usable access token.
	#[error("Renewal endpoint returned a malformed response: {message}.")]
	MalformedResponse {
		/// Rendered parsing failure.
		message: String,
	},
	/// Renewed credentials could not be persisted.
	#[error("Renewed credentials could not be stored: {0}")]
	Storage(crate::store::StoreError),
	/// The renewal owner went away before settling the outcome.
	#[error("Renewal was abandoned before it completed.")]
	Abandoned,
}
impl From<TransportError> for RenewalError {
	fn from(e: TransportError) -> Self {
		let mut message = e.to_string();
		let mut source = StdError::source(&e);

		while let Some(inner) = source {
			message.push_str(": ");
			message.push_str(&inner.to_string());

			source = inner.source();
		}

		Self::Transport { message }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn renewal_error_flattens_transport_sources() {
		let url = Url::parse("https://api.example.com/token/refresh/")
			.expect("Renewal URL fixture should parse.");
		let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline elapsed");
		let renewal = RenewalError::from(TransportError::timeout(&url, io));

		match renewal {
			RenewalError::Transport { message } => {
				assert!(message.contains("timed out"));
				assert!(message.contains("deadline elapsed"));
			},
			other => panic!("Unexpected renewal error variant: {other:?}."),
		}
	}

	#[test]
	fn status_accessor_only_reports_status_errors() {
		let err = Error::Status {
			status: 401,
			url: "https://api.example.com/questions/".into(),
			body: String::new(),
		};

		assert_eq!(err.status(), Some(401));
		assert!(!err.is_session_expired());

		let err = Error::from(RenewalError::MissingRefreshToken);

		assert_eq!(err.status(), None);
		assert!(err.is_session_expired());
		assert!(!Error::from(RenewalError::Abandoned).is_session_expired());
	}
}
