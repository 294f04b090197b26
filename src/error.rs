//! Crate-level error types shared across the client, stores, and guards.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Store(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or decoding problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Backend rejected the request outside the authentication protocol.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// The session token was rejected and cannot be refreshed.
	#[error(transparent)]
	AuthToken(#[from] AuthTokenError),
	/// A shared refresh cycle failed; every caller queued on it receives this same failure.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
}
impl Error {
	/// Returns `true` for the non-refreshable token sentinel, which server-rendered callers
	/// convert into their own redirect.
	pub fn is_auth_token_error(&self) -> bool {
		matches!(self, Self::AuthToken(_))
	}
}

/// Sentinel raised when the session token is invalid or revoked and no refresh can help.
///
/// Interactive contexts terminate the session before raising it; server-rendered callers
/// receive it unchanged so the rendering layer can clear its request-scoped store and issue
/// its own redirect (see [`guard::recover_token_error`](crate::guard::recover_token_error)).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ThisError)]
#[error("Error with authentication token.")]
pub struct AuthTokenError;

/// Failure response returned by the backend outside the authentication protocol.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Backend returned HTTP {status}: {message}")]
pub struct ApiError {
	/// HTTP status code of the failed response.
	pub status: u16,
	/// Application-level error code attached to the body, if any.
	pub code: Option<String>,
	/// Human-readable failure summary.
	pub message: String,
}

/// Failure of one shared refresh cycle.
///
/// Every caller queued on the cycle receives a clone of the same value, so the underlying
/// failure is reference-counted rather than duplicated.
#[derive(Clone, Debug)]
pub struct RefreshError {
	/// Failure that ended the cycle, shared by every queued caller.
	pub source: Arc<Error>,
}
impl RefreshError {
	/// Wraps the failure that ended a refresh cycle.
	pub fn new(source: Error) -> Self {
		Self { source: Arc::new(source) }
	}
}
impl Display for RefreshError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Session refresh failed.")
	}
}
impl std::error::Error for RefreshError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(self.source.as_ref())
	}
}

/// Configuration and decoding failures raised locally.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request URL could not be assembled from the base URL and path.
	#[error("Request URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestEncode {
		/// Structured serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Response body does not match the expected shape.
	#[error("Response body is malformed.")]
	ResponseDecode {
		/// Structured parsing failure naming the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Access token claims could not be decoded.
	#[error(transparent)]
	Claims(#[from] crate::access::ClaimsError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded the configured timeout bound.
	#[error("Request timed out before the backend responded.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: Box::new(e) } } else { Self::network(e) }
	}
}
