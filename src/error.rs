//! Relay-level error types shared by the token cache, credential sources, and services.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The credential issuer failed to produce a token.
	#[error(transparent)]
	TokenIssuer(#[from] IssuerError),
	/// Transport failure (DNS, TCP, TLS) while reaching the backend.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Backend answered with a non-success status.
	#[error("Backend returned {status} - {reason}.")]
	Upstream {
		/// HTTP status code returned by the backend.
		status: u16,
		/// Canonical reason phrase for the status, or an empty string.
		reason: String,
	},
	/// A credential source produced an empty token value.
	#[error("Credential source produced an empty token.")]
	EmptyToken,
	/// A refresh was requested outside a tokio runtime.
	#[error("Token refresh requires a tokio runtime.")]
	RuntimeUnavailable {
		/// Runtime lookup failure.
		#[source]
		source: tokio::runtime::TryCurrentError,
	},
	/// The detached refresh task panicked or was cancelled by the runtime.
	#[error("Token refresh task was aborted.")]
	RefreshAborted {
		/// Join failure reported by the runtime.
		#[source]
		source: tokio::task::JoinError,
	},
}

/// Configuration and validation failures raised at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Authentication is enabled but no scope was configured.
	#[error("Backend auth scope is required when backend auth is enabled.")]
	MissingScope,
	/// Authentication is enabled but no credential issuer was configured.
	#[error("Credential issuer settings are required when backend auth is enabled.")]
	MissingIssuer,
	/// Configured scopes cannot be normalized.
	#[error("Backend auth scope is invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Issuer token endpoint cannot be parsed.
	#[error("Issuer token URL is invalid.")]
	InvalidTokenUrl {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
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

/// Failures reported by a [`CredentialSource`](crate::source::CredentialSource).
#[derive(Debug, ThisError)]
pub enum IssuerError {
	/// Issuer refused to mint a token (bad client, bad scope, policy denial).
	#[error("Credential issuer denied the request: {reason}.")]
	Denied {
		/// Issuer-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Issuer responded with a body that could not be parsed.
	#[error("Credential issuer returned malformed JSON.")]
	Malformed {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Issuer responded in an unexpected way.
	#[error("Credential issuer returned an unexpected response: {message}.")]
	Unexpected {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Issuer response omitted the token lifetime.
	#[error("Credential issuer response is missing expires_in.")]
	MissingExpiry,
	/// Issuer returned a lifetime that cannot be represented.
	#[error("Credential issuer returned an expires_in value outside the supported range.")]
	ExpiryOutOfRange,
	/// Transport failure while reaching the issuer.
	#[error("Network error occurred while calling the credential issuer.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl IssuerError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// HTTP status reported by the issuer, if the failure carried one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Denied { status, .. }
			| Self::Malformed { status, .. }
			| Self::Unexpected { status, .. } => *status,
			_ => None,
		}
	}
}

/// Transport-level failures while calling the backend.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
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
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn upstream_error_carries_status_and_reason() {
		let err = Error::Upstream { status: 403, reason: "Forbidden".into() };

		assert_eq!(err.to_string(), "Backend returned 403 - Forbidden.");
	}

	#[test]
	fn issuer_error_exposes_status_only_when_known() {
		let denied = IssuerError::Denied { reason: "invalid_client".into(), status: Some(401) };
		let network = IssuerError::network(std::io::Error::other("connection reset"));

		assert_eq!(denied.status(), Some(401));
		assert_eq!(network.status(), None);

		let err: Error = network.into();

		assert!(matches!(err, Error::TokenIssuer(IssuerError::Network { .. })));
		assert!(
			StdError::source(&err).is_some(),
			"Transparent issuer errors should keep their network source."
		);
	}
}
