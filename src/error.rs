//! Gateway-level error types shared across the transport, token guard, and business flows.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Caller-supplied input failed required-field checks; nothing was sent.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Request body could not be serialized; nothing was sent.
	#[error(transparent)]
	Encoding(#[from] EncodingError),
	/// Transport failure (DNS, TCP, TLS, timeout, cancellation).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be parsed per the negotiated content type.
	#[error(transparent)]
	Decoding(#[from] DecodingError),
	/// Token issuance or refresh failed.
	#[error(transparent)]
	Auth(#[from] AuthError),

	/// Transport and decoding succeeded but the provider signalled failure.
	#[error("Provider rejected the {operation} request with code {code}: {description}.")]
	Provider {
		/// Operation label the request belonged to.
		operation: &'static str,
		/// Provider result code, verbatim.
		code: String,
		/// Provider description, verbatim.
		description: String,
	},
}
impl Error {
	/// Returns `true` for transport failures (including timeouts and cancellations).
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Transport(_))
	}

	/// Returns `true` for decoding failures.
	pub fn is_decoding(&self) -> bool {
		matches!(self, Self::Decoding(_))
	}

	/// Returns `true` for provider-level rejections.
	pub fn is_provider(&self) -> bool {
		matches!(self, Self::Provider { .. })
	}

	/// Returns the provider description when the error is a provider-level rejection.
	pub fn provider_description(&self) -> Option<&str> {
		match self {
			Self::Provider { description, .. } => Some(description),
			_ => None,
		}
	}
}

/// Configuration and construction failures raised before any request is sent.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Required configuration fields are missing or blank.
	#[error("Configuration is missing required fields: {}.", fields.join(", "))]
	MissingFields {
		/// Names of every missing field.
		fields: Vec<&'static str>,
	},
	/// Endpoint URL does not use an HTTP scheme.
	#[error("The {endpoint} endpoint must use http or https: {url}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Callback URL template lacks the payment identifier placeholder.
	#[error("Callback URL template must contain a `{{}}` placeholder: {template}.")]
	InvalidCallbackTemplate {
		/// Offending template.
		template: String,
	},
	/// Token safety margin exceeds the supported maximum.
	#[error("Token safety margin of {seconds}s exceeds the {max}s maximum.")]
	InvalidSafetyMargin {
		/// Requested margin in seconds.
		seconds: i64,
		/// Largest accepted margin in seconds.
		max: i64,
	},
	/// Transport sizing or timeout settings are unusable.
	#[error("Gateway configuration is invalid: {reason}.")]
	InvalidGateway {
		/// Human-readable reason.
		reason: &'static str,
	},
	/// Credentials cannot be expressed as an HTTP header.
	#[error("Credentials cannot be encoded as an HTTP header.")]
	InvalidCredentials(#[from] http::header::InvalidHeaderValue),
	/// Configuration document could not be parsed.
	#[error("Configuration document is malformed.")]
	Parse(#[from] serde_path_to_error::Error<serde_json::Error>),
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

/// Caller-supplied input failed required-field checks.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Required fields are missing: {}.", fields.join(", "))]
pub struct ValidationError {
	/// Names of every missing field, in declaration order.
	pub fields: Vec<&'static str>,
}
impl ValidationError {
	/// Returns `Ok(())` when no field is missing.
	pub fn check(fields: Vec<&'static str>) -> Result<(), Self> {
		if fields.is_empty() { Ok(()) } else { Err(Self { fields }) }
	}
}

/// Request body could not be serialized.
#[derive(Debug, ThisError)]
#[error("Request body could not be encoded as JSON.")]
pub struct EncodingError {
	/// Serializer failure.
	#[source]
	pub source: serde_json::Error,
}
impl From<serde_json::Error> for EncodingError {
	fn from(source: serde_json::Error) -> Self {
		Self { source }
	}
}

/// Transport-level failures (network, IO, deadlines).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its timeout or the caller's deadline.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Target URL.
		url: String,
	},
	/// The caller cancelled the request before it completed.
	#[error("Request to {url} was cancelled.")]
	Cancelled {
		/// Target URL.
		url: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		url: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}

	/// Returns `true` when the failure was a timeout or an expired caller deadline.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}

	/// Returns `true` when the caller cancelled the request.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled { .. })
	}
}

/// Response body could not be parsed; the raw payload is kept for diagnostics.
#[derive(Debug, ThisError)]
pub enum DecodingError {
	/// Body is not valid JSON for the expected shape.
	#[error("Response body is not valid JSON for the expected shape.")]
	Json {
		/// Structured parsing failure including the failing path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// Raw response bytes.
		raw: Vec<u8>,
	},
	/// Body is not valid XML for the expected shape.
	#[error("Response body is not valid XML for the expected shape.")]
	Xml {
		/// Structured parsing failure.
		#[source]
		source: quick_xml::DeError,
		/// Raw response bytes.
		raw: Vec<u8>,
	},
}
impl DecodingError {
	/// Returns the undecodable payload.
	pub fn raw(&self) -> &[u8] {
		match self {
			Self::Json { raw, .. } | Self::Xml { raw, .. } => raw,
		}
	}

	/// Returns the undecodable payload as lossy UTF-8, suitable for logs.
	pub fn raw_lossy(&self) -> std::borrow::Cow<'_, str> {
		String::from_utf8_lossy(self.raw())
	}
}

/// Token issuance and refresh failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The token exchange failed. Callers that waited on the same refresh share the cause.
	#[error("Access token refresh failed.")]
	Refresh {
		/// Failure observed by the refresh round trip.
		#[source]
		source: Arc<Error>,
	},
	/// Token endpoint answered with a non-success HTTP status and no recognizable fault.
	#[error("Token endpoint answered with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Token endpoint returned an empty or header-unsafe access token.
	#[error("Token endpoint returned an unusable access token.")]
	MalformedToken,
	/// Token endpoint returned an unusable lifetime.
	#[error("Token endpoint returned an invalid expires_in value: {value}.")]
	InvalidExpiresIn {
		/// Raw value as received.
		value: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_error_exposes_shared_cause() {
		let cause = Arc::new(Error::from(TransportError::Timeout { url: "https://t".into() }));
		let err: Error = AuthError::Refresh { source: cause.clone() }.into();
		let source = StdError::source(&err).expect("Auth error should expose its source.");

		assert_eq!(source.to_string(), "Request to https://t timed out.");
		assert!(matches!(err, Error::Auth(AuthError::Refresh { .. })));
		assert_eq!(Arc::strong_count(&cause), 2);
	}

	#[test]
	fn validation_error_lists_every_field() {
		let err = ValidationError::check(vec!["amount", "phone_number"])
			.expect_err("Missing fields should fail the check.");

		assert_eq!(err.to_string(), "Required fields are missing: amount, phone_number.");
		assert!(ValidationError::check(Vec::new()).is_ok());
	}

	#[test]
	fn provider_error_keeps_description_verbatim() {
		let err = Error::Provider {
			operation: "checkout",
			code: "1".into(),
			description: "Insufficient funds".into(),
		};

		assert!(err.is_provider());
		assert_eq!(err.provider_description(), Some("Insufficient funds"));
		assert!(!err.is_transport());
	}
}
