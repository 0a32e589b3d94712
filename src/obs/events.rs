//! Structured diagnostic events; each helper compiles to a no-op without the `tracing` feature.

// self
use crate::{_prelude::*, error::DecodingError};

/// Reports a request that never produced a response.
pub fn request_failed(method: &Method, url: &str, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%method, url, error = %error, "Outbound request failed.");

	#[cfg(not(feature = "tracing"))]
	let _ = (method, url, error);
}

/// Reports a response body that could not be decoded.
pub fn decode_failed(url: &str, status: StatusCode, error: &DecodingError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		url,
		status = status.as_u16(),
		bytes = error.raw().len(),
		body = %error.raw_lossy(),
		error = ?StdError::source(error),
		"Response body could not be decoded."
	);

	#[cfg(not(feature = "tracing"))]
	let _ = (url, status, error);
}

/// Reports a provider-level rejection carried inside a successful exchange and counts it.
pub fn provider_rejected(operation: &'static str, code: &str, description: &str) {
	super::record_provider_rejection(operation, code);

	#[cfg(feature = "tracing")]
	tracing::error!(operation, code, description, "Provider rejected the request.");

	#[cfg(not(feature = "tracing"))]
	let _ = (operation, code, description);
}

/// Reports caller input that failed validation before any I/O.
pub fn validation_failed(operation: &'static str, fields: &[&'static str]) {
	#[cfg(feature = "tracing")]
	tracing::error!(operation, ?fields, "Required fields missing.");

	#[cfg(not(feature = "tracing"))]
	let _ = (operation, fields);
}

/// Reports a freshly installed access token.
pub fn token_installed(expiry: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::debug!(%expiry, "Access token refreshed.");

	#[cfg(not(feature = "tracing"))]
	let _ = expiry;
}

/// Reports a failed token refresh.
pub fn token_refresh_failed(url: &str, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::error!(url, error = %error, "Access token refresh failed.");

	#[cfg(not(feature = "tracing"))]
	let _ = (url, error);
}

/// Reports that TLS certificate verification has been switched off.
pub fn insecure_tls_enabled() {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		"TLS certificate verification is DISABLED for the provider transport; never use this \
		 setting in production."
	);
}
