//! Immutable configuration consumed by the transport, token guard, and business flows.
//!
//! Both structures validate eagerly: a missing or malformed field is a construction-time
//! [`ConfigError`], never a failure deferred to the first provider call.

/// Builder API for assembling provider configuration.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Transport sizing, timeout, and TLS settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
	/// Upper bound for a whole request, connect to last body byte.
	pub request_timeout: StdDuration,
	/// Upper bound for establishing a connection.
	pub connect_timeout: StdDuration,
	/// Idle connections kept per host.
	pub pool_max_idle_per_host: usize,
	/// How long an idle pooled connection is kept.
	pub pool_idle_timeout: StdDuration,
	/// Concurrent in-flight requests allowed per host; `None` leaves it unbounded.
	pub max_connections_per_host: Option<usize>,
	/// `User-Agent` header sent with every request.
	pub user_agent: String,
	/// Disables TLS certificate verification. Logged loudly when enabled.
	pub danger_accept_invalid_certs: bool,
}
impl GatewayConfig {
	/// Checks sizing and timeout invariants.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.request_timeout.is_zero() {
			return Err(ConfigError::InvalidGateway { reason: "request_timeout must be positive" });
		}
		if self.connect_timeout.is_zero() {
			return Err(ConfigError::InvalidGateway { reason: "connect_timeout must be positive" });
		}
		if self.max_connections_per_host == Some(0) {
			return Err(ConfigError::InvalidGateway {
				reason: "max_connections_per_host must be at least 1",
			});
		}

		Ok(())
	}
}
impl Default for GatewayConfig {
	fn default() -> Self {
		Self {
			request_timeout: StdDuration::from_secs(30),
			connect_timeout: StdDuration::from_secs(10),
			pool_max_idle_per_host: 8,
			pool_idle_timeout: StdDuration::from_secs(90),
			max_connections_per_host: Some(32),
			user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
			danger_accept_invalid_certs: false,
		}
	}
}

/// Provider credentials, business identifiers, and endpoints.
///
/// Deserializing goes through [`MpesaConfigBuilder`], so documents are validated the same
/// way as programmatic construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MpesaConfigBuilder")]
pub struct MpesaConfig {
	/// Consumer key issued by the provider portal.
	pub consumer_key: String,
	/// Consumer secret issued by the provider portal. Never serialized.
	#[serde(skip_serializing)]
	pub consumer_secret: Secret,
	/// Paybill or till number (`BusinessShortCode` / `PartyB`).
	pub business_short_code: String,
	/// Lipa Na M-Pesa Online passkey. Never serialized.
	#[serde(skip_serializing)]
	pub passkey: Secret,
	/// Transaction type sent with checkout requests (e.g. `CustomerPayBillOnline`).
	pub transaction_type: String,
	/// OAuth token issuance endpoint.
	pub token_url: Url,
	/// STK push processing endpoint.
	pub checkout_url: Url,
	/// Callback URL template; `{}` is replaced with the caller's payment identifier.
	pub callback_url_template: String,
	/// Window before the real expiry in which a cached token is already treated as expired.
	#[serde(serialize_with = "serialize_seconds")]
	pub token_safety_margin: Duration,
}
impl MpesaConfig {
	/// Default token safety margin.
	pub const DEFAULT_TOKEN_SAFETY_MARGIN: Duration = Duration::seconds(30);
	/// Largest accepted token safety margin.
	pub const MAX_TOKEN_SAFETY_MARGIN: Duration = Duration::hours(1);

	/// Creates a new, empty builder.
	pub fn builder() -> MpesaConfigBuilder {
		MpesaConfigBuilder::default()
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json(document: &[u8]) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_slice(document);
		let builder: MpesaConfigBuilder = serde_path_to_error::deserialize(&mut de)?;

		builder.build()
	}

	/// Renders the callback URL for `payment_id`.
	pub fn callback_url(&self, payment_id: &str) -> String {
		self.callback_url_template.replacen("{}", payment_id, 1)
	}
}

fn serialize_seconds<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
	S: serde::Serializer,
{
	serializer.serialize_i64(value.whole_seconds())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn gateway_defaults_are_bounded_and_verified() {
		let config = GatewayConfig::default();

		assert!(config.validate().is_ok());
		assert!(!config.danger_accept_invalid_certs);
		assert_eq!(config.max_connections_per_host, Some(32));
		assert!(config.user_agent.starts_with("mpesa-gateway/"));
	}

	#[test]
	fn gateway_rejects_zero_limits() {
		let config = GatewayConfig { max_connections_per_host: Some(0), ..Default::default() };

		assert!(matches!(config.validate(), Err(ConfigError::InvalidGateway { .. })));

		let config = GatewayConfig { request_timeout: StdDuration::ZERO, ..Default::default() };

		assert!(matches!(config.validate(), Err(ConfigError::InvalidGateway { .. })));
	}

	#[test]
	fn gateway_config_deserializes_partial_documents() {
		let config: GatewayConfig =
			serde_json::from_str(r#"{"pool_max_idle_per_host":2,"danger_accept_invalid_certs":true}"#)
				.expect("Partial gateway config should deserialize.");

		assert_eq!(config.pool_max_idle_per_host, 2);
		assert!(config.danger_accept_invalid_certs);
		assert_eq!(config.request_timeout, StdDuration::from_secs(30));
	}
}
