//! Authenticated M-Pesa gateway: cached bearer tokens with singleflight refresh, JSON/XML
//! response negotiation, and a typed error taxonomy for every provider call.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod callback;
pub mod config;
pub mod error;
pub mod flows;
pub mod gateway;
pub mod obs;
pub mod transport;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Secret, TokenGuard},
		config::{GatewayConfig, MpesaConfig},
		flows::{MpesaClient, ReqwestMpesaClient},
		gateway::HttpGateway,
		transport::ReqwestTransport,
	};

	/// Consumer key used by every test configuration.
	pub const TEST_CONSUMER_KEY: &str = "consumer-key";
	/// Consumer secret used by every test configuration.
	pub const TEST_CONSUMER_SECRET: &str = "consumer-secret";

	/// Builds a gateway configuration with short timeouts suited to local mock servers.
	pub fn test_gateway_config() -> GatewayConfig {
		GatewayConfig {
			request_timeout: StdDuration::from_secs(5),
			connect_timeout: StdDuration::from_secs(2),
			..GatewayConfig::default()
		}
	}

	/// Builds a reqwest-backed gateway for tests.
	pub fn test_gateway() -> Arc<HttpGateway<ReqwestTransport>> {
		let transport = ReqwestTransport::from_config(&test_gateway_config())
			.expect("Failed to build Reqwest transport for tests.");

		Arc::new(HttpGateway::new(transport))
	}

	/// Builds a provider configuration whose endpoints live under `base`.
	pub fn test_mpesa_config(base: &str) -> MpesaConfig {
		let endpoint = |path: &str| {
			Url::parse(&format!("{base}{path}")).expect("Failed to parse mock endpoint URL.")
		};

		MpesaConfig::builder()
			.consumer_key(TEST_CONSUMER_KEY)
			.consumer_secret(Secret::new(TEST_CONSUMER_SECRET))
			.business_short_code("174379")
			.passkey(Secret::new("test-passkey"))
			.transaction_type("CustomerPayBillOnline")
			.token_url(endpoint("/oauth/v1/generate"))
			.checkout_url(endpoint("/mpesa/stkpush/v1/processrequest"))
			.callback_url_template("https://merchant.example.com/callbacks/{}")
			.build()
			.expect("Failed to build test provider configuration.")
	}

	/// Constructs an [`MpesaClient`] wired to the reqwest transport and a fresh token guard.
	pub fn build_reqwest_test_client(base: &str) -> ReqwestMpesaClient {
		let config = Arc::new(test_mpesa_config(base));
		let gateway = test_gateway();
		let tokens = Arc::new(
			TokenGuard::from_config(gateway.clone(), &config)
				.expect("Failed to build token guard for tests."),
		);

		MpesaClient::new(config, gateway, tokens)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::{Mutex as AsyncMutex, Semaphore};
	pub use http::{HeaderMap, HeaderValue, Method, StatusCode};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use rust_decimal::Decimal;
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use http;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use rust_decimal::Decimal;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
