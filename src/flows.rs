//! Business operations executed against the provider through the shared gateway.

pub mod checkout;
pub mod common;

pub use checkout::*;
pub use common::*;

// self
use crate::{
	_prelude::*, auth::TokenGuard, config::MpesaConfig, gateway::HttpGateway, transport::HttpTransport,
};
#[cfg(feature = "reqwest")]
use crate::{config::GatewayConfig, transport::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestMpesaClient = MpesaClient<ReqwestTransport>;

/// Coordinates provider operations for a single merchant configuration.
///
/// The client owns shared handles to the gateway, the token guard, and the validated
/// configuration, so clones are cheap and every clone shares one connection pool and one
/// cached token. Operations may be called concurrently from any number of tasks.
pub struct MpesaClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Request executor used for every outbound provider call.
	pub gateway: Arc<HttpGateway<T>>,
	/// Token cache consulted before every authorized call.
	pub tokens: Arc<TokenGuard<T>>,
	/// Validated provider configuration.
	pub config: Arc<MpesaConfig>,
}
impl<T> MpesaClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client from caller-provided components.
	///
	/// The token guard should be built over the same gateway so refreshes share its pool.
	pub fn new(
		config: impl Into<Arc<MpesaConfig>>,
		gateway: Arc<HttpGateway<T>>,
		tokens: Arc<TokenGuard<T>>,
	) -> Self {
		Self { gateway, tokens, config: config.into() }
	}
}
#[cfg(feature = "reqwest")]
impl MpesaClient<ReqwestTransport> {
	/// Provisions a reqwest transport, gateway, and token guard from configuration.
	///
	/// No token is requested here; the first authorized call fetches one.
	pub fn from_config(config: MpesaConfig, gateway_config: &GatewayConfig) -> Result<Self> {
		let gateway = Arc::new(HttpGateway::from_config(gateway_config)?);
		let tokens = Arc::new(TokenGuard::from_config(gateway.clone(), &config)?);

		Ok(Self::new(config, gateway, tokens))
	}
}
impl<T> Clone for MpesaClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			gateway: self.gateway.clone(),
			tokens: self.tokens.clone(),
			config: self.config.clone(),
		}
	}
}
impl<T> Debug for MpesaClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MpesaClient")
			.field("business_short_code", &self.config.business_short_code)
			.field("checkout_url", &self.config.checkout_url.as_str())
			.field("tokens", &self.tokens)
			.finish()
	}
}
