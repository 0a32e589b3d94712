//! Demonstrates plugging a custom [`HttpTransport`] into the gateway.
//!
//! 1. Implement [`HttpTransport`] so it resolves with a fully buffered [`RawResponse`].
//! 2. Wrap it in an [`HttpGateway`] and share the gateway with a [`TokenGuard`].
//! 3. Build an [`MpesaClient`] from the pieces and observe how transport failures are mapped.

// std
use std::{
	error::Error as StdError,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
// crates.io
use color_eyre::Result;
use http::{HeaderMap, StatusCode};
// self
use mpesa_gateway::{
	Decimal,
	auth::{Secret, TokenGuard},
	config::MpesaConfig,
	error::TransportError,
	flows::{CheckoutRequest, MpesaClient},
	gateway::{CallContext, HttpGateway},
	transport::{HttpTransport, OutboundRequest, RawResponse, TransportFuture},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = MpesaConfig::builder()
		.consumer_key("demo-key")
		.consumer_secret(Secret::new("demo-secret"))
		.business_short_code("174379")
		.passkey(Secret::new("demo-passkey"))
		.transaction_type("CustomerPayBillOnline")
		.token_url("https://sandbox.provider.example/oauth/v1/generate".parse()?)
		.checkout_url("https://sandbox.provider.example/mpesa/stkpush/v1/processrequest".parse()?)
		.callback_url_template("https://merchant.example.com/payments/{}")
		.build()?;
	let transport = Arc::new(CannedTransport::default());
	let gateway: Arc<HttpGateway<CannedTransport>> = Arc::new(HttpGateway::new(transport.clone()));
	let tokens = Arc::new(TokenGuard::from_config(gateway.clone(), &config)?);
	let client = MpesaClient::new(config, gateway, tokens);
	let request = CheckoutRequest::new(Decimal::new(250, 0), "254708374149", "ORDER-7");
	let response = client.initiate_checkout(&CallContext::new(), request.clone(), "pay-7").await?;

	println!("Canned transport accepted checkout {}.", response.checkout_request_id);

	transport.offline.store(true, Ordering::SeqCst);
	client.tokens.invalidate();

	match client.initiate_checkout(&CallContext::new(), request, "pay-8").await {
		Ok(_) => println!("Offline transport unexpectedly succeeded."),
		Err(e) => println!("Offline transport surfaced as: {e} ({:?}).", StdError::source(&e)),
	}

	Ok(())
}

#[derive(Debug, Default)]
struct CannedTransport {
	offline: AtomicBool,
}
impl HttpTransport for CannedTransport {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if self.offline.load(Ordering::SeqCst) {
				return Err(TransportError::network(
					request.url.as_str(),
					std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
				));
			}

			let body: &[u8] = if request.url.path().ends_with("/generate") {
				br#"{"access_token":"canned-access","expires_in":"3599"}"#
			} else {
				br#"{"MerchantRequestID":"canned-merchant","CheckoutRequestID":"ws_CO_canned","ResponseCode":"0","ResponseDescription":"Accepted"}"#
			};

			Ok(RawResponse::new(StatusCode::OK, HeaderMap::new(), body.to_vec()))
		})
	}
}
