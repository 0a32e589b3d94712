//! Demonstrates an STK push checkout against a local mock provider using the default reqwest
//! transport, then decodes the result callback the provider would deliver afterwards.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use mpesa_gateway::{
	Decimal,
	auth::Secret,
	callback::{self, ValidationResponse},
	config::{GatewayConfig, MpesaConfig},
	flows::{CheckoutRequest, MpesaClient},
	gateway::{CallContext, ContentType},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/oauth/v1/generate");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":\"3599\"}");
		})
		.await;
	let checkout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/mpesa/stkpush/v1/processrequest");
			then.status(200).header("content-type", "application/json").body(
				"{\"MerchantRequestID\":\"demo-merchant\",\"CheckoutRequestID\":\"ws_CO_demo\",\"ResponseCode\":\"0\",\"ResponseDescription\":\"Success. Request accepted for processing\",\"CustomerMessage\":\"Success. Request accepted for processing\"}",
			);
		})
		.await;
	let config = MpesaConfig::builder()
		.consumer_key("demo-key")
		.consumer_secret(Secret::new("demo-secret"))
		.business_short_code("174379")
		.passkey(Secret::new("demo-passkey"))
		.transaction_type("CustomerPayBillOnline")
		.token_url(Url::parse(&server.url("/oauth/v1/generate"))?)
		.checkout_url(Url::parse(&server.url("/mpesa/stkpush/v1/processrequest"))?)
		.callback_url_template("https://merchant.example.com/payments/{}/callback")
		.build()?;
	let client = MpesaClient::from_config(config, &GatewayConfig::default())?;
	let request = CheckoutRequest::new(Decimal::new(100, 0), "254708374149", "ORDER-1001")
		.with_description("Demo order");
	let ctx = CallContext::new().with_timeout(std::time::Duration::from_secs(10));
	let response = client.initiate_checkout(&ctx, request, "payment-1001").await?;

	println!("Checkout accepted: {}.", response.checkout_request_id);

	token_mock.assert_async().await;
	checkout_mock.assert_async().await;

	let delivered = br#"{"Body":{"stkCallback":{"MerchantRequestID":"demo-merchant","CheckoutRequestID":"ws_CO_demo","ResultCode":0,"ResultDesc":"The service request is processed successfully.","CallbackMetadata":{"Item":[{"Name":"Amount","Value":100},{"Name":"MpesaReceiptNumber","Value":"QDEMO1001"}]}}}}"#;
	let envelope = callback::decode_stk_callback(delivered, ContentType::Json)?;
	let result = envelope.callback();

	println!(
		"Callback for {}: success={}, receipt={}.",
		result.checkout_request_id,
		result.is_success(),
		result.receipt_number().unwrap_or_default()
	);
	println!("Validation reply: {}.", serde_json::to_string(&ValidationResponse::accept())?);

	Ok(())
}
