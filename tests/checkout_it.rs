// crates.io
use httpmock::prelude::*;
// self
use mpesa_gateway::{
	_preludet::*,
	Decimal,
	auth::{AuthToken, TokenStatus},
	error::{AuthError, TransportError},
	flows::CheckoutRequest,
	gateway::CallContext,
};

const CHECKOUT_PATH: &str = "/mpesa/stkpush/v1/processrequest";
const TOKEN_PATH: &str = "/oauth/v1/generate";

fn checkout_request() -> CheckoutRequest {
	CheckoutRequest::new(Decimal::new(150, 0), "254708374149", "INV-42")
		.with_description("Order 42")
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"checkout-token\",\"expires_in\":\"3599\"}");
		})
		.await
}

#[tokio::test]
async fn checkout_sends_bearer_token_and_returns_acknowledgement() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token(&server).await;
	let checkout_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(CHECKOUT_PATH)
				.header("authorization", "Bearer checkout-token")
				.header("content-type", "application/json");
			then.status(200).header("content-type", "application/json").body(
				"{\"MerchantRequestID\":\"29115-34620561-1\",\"CheckoutRequestID\":\"ws_CO_191220191020363925\",\"ResponseCode\":\"0\",\"ResponseDescription\":\"Success. Request accepted for processing\",\"CustomerMessage\":\"Success. Request accepted for processing\"}",
			);
		})
		.await;
	let client = build_reqwest_test_client(&server.base_url());
	let response = client
		.initiate_checkout(&CallContext::new(), checkout_request(), "pay-42")
		.await
		.expect("Checkout should be accepted.");

	assert!(response.is_accepted());
	assert_eq!(response.checkout_request_id, "ws_CO_191220191020363925");

	let second = client
		.initiate_checkout(&CallContext::new(), checkout_request(), "pay-43")
		.await
		.expect("Second checkout should reuse the cached token.");

	assert_eq!(second.merchant_request_id, "29115-34620561-1");

	token_mock.assert_calls_async(1).await;
	checkout_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn non_zero_response_code_is_a_provider_error() {
	let server = MockServer::start_async().await;
	let _token_mock = mock_token(&server).await;
	let _checkout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(CHECKOUT_PATH);
			then.status(200).header("content-type", "application/json").body(
				"{\"MerchantRequestID\":\"m-1\",\"CheckoutRequestID\":\"c-1\",\"ResponseCode\":\"1\",\"ResponseDescription\":\"Insufficient funds\"}",
			);
		})
		.await;
	let client = build_reqwest_test_client(&server.base_url());
	let err = client
		.initiate_checkout(&CallContext::new(), checkout_request(), "pay-1")
		.await
		.expect_err("Rejected checkout should fail.");

	match err {
		Error::Provider { operation, code, description } => {
			assert_eq!(operation, "checkout");
			assert_eq!(code, "1");
			assert_eq!(description, "Insufficient funds");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn fault_bodies_are_provider_errors() {
	let server = MockServer::start_async().await;
	let _token_mock = mock_token(&server).await;
	let _checkout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(CHECKOUT_PATH);
			then.status(400).header("content-type", "application/json").body(
				"{\"requestId\":\"11728-2929992-1\",\"errorCode\":\"400.002.02\",\"errorMessage\":\"Bad Request - Invalid PhoneNumber\"}",
			);
		})
		.await;
	let client = build_reqwest_test_client(&server.base_url());
	let err = client
		.initiate_checkout(&CallContext::new(), checkout_request(), "pay-2")
		.await
		.expect_err("Fault response should fail.");

	assert!(err.is_provider());
	assert_eq!(err.provider_description(), Some("Bad Request - Invalid PhoneNumber"));
}

#[tokio::test]
async fn unreadable_bodies_are_decoding_errors() {
	let server = MockServer::start_async().await;
	let _token_mock = mock_token(&server).await;
	let _checkout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(CHECKOUT_PATH);
			then.status(502).header("content-type", "text/html").body("<html>Bad Gateway</html>");
		})
		.await;
	let client = build_reqwest_test_client(&server.base_url());
	let err = client
		.initiate_checkout(&CallContext::new(), checkout_request(), "pay-3")
		.await
		.expect_err("HTML response should fail to decode.");

	match err {
		Error::Decoding(err) => assert_eq!(err.raw_lossy(), "<html>Bad Gateway</html>"),
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn invalid_input_never_reaches_the_network() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token(&server).await;
	let checkout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(CHECKOUT_PATH);
			then.status(200);
		})
		.await;
	let client = build_reqwest_test_client(&server.base_url());
	let err = client
		.initiate_checkout(&CallContext::new(), CheckoutRequest::default(), "pay-4")
		.await
		.expect_err("Empty input should fail validation.");

	match err {
		Error::Validation(err) =>
			assert_eq!(err.fields, ["amount", "phone_number", "party_a", "account_reference"]),
		other => panic!("Unexpected error variant: {other:?}."),
	}

	token_mock.assert_calls_async(0).await;
	checkout_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn unauthorized_response_drops_cached_token() {
	let server = MockServer::start_async().await;
	let _checkout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(CHECKOUT_PATH);
			then.status(401).header("content-type", "application/json").body(
				"{\"requestId\":\"r-401\",\"errorCode\":\"404.001.04\",\"errorMessage\":\"Invalid Access Token\"}",
			);
		})
		.await;
	let client = build_reqwest_test_client(&server.base_url());

	client
		.tokens
		.install(AuthToken::new("revoked", OffsetDateTime::now_utc() + Duration::hours(1)));

	let err = client
		.initiate_checkout(&CallContext::new(), checkout_request(), "pay-5")
		.await
		.expect_err("Unauthorized checkout should fail.");

	assert_eq!(err.provider_description(), Some("Invalid Access Token"));
	assert_eq!(client.tokens.current(), None);
	assert_eq!(client.tokens.status(), TokenStatus::Unset);
}

#[tokio::test]
async fn unreachable_token_endpoint_is_a_transport_failure() {
	let client = build_reqwest_test_client("http://127.0.0.1:1");
	let err = client
		.initiate_checkout(&CallContext::new(), checkout_request(), "pay-6")
		.await
		.expect_err("Refused connections should fail.");

	match err {
		Error::Auth(AuthError::Refresh { source }) => {
			assert!(source.is_transport());
			assert!(!source.is_decoding());
			assert!(matches!(source.as_ref(), Error::Transport(TransportError::Network { .. })));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}
