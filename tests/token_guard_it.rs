// crates.io
use httpmock::prelude::*;
// self
use mpesa_gateway::{
	_preludet::*,
	auth::{AuthToken, TokenGuard, TokenStatus},
	error::AuthError,
	gateway::CallContext,
	transport::ReqwestTransport,
};

const BASIC_AUTHORIZATION: &str = "Basic Y29uc3VtZXIta2V5OmNvbnN1bWVyLXNlY3JldA==";
const TOKEN_BODY: &str = "{\"access_token\":\"issued-token\",\"expires_in\":\"3599\"}";

fn build_guard(server: &MockServer) -> Arc<TokenGuard<ReqwestTransport>> {
	let config = test_mpesa_config(&server.base_url());

	Arc::new(
		TokenGuard::from_config(test_gateway(), &config)
			.expect("Token guard should build from the test configuration."),
	)
}

#[tokio::test]
async fn valid_token_is_reused_without_network() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/oauth/v1/generate");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let guard = build_guard(&server);

	guard.install(AuthToken::new("seeded", OffsetDateTime::now_utc() + Duration::hours(1)));

	for _ in 0..3 {
		let token =
			guard.ensure_valid(&CallContext::new()).await.expect("Seeded token should be valid.");

		assert_eq!(token.token.expose(), "seeded");
	}

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn refresh_uses_basic_credentials_and_client_credentials_grant() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/oauth/v1/generate")
				.query_param("grant_type", "client_credentials")
				.header("authorization", BASIC_AUTHORIZATION);
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let guard = build_guard(&server);

	assert_eq!(guard.status(), TokenStatus::Unset);

	let token = guard.ensure_valid(&CallContext::new()).await.expect("Refresh should succeed.");

	mock.assert_async().await;

	assert_eq!(token.token.expose(), "issued-token");
	assert!(token.expiry > OffsetDateTime::now_utc() + Duration::minutes(59));
	assert_eq!(guard.status(), TokenStatus::Valid);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_trigger_exactly_one_refresh() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/oauth/v1/generate");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(200))
				.body(TOKEN_BODY);
		})
		.await;
	let guard = build_guard(&server);

	guard.install(AuthToken::new("stale", OffsetDateTime::now_utc() - Duration::seconds(5)));

	let handles = (0..16)
		.map(|_| {
			let guard = guard.clone();

			tokio::spawn(async move { guard.ensure_valid(&CallContext::new()).await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let token = handle
			.await
			.expect("Refresh task should not panic.")
			.expect("Every caller should observe the refreshed token.");

		assert_eq!(token.token.expose(), "issued-token");
	}

	mock.assert_calls_async(1).await;

	assert_eq!(guard.metrics().attempts(), 1);
}

#[tokio::test]
async fn token_inside_safety_margin_is_refreshed() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/oauth/v1/generate");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let guard = build_guard(&server);

	guard.install(AuthToken::new("closing", OffsetDateTime::now_utc() + Duration::seconds(10)));

	assert!(guard.is_expired());
	assert_eq!(guard.status(), TokenStatus::Expired);

	let token = guard.ensure_valid(&CallContext::new()).await.expect("Refresh should succeed.");

	assert_eq!(token.token.expose(), "issued-token");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_credentials_surface_as_auth_errors() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/oauth/v1/generate");
			then.status(400).header("content-type", "application/json").body(
				"{\"requestId\":\"r-9\",\"errorCode\":\"400.008.01\",\"errorMessage\":\"Invalid Authentication passed\"}",
			);
		})
		.await;
	let guard = build_guard(&server);
	let err = guard.ensure_valid(&CallContext::new()).await.expect_err("Refresh should fail.");

	match err {
		Error::Auth(AuthError::Refresh { source }) => {
			assert!(source.is_provider());
			assert_eq!(source.provider_description(), Some("Invalid Authentication passed"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(guard.status(), TokenStatus::Failed);
	assert_eq!(guard.metrics().failures(), 1);
}
