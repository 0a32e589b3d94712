//! Transport primitives for provider calls.
//!
//! The module exposes [`HttpTransport`] alongside the [`OutboundRequest`] and
//! [`RawResponse`] envelopes so downstream crates can plug in custom HTTP stacks without
//! losing the gateway's encoding, decoding, and error mapping. Implementations must buffer the
//! full response body before resolving; the gateway never touches a live stream.

// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::{config::GatewayConfig, obs};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing one buffered request.
///
/// The trait acts as the gateway's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so a single transport (and its connection pool) can be shared by
/// every concurrent caller behind an `Arc`. Retries are never performed at this layer.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves once the full response body has been read.
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// Request envelope built by the gateway and handed to the mutation hook before sending.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Request headers; the hook may set or override any of them.
	pub headers: HeaderMap,
	/// Encoded request body.
	pub body: Vec<u8>,
}
impl OutboundRequest {
	/// Creates a request without headers.
	pub fn new(method: Method, url: Url, body: Vec<u8>) -> Self {
		Self { method, url, headers: HeaderMap::new(), body }
	}

	/// Sets or replaces a header.
	pub fn set_header(&mut self, name: http::header::HeaderName, value: HeaderValue) {
		self.headers.insert(name, value);
	}

	/// Sets the `Authorization` header to a bearer credential, marked sensitive.
	pub fn set_authorization(&mut self, mut value: HeaderValue) {
		value.set_sensitive(true);

		self.headers.insert(http::header::AUTHORIZATION, value);
	}

	/// Returns the `Content-Type` header, if set and readable.
	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(http::header::CONTENT_TYPE).and_then(|value| value.to_str().ok())
	}
}

/// Fully buffered response returned by a transport.
///
/// Because the body is already in memory, callers may decode it and still log or re-inspect
/// the raw payload afterwards.
#[derive(Clone, Debug)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Creates a response envelope.
	pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
		Self { status, headers, body }
	}

	/// Returns the body as lossy UTF-8.
	pub fn body_lossy(&self) -> std::borrow::Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}

/// Reqwest-backed transport with a bounded pool and a per-host connection cap.
///
/// Redirects are not followed: provider endpoints answer directly and a redirect would
/// forward the bearer credential to another origin.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	host_limits: Option<Arc<HostLimits>>,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport honoring the pool, timeout, and TLS settings in `config`.
	pub fn from_config(config: &GatewayConfig) -> Result<Self> {
		config.validate()?;

		let mut builder = ReqwestClient::builder()
			.timeout(config.request_timeout)
			.connect_timeout(config.connect_timeout)
			.pool_max_idle_per_host(config.pool_max_idle_per_host)
			.pool_idle_timeout(config.pool_idle_timeout)
			.redirect(reqwest::redirect::Policy::none())
			.user_agent(config.user_agent.as_str());

		if config.danger_accept_invalid_certs {
			obs::insecure_tls_enabled();

			builder = builder.danger_accept_invalid_certs(true);
		}

		let client = builder.build().map_err(crate::error::ConfigError::from)?;

		Ok(Self {
			client,
			host_limits: config
				.max_connections_per_host
				.map(|limit| Arc::new(HostLimits::new(limit))),
		})
	}

	/// Wraps an existing reqwest [`ReqwestClient`] without a per-host cap.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, host_limits: None }
	}

	async fn dispatch(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
		let url = request.url.to_string();
		let _permit = match &self.host_limits {
			Some(limits) => Some(limits.acquire(&request.url).await),
			None => None,
		};
		let response = self
			.client
			.request(request.method, request.url)
			.headers(request.headers)
			.body(request.body)
			.send()
			.await
			.map_err(|err| map_reqwest_error(&url, err))?;
		let status = response.status();
		let headers = response.headers().to_owned();
		let body = response.bytes().await.map_err(|err| map_reqwest_error(&url, err))?;

		Ok(RawResponse::new(status, headers, body.to_vec()))
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(self.dispatch(request))
	}
}

/// Per-host semaphores capping concurrent in-flight requests.
#[cfg(feature = "reqwest")]
#[derive(Debug)]
struct HostLimits {
	limit: usize,
	hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}
#[cfg(feature = "reqwest")]
impl HostLimits {
	fn new(limit: usize) -> Self {
		Self { limit, hosts: Default::default() }
	}

	async fn acquire(&self, url: &Url) -> async_lock::SemaphoreGuardArc {
		let key = format!(
			"{}://{}:{}",
			url.scheme(),
			url.host_str().unwrap_or_default(),
			url.port_or_known_default().unwrap_or_default()
		);
		let semaphore = self
			.hosts
			.lock()
			.entry(key)
			.or_insert_with(|| Arc::new(Semaphore::new(self.limit)))
			.clone();

		semaphore.acquire_arc().await
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(url: &str, err: ReqwestError) -> TransportError {
	if err.is_timeout() {
		TransportError::Timeout { url: url.to_owned() }
	} else {
		TransportError::network(url, err)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outbound_request_marks_authorization_sensitive() {
		let url = Url::parse("https://api.example.com/resource").expect("URL should parse.");
		let mut request = OutboundRequest::new(Method::POST, url, Vec::new());

		request.set_authorization(HeaderValue::from_static("Bearer abc"));

		let value = request
			.headers
			.get(http::header::AUTHORIZATION)
			.expect("Authorization header should be set.");

		assert!(value.is_sensitive());
		assert_eq!(request.content_type(), None);
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn host_limits_share_semaphore_per_origin() {
		let limits = HostLimits::new(1);
		let a = Url::parse("https://api.example.com/a").expect("URL should parse.");
		let b = Url::parse("https://api.example.com:443/b").expect("URL should parse.");
		let other = Url::parse("https://other.example.com/").expect("URL should parse.");
		let first = limits.acquire(&a).await;

		assert!(limits.hosts.lock().get("https://api.example.com:443").is_some());

		let _other = limits.acquire(&other).await;
		let pending = limits.hosts.lock()["https://api.example.com:443"].try_acquire_arc();

		assert!(pending.is_none(), "Second permit for the same origin should be unavailable.");

		drop(first);

		let _second = limits.acquire(&b).await;

		assert_eq!(limits.hosts.lock().len(), 2);
	}
}
