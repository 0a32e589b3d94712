//! Lazily refreshed bearer token cache with singleflight refresh.
//!
//! [`TokenGuard`] owns the only copy of the provider token. Reads go through a
//! `parking_lot::RwLock`, so nobody ever observes a half-written token. Refreshes are
//! serialized by an async gate plus a generation counter: a caller snapshots the generation
//! when it sees "expired", and if another refresh completes while it waits for the gate it
//! reuses that outcome (token or failure) instead of issuing its own round trip. Nothing is
//! fetched at construction time and there is no background refresh.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::{AuthToken, Secret, TokenResponse},
	config::MpesaConfig,
	error::AuthError,
	flows::ProviderFault,
	gateway::{CallContext, ContentType, HttpGateway, RequestBody},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	transport::{HttpTransport, RawResponse},
};

/// Observable lifecycle state of the cached token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenStatus {
	/// No token has ever been installed.
	Unset,
	/// A token is cached and outside the safety margin.
	Valid,
	/// A token is cached but inside the safety margin or past expiry.
	Expired,
	/// A refresh round trip is in flight.
	Refreshing,
	/// The last refresh failed and no token is cached.
	Failed,
}

/// Shared token cache consulted before every authorized call.
pub struct TokenGuard<T>
where
	T: ?Sized + HttpTransport,
{
	gateway: Arc<HttpGateway<T>>,
	token_url: Url,
	basic_authorization: HeaderValue,
	safety_margin: Duration,
	cell: RwLock<TokenCell>,
	gate: AsyncMutex<()>,
	refreshing: AtomicBool,
	metrics: RefreshMetrics,
}
impl<T> TokenGuard<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a guard that issues tokens from `token_url` using client credentials.
	pub fn new(
		gateway: Arc<HttpGateway<T>>,
		token_url: Url,
		consumer_key: &str,
		consumer_secret: &Secret,
	) -> Result<Self> {
		let encoded = STANDARD.encode(format!("{consumer_key}:{}", consumer_secret.expose()));
		let mut basic_authorization = HeaderValue::from_str(&format!("Basic {encoded}"))
			.map_err(crate::error::ConfigError::from)?;

		basic_authorization.set_sensitive(true);

		Ok(Self {
			gateway,
			token_url,
			basic_authorization,
			safety_margin: MpesaConfig::DEFAULT_TOKEN_SAFETY_MARGIN,
			cell: Default::default(),
			gate: AsyncMutex::new(()),
			refreshing: AtomicBool::new(false),
			metrics: Default::default(),
		})
	}

	/// Creates a guard from the provider configuration.
	pub fn from_config(gateway: Arc<HttpGateway<T>>, config: &MpesaConfig) -> Result<Self> {
		let guard = Self::new(
			gateway,
			config.token_url.clone(),
			&config.consumer_key,
			&config.consumer_secret,
		)?;

		Ok(guard.with_safety_margin(config.token_safety_margin))
	}

	/// Overrides the safety margin subtracted from the provider expiry, clamped to
	/// `0..=`[`MpesaConfig::MAX_TOKEN_SAFETY_MARGIN`].
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = margin.clamp(Duration::ZERO, MpesaConfig::MAX_TOKEN_SAFETY_MARGIN);

		self
	}

	/// Returns `true` unless a cached token is valid beyond the safety margin.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Same as [`is_expired`](Self::is_expired) against an explicit clock.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.cell.read().fresh_token(now, self.safety_margin).is_none()
	}

	/// Reports the current lifecycle state.
	pub fn status(&self) -> TokenStatus {
		if self.refreshing.load(Ordering::Acquire) {
			return TokenStatus::Refreshing;
		}

		let cell = self.cell.read();

		match (&cell.token, &cell.failure) {
			(Some(token), _) if token.is_fresh_at(OffsetDateTime::now_utc(), self.safety_margin) =>
				TokenStatus::Valid,
			(Some(_), _) => TokenStatus::Expired,
			(None, Some(_)) => TokenStatus::Failed,
			(None, None) => TokenStatus::Unset,
		}
	}

	/// Returns the cached token regardless of freshness.
	pub fn current(&self) -> Option<AuthToken> {
		self.cell.read().token.clone()
	}

	/// Installs a token obtained elsewhere (for example, restored from a previous process).
	pub fn install(&self, token: AuthToken) {
		let mut cell = self.cell.write();

		cell.generation = cell.generation.wrapping_add(1);
		cell.token = Some(token);
		cell.failure = None;
	}

	/// Drops the cached token so the next authorized call refreshes.
	pub fn invalidate(&self) {
		let mut cell = self.cell.write();

		cell.token = None;
		cell.failure = None;
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns a token that is valid beyond the safety margin, refreshing when needed.
	///
	/// Concurrent callers that all observe "expired" share a single provider round trip. When
	/// the provider issues a token that lives shorter than the margin, the callers that shared
	/// the round trip receive it as long as it has not actually expired.
	pub async fn ensure_valid(&self, ctx: &CallContext) -> Result<AuthToken> {
		let observed = {
			let cell = self.cell.read();

			if let Some(token) = cell.fresh_token(OffsetDateTime::now_utc(), self.safety_margin) {
				return Ok(token);
			}

			cell.generation
		};

		self.refresh_since(ctx, observed).await
	}

	/// Performs the token exchange and installs the result.
	///
	/// A caller that waited while another refresh completed reuses that outcome. On failure
	/// a previously cached token stays in place; without one the guard moves to
	/// [`TokenStatus::Failed`].
	pub async fn refresh(&self, ctx: &CallContext) -> Result<AuthToken> {
		let observed = self.cell.read().generation;

		self.refresh_since(ctx, observed).await
	}

	async fn refresh_since(&self, ctx: &CallContext, observed: u64) -> Result<AuthToken> {
		const KIND: OperationKind = OperationKind::TokenRefresh;

		let span = OperationSpan::new(KIND, "refresh");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async {
				let url = self.token_url.as_str();
				let _gate = ctx.run(url, async { Ok(self.gate.lock().await) }).await?;

				if let Some(outcome) = self.completed_since(observed) {
					self.metrics.record_shared();

					return outcome;
				}

				self.metrics.record_attempt();

				let _refreshing = RefreshingFlag::raise(&self.refreshing);
				let outcome = match ctx.race(self.exchange()).await {
					Ok(outcome) => outcome,
					Err(interruption) => {
						self.metrics.record_failure();

						return Err(interruption.into_error(url));
					},
				};

				self.publish(outcome)
			})
			.await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	fn completed_since(&self, observed: u64) -> Option<Result<AuthToken>> {
		let cell = self.cell.read();

		if cell.generation == observed {
			return None;
		}
		if let Some(failure) = &cell.failure {
			return Some(Err(AuthError::Refresh { source: failure.clone() }.into()));
		}

		// A token issued with a lifetime shorter than the margin is still handed to waiters.
		cell.fresh_token(OffsetDateTime::now_utc(), Duration::ZERO).map(Ok)
	}

	fn publish(&self, outcome: Result<AuthToken>) -> Result<AuthToken> {
		let mut cell = self.cell.write();

		cell.generation = cell.generation.wrapping_add(1);

		match outcome {
			Ok(token) => {
				cell.token = Some(token.clone());
				cell.failure = None;

				self.metrics.record_success();
				obs::token_installed(token.expiry);

				Ok(token)
			},
			Err(err) => {
				obs::token_refresh_failed(self.token_url.as_str(), &err);

				let shared = Arc::new(err);

				cell.failure = Some(shared.clone());

				self.metrics.record_failure();

				Err(AuthError::Refresh { source: shared }.into())
			},
		}
	}

	async fn exchange(&self) -> Result<AuthToken> {
		let authorization = self.basic_authorization.clone();
		let exchange = self
			.gateway
			.execute::<TokenResponse, _>(
				&CallContext::new(),
				Method::GET,
				self.issuance_url(),
				ContentType::Json,
				|request| request.set_authorization(authorization),
				RequestBody::Empty,
			)
			.await?;

		if !exchange.status().is_success() {
			return Err(token_endpoint_failure(&exchange.response));
		}

		let token = exchange.into_decoded()?.into_auth_token(OffsetDateTime::now_utc())?;

		Ok(token)
	}

	fn issuance_url(&self) -> Url {
		let mut url = self.token_url.clone();

		if !url.query_pairs().any(|(key, _)| key == "grant_type") {
			url.query_pairs_mut().append_pair("grant_type", "client_credentials");
		}

		url
	}
}
impl<T> Debug for TokenGuard<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGuard")
			.field("token_url", &self.token_url.as_str())
			.field("safety_margin", &self.safety_margin)
			.field("status", &self.status())
			.finish()
	}
}

#[derive(Default)]
struct TokenCell {
	token: Option<AuthToken>,
	failure: Option<Arc<Error>>,
	generation: u64,
}
impl TokenCell {
	fn fresh_token(&self, now: OffsetDateTime, margin: Duration) -> Option<AuthToken> {
		self.token.as_ref().filter(|token| token.is_fresh_at(now, margin)).cloned()
	}
}

struct RefreshingFlag<'a>(&'a AtomicBool);
impl<'a> RefreshingFlag<'a> {
	fn raise(flag: &'a AtomicBool) -> Self {
		flag.store(true, Ordering::Release);

		Self(flag)
	}
}
impl Drop for RefreshingFlag<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

fn token_endpoint_failure(response: &RawResponse) -> Error {
	match ProviderFault::parse(&response.body) {
		Some(fault) => fault.into_error("token"),
		None => AuthError::Status { status: response.status.as_u16() }.into(),
	}
}
