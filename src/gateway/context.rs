//! Per-call deadlines and cancellation.

// crates.io
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, error::TransportError};

/// Caller-supplied deadline and cancellation signal threaded through every provider call.
///
/// The default context never expires and cannot be cancelled. Dropping the future returned by
/// any gateway operation also aborts its in-flight I/O.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
	deadline: Option<Instant>,
	cancellation: Option<CancellationToken>,
}
impl CallContext {
	/// Creates a context without deadline or cancellation.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the deadline to `timeout` from now.
	pub fn with_timeout(self, timeout: StdDuration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	/// Sets an absolute deadline.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(deadline);

		self
	}

	/// Attaches a cancellation token.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = Some(token);

		self
	}

	/// Returns the configured deadline.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Returns `true` once the attached token has been cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
	}

	/// Races `fut` against the deadline and cancellation token.
	pub async fn race<F>(&self, fut: F) -> Result<F::Output, Interruption>
	where
		F: Future,
	{
		let cancelled = async {
			match &self.cancellation {
				Some(token) => token.cancelled().await,
				None => std::future::pending().await,
			}
		};
		let expired = async {
			match self.deadline {
				Some(deadline) => tokio::time::sleep_until(deadline).await,
				None => std::future::pending().await,
			}
		};

		tokio::select! {
			biased;
			_ = cancelled => Err(Interruption::Cancelled),
			_ = expired => Err(Interruption::DeadlineExceeded),
			output = fut => Ok(output),
		}
	}

	/// Runs `fut` under this context, mapping interruptions onto transport errors for `url`.
	pub async fn run<T, F>(&self, url: &str, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		self.race(fut).await.map_err(|interruption| interruption.into_error(url))?
	}
}

/// Why a call stopped before its future completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interruption {
	/// The cancellation token fired.
	Cancelled,
	/// The deadline passed.
	DeadlineExceeded,
}
impl Interruption {
	/// Converts the interruption into a transport error for `url`.
	pub fn into_error(self, url: &str) -> Error {
		let url = url.to_owned();

		match self {
			Self::Cancelled => TransportError::Cancelled { url },
			Self::DeadlineExceeded => TransportError::Timeout { url },
		}
		.into()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn default_context_passes_output_through() {
		let value = CallContext::new()
			.run("https://t", async { Ok(7) })
			.await
			.expect("Default context should never interrupt.");

		assert_eq!(value, 7);
	}

	#[tokio::test]
	async fn cancelled_token_wins_over_pending_work() {
		let token = CancellationToken::new();
		let ctx = CallContext::new().with_cancellation(token.clone());

		token.cancel();

		assert!(ctx.is_cancelled());

		let err = ctx
			.run("https://t", std::future::pending::<Result<()>>())
			.await
			.expect_err("Cancelled context should interrupt.");

		assert!(matches!(err, Error::Transport(TransportError::Cancelled { .. })));
	}

	#[tokio::test]
	async fn deadline_surfaces_timeout() {
		let ctx = CallContext::new().with_timeout(StdDuration::from_millis(20));
		let err = ctx
			.run("https://t", std::future::pending::<Result<()>>())
			.await
			.expect_err("Expired deadline should interrupt.");

		assert!(matches!(err, Error::Transport(TransportError::Timeout { .. })));
	}
}
