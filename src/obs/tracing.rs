// self
use crate::{_prelude::*, obs::OperationKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by gateway operations.
///
/// Every span declares empty `payment_id` and `checkout_request_id` fields so checkout spans
/// can be correlated with the callback the provider delivers later.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"mpesa_gateway.operation",
				operation = kind.as_str(),
				stage,
				payment_id = tracing::field::Empty,
				checkout_request_id = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Records the caller's payment identifier on the span.
	pub fn record_payment_id(&self, payment_id: &str) {
		#[cfg(feature = "tracing")]
		self.span.record("payment_id", payment_id);

		#[cfg(not(feature = "tracing"))]
		let _ = payment_id;
	}

	/// Records the provider's checkout request identifier on the span.
	pub fn record_checkout_request_id(&self, checkout_request_id: &str) {
		#[cfg(feature = "tracing")]
		self.span.record("checkout_request_id", checkout_request_id);

		#[cfg(not(feature = "tracing"))]
		let _ = checkout_request_id;
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
