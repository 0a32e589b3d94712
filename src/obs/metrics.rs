// self
use crate::obs::{OperationKind, OperationOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"mpesa_gateway_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts provider rejections by operation and provider result code (when enabled).
pub fn record_provider_rejection(operation: &'static str, code: &str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"mpesa_gateway_provider_rejection_total",
			"operation" => operation,
			"result_code" => code.to_owned()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, code);
	}
}
