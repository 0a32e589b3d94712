//! Shared helpers for provider operations (timestamps, STK password, fault bodies).

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use time::{
	UtcOffset,
	format_description::BorrowedFormatItem,
	macros::{format_description, offset},
};
// self
use crate::_prelude::*;

/// Result code the provider uses for an accepted request.
pub const SUCCESS_CODE: &str = "0";

/// Offset of the provider's local clock (East Africa Time); timestamps are rendered in it.
pub const PROVIDER_UTC_OFFSET: UtcOffset = offset!(+3);

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
	format_description!("[year][month][day][hour][minute][second]");

/// Renders `at` as the provider's `YYYYMMDDHHmmss` timestamp.
pub fn provider_timestamp(at: OffsetDateTime) -> String {
	let local = at.to_offset(PROVIDER_UTC_OFFSET);

	// The format only contains numeric components, which always render.
	local.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| {
		format!(
			"{:04}{:02}{:02}{:02}{:02}{:02}",
			local.year(),
			u8::from(local.month()),
			local.day(),
			local.hour(),
			local.minute(),
			local.second()
		)
	})
}

/// Derives the STK push password: `base64(short_code + passkey + timestamp)`.
pub fn stk_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
	STANDARD.encode(format!("{short_code}{passkey}{timestamp}"))
}

/// Alternative error body the provider returns on gateway-level rejections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFault {
	/// Provider-side request identifier.
	#[serde(default)]
	pub request_id: String,
	/// Provider error code, e.g. `400.002.02`.
	pub error_code: String,
	/// Human-readable description.
	pub error_message: String,
}
impl ProviderFault {
	/// Attempts to read a fault from a raw response body.
	pub fn parse(raw: &[u8]) -> Option<Self> {
		serde_json::from_slice(raw).ok()
	}

	/// Converts the fault into [`Error::Provider`] for `operation`, logging the rejection.
	pub fn into_error(self, operation: &'static str) -> Error {
		crate::obs::provider_rejected(operation, &self.error_code, &self.error_message);

		Error::Provider { operation, code: self.error_code, description: self.error_message }
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn timestamp_uses_provider_clock() {
		assert_eq!(provider_timestamp(datetime!(2024-01-31 22:05:09 UTC)), "20240201010509");
		assert_eq!(provider_timestamp(datetime!(2024-06-01 08:00:00 +3)), "20240601080000");
	}

	#[test]
	fn password_concatenates_then_encodes() {
		assert_eq!(
			stk_password("174379", "passkey", "20240201010509"),
			STANDARD.encode("174379passkey20240201010509")
		);
	}

	#[test]
	fn faults_parse_and_convert() {
		let fault = ProviderFault::parse(
			br#"{"requestId":"abc-1","errorCode":"400.002.02","errorMessage":"Bad Request - Invalid PhoneNumber"}"#,
		)
		.expect("Fault body should parse.");

		assert_eq!(fault.request_id, "abc-1");

		match fault.into_error("checkout") {
			Error::Provider { operation, code, description } => {
				assert_eq!(operation, "checkout");
				assert_eq!(code, "400.002.02");
				assert_eq!(description, "Bad Request - Invalid PhoneNumber");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}

		assert!(ProviderFault::parse(br#"{"ResponseCode":"0"}"#).is_none());
	}
}
