//! Request bodies accepted by [`HttpGateway::execute`](crate::gateway::HttpGateway::execute).

// self
use crate::{_prelude::*, error::EncodingError};

/// Request body: nothing, pre-serialized bytes, or a structured value encoded as JSON.
#[derive(Debug, Default)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// Bytes sent as-is.
	Raw(Vec<u8>),
	/// Structured value captured for JSON encoding; a capture failure surfaces at send time.
	Structured(Result<serde_json::Value, serde_json::Error>),
}
impl RequestBody {
	/// Captures `value` for JSON encoding.
	pub fn json<T>(value: &T) -> Self
	where
		T: ?Sized + Serialize,
	{
		Self::Structured(serde_json::to_value(value))
	}

	/// Wraps pre-serialized bytes.
	pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
		Self::Raw(bytes.into())
	}

	/// Produces the bytes to send.
	pub fn encode(self) -> Result<Vec<u8>, EncodingError> {
		match self {
			Self::Empty => Ok(Vec::new()),
			Self::Raw(bytes) => Ok(bytes),
			Self::Structured(value) => Ok(serde_json::to_vec(&value?)?),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn raw_bytes_pass_through_untouched() {
		let body = RequestBody::raw("<Envelope/>");

		assert_eq!(body.encode().expect("Raw bodies always encode."), b"<Envelope/>");
		assert!(RequestBody::Empty.encode().expect("Empty bodies always encode.").is_empty());
	}

	#[test]
	fn unencodable_values_fail_locally() {
		let mut map = HashMap::new();

		map.insert((1, 2), "tuple keys are not JSON object keys");

		let err = RequestBody::json(&map).encode().expect_err("Tuple keys should not encode.");

		assert!(err.to_string().contains("could not be encoded"));
	}
}
