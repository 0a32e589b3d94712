//! Provider-delivered notifications: STK result callbacks and C2B validation exchanges.
//!
//! STK callbacks arrive either as JSON (`{"Body":{"stkCallback":{...}}}`, optionally wrapped in
//! an `Envelope` object) or as an XML envelope with the same element names. Both decode into
//! [`StkCallbackEnvelope`]; metadata items keep their delivery order.

// std
use std::borrow::Cow;
// self
use crate::{_prelude::*, error::DecodingError, flows::SUCCESS_CODE, gateway::ContentType};

/// Decodes an STK result callback body delivered as `content_type`.
pub fn decode_stk_callback(
	raw: &[u8],
	content_type: ContentType,
) -> Result<StkCallbackEnvelope, DecodingError> {
	match content_type {
		ContentType::Json => {
			let document = ContentType::Json.decode::<serde_json::Value>(raw)?;
			let inner = match document {
				serde_json::Value::Object(mut object) if object.contains_key("Envelope") =>
					object.remove("Envelope").unwrap_or_default(),
				other => other,
			};

			serde_path_to_error::deserialize(inner)
				.map_err(|source| DecodingError::Json { source, raw: raw.to_vec() })
		},
		ContentType::Xml => ContentType::Xml.decode::<XmlEnvelope>(raw).map(Into::into),
	}
}

/// Outer callback envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StkCallbackEnvelope {
	/// Envelope body.
	#[serde(rename = "Body")]
	pub body: StkCallbackBody,
}
impl StkCallbackEnvelope {
	/// Returns the callback payload.
	pub fn callback(&self) -> &StkCallback {
		&self.body.stk_callback
	}

	/// Consumes the envelope and returns the callback payload.
	pub fn into_callback(self) -> StkCallback {
		self.body.stk_callback
	}
}

/// Envelope body holding the STK callback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StkCallbackBody {
	/// Callback payload.
	#[serde(rename = "stkCallback")]
	pub stk_callback: StkCallback,
}

/// Result of an STK push as reported by the provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StkCallback {
	/// Merchant-side request identifier from the checkout response.
	#[serde(rename = "MerchantRequestID")]
	pub merchant_request_id: String,
	/// Checkout identifier from the checkout response.
	#[serde(rename = "CheckoutRequestID")]
	pub checkout_request_id: String,
	/// `0` on success; any other value is a failure or cancellation.
	#[serde(rename = "ResultCode")]
	pub result_code: i64,
	/// Provider description of the result.
	#[serde(rename = "ResultDesc", default)]
	pub result_desc: String,
	/// Payment details; empty for failed pushes.
	#[serde(rename = "CallbackMetadata", default)]
	pub metadata: CallbackMetadata,
}
impl StkCallback {
	/// Returns `true` when the customer completed the payment.
	pub fn is_success(&self) -> bool {
		self.result_code == 0
	}

	/// Returns the first metadata value named `name`.
	pub fn metadata_value(&self, name: &str) -> Option<&CallbackValue> {
		self.metadata.items.iter().find(|item| item.name == name).map(|item| &item.value)
	}

	/// Returns the paid amount, when reported.
	pub fn amount(&self) -> Option<Decimal> {
		self.metadata_value("Amount").and_then(CallbackValue::as_decimal)
	}

	/// Returns the provider receipt number, when reported.
	pub fn receipt_number(&self) -> Option<Cow<'_, str>> {
		self.metadata_value("MpesaReceiptNumber").and_then(CallbackValue::as_text)
	}
}

/// Ordered metadata attached to successful callbacks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackMetadata {
	/// Items in delivery order.
	#[serde(rename = "Item", default)]
	pub items: Vec<CallbackItem>,
}

/// One named metadata entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallbackItem {
	/// Item name, e.g. `Amount` or `MpesaReceiptNumber`.
	#[serde(rename = "Name")]
	pub name: String,
	/// Item value; absent for items such as `Balance`.
	#[serde(rename = "Value", default)]
	pub value: CallbackValue,
}

/// Metadata value as delivered. JSON keeps numbers and strings apart; XML is always text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallbackValue {
	/// Numeric value.
	Number(serde_json::Number),
	/// Textual value.
	Text(String),
	/// Missing or `null`.
	#[default]
	Absent,
}
impl CallbackValue {
	/// Returns the value rendered as text; `None` when absent.
	pub fn as_text(&self) -> Option<Cow<'_, str>> {
		match self {
			Self::Number(number) => Some(Cow::Owned(number.to_string())),
			Self::Text(text) => Some(Cow::Borrowed(text)),
			Self::Absent => None,
		}
	}

	/// Returns the value as an integer, parsing text when needed.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Number(number) => number.as_i64(),
			Self::Text(text) => text.trim().parse().ok(),
			Self::Absent => None,
		}
	}

	/// Returns the value as a decimal, parsing text when needed.
	pub fn as_decimal(&self) -> Option<Decimal> {
		self.as_text().and_then(|text| Decimal::from_str(text.trim()).ok())
	}
}
impl Display for CallbackValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Number(number) => write!(f, "{number}"),
			Self::Text(text) => f.write_str(text),
			Self::Absent => Ok(()),
		}
	}
}

/// C2B validation request delivered by the provider before it completes a payment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationTransaction {
	/// Request type.
	#[serde(rename = "RequestType")]
	pub request_type: String,
	/// Transaction type, e.g. `Pay Bill`.
	#[serde(rename = "TransactionType")]
	pub transaction_type: String,
	/// Provider transaction identifier.
	#[serde(rename = "TransID")]
	pub trans_id: String,
	/// Transaction time (`YYYYMMDDHHmmss`).
	#[serde(rename = "TransTime")]
	pub trans_time: String,
	/// Amount as text.
	#[serde(rename = "TransAmount")]
	pub trans_amount: String,
	/// Receiving short code.
	#[serde(rename = "BusinessShortCode")]
	pub business_short_code: String,
	/// Account number entered by the customer.
	#[serde(rename = "BillRefNumber")]
	pub bill_ref_number: String,
	/// Invoice number.
	#[serde(rename = "InvoiceNumber")]
	pub invoice_number: String,
	/// Organization balance after the transaction.
	#[serde(rename = "OrgAccountBalance")]
	pub org_account_balance: String,
	/// Merchant-side transaction identifier.
	#[serde(rename = "ThirdPartyTransID")]
	pub third_party_trans_id: String,
	/// Customer phone number.
	#[serde(rename = "MSISDN")]
	pub msisdn: String,
	/// Customer first name.
	#[serde(rename = "FirstName")]
	pub first_name: String,
	/// Customer middle name.
	#[serde(rename = "MiddleName")]
	pub middle_name: String,
	/// Customer last name.
	#[serde(rename = "LastName")]
	pub last_name: String,
}
impl ValidationTransaction {
	/// Decodes a validation request body.
	pub fn from_json(raw: &[u8]) -> Result<Self, DecodingError> {
		ContentType::Json.decode(raw)
	}

	/// Returns the transaction amount, when it parses.
	pub fn amount(&self) -> Option<Decimal> {
		Decimal::from_str(self.trans_amount.trim()).ok()
	}
}

/// Reply to a C2B validation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
	/// `"0"` accepts the payment; any other code rejects it.
	#[serde(rename = "ResultCode")]
	pub result_code: String,
	/// Description returned to the provider.
	#[serde(rename = "ResultDesc")]
	pub result_desc: String,
}
impl ValidationResponse {
	/// Accepts the payment.
	pub fn accept() -> Self {
		Self { result_code: SUCCESS_CODE.into(), result_desc: "Accepted".into() }
	}

	/// Rejects the payment with a provider rejection code such as `C2B00012`.
	pub fn reject(code: impl Into<String>, description: impl Into<String>) -> Self {
		Self { result_code: code.into(), result_desc: description.into() }
	}

	/// Returns `true` for an accepting reply.
	pub fn is_accepted(&self) -> bool {
		self.result_code == SUCCESS_CODE
	}
}

#[derive(Deserialize)]
struct XmlEnvelope {
	#[serde(rename = "Body")]
	body: XmlBody,
}
impl From<XmlEnvelope> for StkCallbackEnvelope {
	fn from(envelope: XmlEnvelope) -> Self {
		let callback = envelope.body.stk_callback;

		Self {
			body: StkCallbackBody {
				stk_callback: StkCallback {
					merchant_request_id: callback.merchant_request_id,
					checkout_request_id: callback.checkout_request_id,
					result_code: callback.result_code,
					result_desc: callback.result_desc,
					metadata: CallbackMetadata {
						items: callback
							.metadata
							.items
							.into_iter()
							.map(|item| CallbackItem {
								name: item.name,
								value: item
									.value
									.filter(|text| !text.trim().is_empty())
									.map_or(CallbackValue::Absent, CallbackValue::Text),
							})
							.collect(),
					},
				},
			},
		}
	}
}

#[derive(Deserialize)]
struct XmlBody {
	#[serde(rename = "stkCallback")]
	stk_callback: XmlStkCallback,
}

#[derive(Deserialize)]
struct XmlStkCallback {
	#[serde(rename = "MerchantRequestID")]
	merchant_request_id: String,
	#[serde(rename = "CheckoutRequestID")]
	checkout_request_id: String,
	#[serde(rename = "ResultCode")]
	result_code: i64,
	#[serde(rename = "ResultDesc", default)]
	result_desc: String,
	#[serde(rename = "CallbackMetadata", default)]
	metadata: XmlMetadata,
}

#[derive(Default, Deserialize)]
struct XmlMetadata {
	#[serde(rename = "Item", default)]
	items: Vec<XmlItem>,
}

#[derive(Deserialize)]
struct XmlItem {
	#[serde(rename = "Name")]
	name: String,
	#[serde(rename = "Value", default)]
	value: Option<String>,
}
