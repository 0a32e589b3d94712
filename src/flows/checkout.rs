//! STK push checkout initiation.
//!
//! [`MpesaClient::initiate_checkout`] validates caller input locally, fills in the merchant
//! fields from configuration, obtains a bearer token through the shared [`TokenGuard`], and
//! posts the request through the gateway. Provider rejections arrive either as a checkout
//! response with a non-zero `ResponseCode` or as a [`ProviderFault`] body; both surface as
//! [`Error::Provider`].
//!
//! [`TokenGuard`]: crate::auth::TokenGuard

// self
use crate::{
	_prelude::*,
	error::ValidationError,
	flows::{
		MpesaClient,
		common::{self, ProviderFault},
	},
	gateway::{CallContext, ContentType, RequestBody},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	transport::HttpTransport,
};

const OPERATION: &str = "checkout";

/// Caller-supplied checkout input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
	/// Amount to charge; must be positive.
	pub amount: Decimal,
	/// Phone number receiving the STK prompt.
	pub phone_number: String,
	/// Debit party, usually the same phone number.
	pub party_a: String,
	/// Merchant reference shown to the customer.
	pub account_reference: String,
	/// Free-form description.
	#[serde(default)]
	pub transaction_desc: String,
}
impl CheckoutRequest {
	/// Creates a request charging `amount` to `phone_number`, which also acts as party A.
	pub fn new(
		amount: Decimal,
		phone_number: impl Into<String>,
		account_reference: impl Into<String>,
	) -> Self {
		let phone_number = phone_number.into();

		Self {
			amount,
			party_a: phone_number.clone(),
			phone_number,
			account_reference: account_reference.into(),
			transaction_desc: String::new(),
		}
	}

	/// Overrides the debit party.
	pub fn with_party_a(mut self, party_a: impl Into<String>) -> Self {
		self.party_a = party_a.into();

		self
	}

	/// Sets the transaction description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.transaction_desc = description.into();

		self
	}

	/// Checks required fields, reporting every missing one at once.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let mut missing = Vec::new();

		if self.amount <= Decimal::ZERO {
			missing.push("amount");
		}
		if self.phone_number.trim().is_empty() {
			missing.push("phone_number");
		}
		if self.party_a.trim().is_empty() {
			missing.push("party_a");
		}
		if self.account_reference.trim().is_empty() {
			missing.push("account_reference");
		}

		ValidationError::check(missing)
	}
}

/// STK push body as sent on the wire.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StkPushRequest {
	/// Paybill or till number.
	#[serde(rename = "BusinessShortCode")]
	pub business_short_code: String,
	/// `base64(short_code + passkey + timestamp)`.
	#[serde(rename = "Password")]
	pub password: String,
	/// `YYYYMMDDHHmmss` in provider time.
	#[serde(rename = "Timestamp")]
	pub timestamp: String,
	/// Configured transaction type.
	#[serde(rename = "TransactionType")]
	pub transaction_type: String,
	/// Amount to charge.
	#[serde(rename = "Amount")]
	pub amount: Decimal,
	/// Debit party.
	#[serde(rename = "PartyA")]
	pub party_a: String,
	/// Credit party (the short code).
	#[serde(rename = "PartyB")]
	pub party_b: String,
	/// Phone number receiving the prompt.
	#[serde(rename = "PhoneNumber")]
	pub phone_number: String,
	/// Where the provider delivers the result callback.
	#[serde(rename = "CallBackURL")]
	pub callback_url: String,
	/// Merchant reference.
	#[serde(rename = "AccountReference")]
	pub account_reference: String,
	/// Free-form description.
	#[serde(rename = "TransactionDesc")]
	pub transaction_desc: String,
}
impl Debug for StkPushRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StkPushRequest")
			.field("business_short_code", &self.business_short_code)
			.field("password", &"<redacted>")
			.field("timestamp", &self.timestamp)
			.field("transaction_type", &self.transaction_type)
			.field("amount", &self.amount)
			.field("party_a", &self.party_a)
			.field("party_b", &self.party_b)
			.field("phone_number", &self.phone_number)
			.field("callback_url", &self.callback_url)
			.field("account_reference", &self.account_reference)
			.field("transaction_desc", &self.transaction_desc)
			.finish()
	}
}

/// Provider acknowledgement of an STK push.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
	/// Merchant-side request identifier.
	#[serde(rename = "MerchantRequestID", default)]
	pub merchant_request_id: String,
	/// Identifier echoed back in the result callback.
	#[serde(rename = "CheckoutRequestID", default)]
	pub checkout_request_id: String,
	/// `"0"` when the push was accepted.
	#[serde(rename = "ResponseCode")]
	pub response_code: String,
	/// Provider description of the outcome.
	#[serde(rename = "ResponseDescription", default)]
	pub response_description: String,
	/// Message intended for the customer.
	#[serde(rename = "CustomerMessage", default)]
	pub customer_message: String,
}
impl CheckoutResponse {
	/// Returns `true` when the provider accepted the push.
	pub fn is_accepted(&self) -> bool {
		self.response_code.trim() == common::SUCCESS_CODE
	}
}

impl<T> MpesaClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Sends an STK push prompt for `request`; the result callback is routed to `payment_id`.
	///
	/// Validation failures return before any I/O. An HTTP 401 drops the cached token so the
	/// next call refreshes it.
	pub async fn initiate_checkout(
		&self,
		ctx: &CallContext,
		request: CheckoutRequest,
		payment_id: &str,
	) -> Result<CheckoutResponse> {
		const KIND: OperationKind = OperationKind::Checkout;

		let span = OperationSpan::new(KIND, "initiate_checkout");

		span.record_payment_id(payment_id);
		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.checkout_inner(ctx, request, payment_id)).await;

		if let Ok(response) = &result {
			span.record_checkout_request_id(&response.checkout_request_id);
		}

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	/// Builds the wire body for `request` at `now`.
	pub fn stk_push_request(
		&self,
		request: CheckoutRequest,
		payment_id: &str,
		now: OffsetDateTime,
	) -> StkPushRequest {
		let timestamp = common::provider_timestamp(now);
		let short_code = &self.config.business_short_code;

		StkPushRequest {
			business_short_code: short_code.clone(),
			password: common::stk_password(short_code, self.config.passkey.expose(), &timestamp),
			timestamp,
			transaction_type: self.config.transaction_type.clone(),
			amount: request.amount,
			party_a: request.party_a,
			party_b: short_code.clone(),
			phone_number: request.phone_number,
			callback_url: self.config.callback_url(payment_id),
			account_reference: request.account_reference,
			transaction_desc: request.transaction_desc,
		}
	}

	async fn checkout_inner(
		&self,
		ctx: &CallContext,
		request: CheckoutRequest,
		payment_id: &str,
	) -> Result<CheckoutResponse> {
		if let Err(err) = request.validate() {
			obs::validation_failed(OPERATION, &err.fields);

			return Err(err.into());
		}

		let body = self.stk_push_request(request, payment_id, OffsetDateTime::now_utc());
		let token = self.tokens.ensure_valid(ctx).await?;
		let authorization = token.authorization()?;
		let exchange = self
			.gateway
			.execute::<CheckoutResponse, _>(
				ctx,
				Method::POST,
				self.config.checkout_url.clone(),
				ContentType::Json,
				|request| request.set_authorization(authorization),
				RequestBody::json(&body),
			)
			.await?;

		if exchange.status() == StatusCode::UNAUTHORIZED {
			self.tokens.invalidate();
		}

		let response = match exchange.decoded {
			Ok(response) => response,
			Err(err) => match ProviderFault::parse(&exchange.response.body) {
				Some(fault) => return Err(fault.into_error(OPERATION)),
				None => return Err(err.into()),
			},
		};

		if !response.is_accepted() {
			obs::provider_rejected(
				OPERATION,
				&response.response_code,
				&response.response_description,
			);

			return Err(Error::Provider {
				operation: OPERATION,
				code: response.response_code,
				description: response.response_description,
			});
		}

		Ok(response)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn validation_reports_every_missing_field() {
		let err = CheckoutRequest::default()
			.validate()
			.expect_err("Empty requests should fail validation.");

		assert_eq!(err.fields, ["amount", "phone_number", "party_a", "account_reference"]);

		let request = CheckoutRequest::new(Decimal::new(150, 0), "254708374149", "INV-7");

		assert!(request.validate().is_ok());
		assert_eq!(request.party_a, "254708374149");

		let err = request
			.with_party_a(" ")
			.validate()
			.expect_err("Blank party A should fail validation.");

		assert_eq!(err.fields, ["party_a"]);
	}

	#[test]
	fn negative_amounts_are_rejected() {
		let err = CheckoutRequest::new(Decimal::new(-1, 0), "254708374149", "INV-7")
			.validate()
			.expect_err("Negative amounts should fail validation.");

		assert_eq!(err.fields, ["amount"]);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn wire_body_fills_merchant_fields() {
		let client = crate::_preludet::build_reqwest_test_client("http://127.0.0.1:9");
		let body = client.stk_push_request(
			CheckoutRequest::new(Decimal::new(1050, 2), "254708374149", "INV-7")
				.with_description("Order 7"),
			"pay-7",
			datetime!(2024-03-01 09:30:00 UTC),
		);
		let json = serde_json::to_value(&body).expect("Wire body should serialize.");

		assert_eq!(json["BusinessShortCode"], "174379");
		assert_eq!(json["PartyB"], "174379");
		assert_eq!(json["PartyA"], "254708374149");
		assert_eq!(json["Timestamp"], "20240301123000");
		assert_eq!(json["Amount"], "10.50");
		assert_eq!(json["TransactionType"], "CustomerPayBillOnline");
		assert_eq!(json["CallBackURL"], "https://merchant.example.com/callbacks/pay-7");
		assert_eq!(json["TransactionDesc"], "Order 7");
		assert_eq!(
			json["Password"],
			common::stk_password("174379", "test-passkey", "20240301123000")
		);
		assert!(!format!("{body:?}").contains(&body.password));
	}

	#[test]
	fn responses_tolerate_missing_optional_fields() {
		let response: CheckoutResponse =
			serde_json::from_str(r#"{"ResponseCode":"1","ResponseDescription":"Insufficient funds"}"#)
				.expect("Sparse responses should decode.");

		assert!(!response.is_accepted());
		assert!(response.customer_message.is_empty());
	}
}
