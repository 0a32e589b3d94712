//! Authenticated-request executor: body encoding, header mutation, and content negotiation.
//!
//! [`HttpGateway::execute`] is the single entry point every provider call goes through. It
//! encodes the body locally (failing fast with [`EncodingError`](crate::error::EncodingError)),
//! lets the caller mutate the request, defaults `Content-Type` to `application/json`, sends
//! through an [`HttpTransport`] under the caller's [`CallContext`], buffers the response, and
//! decodes it as JSON or XML. The raw response is always returned next to the decode outcome,
//! and HTTP status is never interpreted here.

pub mod body;
pub mod context;

pub use body::*;
pub use context::*;

// self
use crate::{
	_prelude::*,
	error::DecodingError,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	transport::{HttpTransport, OutboundRequest, RawResponse},
};
#[cfg(feature = "reqwest")]
use crate::{config::GatewayConfig, transport::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = HttpGateway<ReqwestTransport>;

/// Default `Content-Type` applied when the mutation hook leaves it unset.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Transport-agnostic request executor shared by the token guard and business flows.
pub struct HttpGateway<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
}
impl<T> HttpGateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a gateway over `transport`.
	pub fn new(transport: impl Into<Arc<T>>) -> Self {
		Self { transport: transport.into() }
	}

	/// Returns the shared transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Executes one request and decodes the buffered response into `R`.
	///
	/// Returns `Err` only for local encoding failures and transport failures; a body that
	/// cannot be decoded still yields `Ok` with [`Exchange::decoded`] set to the error.
	pub async fn execute<R, F>(
		&self,
		ctx: &CallContext,
		method: Method,
		url: Url,
		content_type: ContentType,
		mutate: F,
		body: RequestBody,
	) -> Result<Exchange<R>>
	where
		R: DeserializeOwned,
		F: FnOnce(&mut OutboundRequest),
	{
		const KIND: OperationKind = OperationKind::Execute;

		let span = OperationSpan::new(KIND, "execute");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(self.execute_inner(ctx, method, url, content_type, mutate, body))
			.await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	async fn execute_inner<R, F>(
		&self,
		ctx: &CallContext,
		method: Method,
		url: Url,
		content_type: ContentType,
		mutate: F,
		body: RequestBody,
	) -> Result<Exchange<R>>
	where
		R: DeserializeOwned,
		F: FnOnce(&mut OutboundRequest),
	{
		let target = url.to_string();
		let mut request = OutboundRequest::new(method.clone(), url, body.encode()?);

		mutate(&mut request);

		if !request.headers.contains_key(http::header::CONTENT_TYPE) {
			request.set_header(
				http::header::CONTENT_TYPE,
				HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
			);
		}

		let response = ctx
			.run(&target, async { self.transport.send(request).await.map_err(Error::from) })
			.await
			.inspect_err(|err| obs::request_failed(&method, &target, err))?;
		let decoded = content_type.decode::<R>(&response.body);

		if let Err(err) = &decoded {
			obs::decode_failed(&target, response.status, err);
		}

		Ok(Exchange { response, decoded })
	}
}
#[cfg(feature = "reqwest")]
impl HttpGateway<ReqwestTransport> {
	/// Creates a gateway over a reqwest transport built from `config`.
	pub fn from_config(config: &GatewayConfig) -> Result<Self> {
		Ok(Self::new(ReqwestTransport::from_config(config)?))
	}
}
impl<T> Debug for HttpGateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpGateway").finish_non_exhaustive()
	}
}

/// Response envelope: the buffered transport response plus the decode outcome.
#[derive(Debug)]
pub struct Exchange<R> {
	/// Raw buffered response, available even when decoding failed.
	pub response: RawResponse,
	/// Decoded body or the decoding failure.
	pub decoded: Result<R, DecodingError>,
}
impl<R> Exchange<R> {
	/// HTTP status of the response.
	pub fn status(&self) -> StatusCode {
		self.response.status
	}

	/// Discards the raw response and returns the decoded value.
	pub fn into_decoded(self) -> Result<R> {
		self.decoded.map_err(Error::from)
	}
}

/// Negotiated response content type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
	/// JSON bodies (`application/json`, `text/json`).
	#[default]
	Json,
	/// XML or SOAP-envelope bodies.
	Xml,
}
impl ContentType {
	/// Maps a caller hint onto a content type.
	///
	/// Empty, `application/json`, and `text/json` select JSON (case-insensitive, surrounding
	/// whitespace ignored); every other hint selects XML.
	pub fn from_hint(hint: &str) -> Self {
		let hint = hint.trim();

		if hint.is_empty()
			|| hint.eq_ignore_ascii_case("application/json")
			|| hint.eq_ignore_ascii_case("text/json")
		{
			Self::Json
		} else {
			Self::Xml
		}
	}

	/// Returns the canonical MIME type.
	pub const fn as_mime(self) -> &'static str {
		match self {
			Self::Json => "application/json",
			Self::Xml => "application/xml",
		}
	}

	/// Decodes `raw` into `R`, keeping a copy of the bytes on failure.
	pub fn decode<R>(self, raw: &[u8]) -> Result<R, DecodingError>
	where
		R: DeserializeOwned,
	{
		match self {
			Self::Json => {
				let mut de = serde_json::Deserializer::from_slice(raw);

				serde_path_to_error::deserialize(&mut de)
					.map_err(|source| DecodingError::Json { source, raw: raw.to_vec() })
			},
			Self::Xml => quick_xml::de::from_reader(raw)
				.map_err(|source| DecodingError::Xml { source, raw: raw.to_vec() }),
		}
	}
}
impl From<&str> for ContentType {
	fn from(hint: &str) -> Self {
		Self::from_hint(hint)
	}
}
impl Display for ContentType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_mime())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, PartialEq, Deserialize)]
	struct Sample {
		#[serde(rename = "Code")]
		code: String,
	}

	#[test]
	fn hints_select_json_or_xml() {
		for hint in ["", "  ", "application/json", "text/json", "Application/JSON"] {
			assert_eq!(ContentType::from_hint(hint), ContentType::Json, "hint {hint:?}");
		}
		for hint in ["application/xml", "text/xml", "application/soap+xml", "text/jsonp"] {
			assert_eq!(ContentType::from_hint(hint), ContentType::Xml, "hint {hint:?}");
		}
	}

	#[test]
	fn json_decode_failure_keeps_raw_bytes_and_path() {
		let err = ContentType::Json
			.decode::<Sample>(br#"{"Code": 7}"#)
			.expect_err("Numeric code should not decode into a string.");

		assert_eq!(err.raw(), br#"{"Code": 7}"#);

		match err {
			DecodingError::Json { source, .. } => assert_eq!(source.path().to_string(), "Code"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn xml_decode_reads_elements() {
		let sample: Sample = ContentType::Xml
			.decode(b"<Result><Code>0</Code></Result>")
			.expect("XML payload should decode.");

		assert_eq!(sample, Sample { code: "0".into() });

		let err = ContentType::Xml
			.decode::<Sample>(b"<Result><Code>0</Result>")
			.expect_err("Mismatched tags should fail.");

		assert!(matches!(err, DecodingError::Xml { .. }));
		assert_eq!(err.raw_lossy(), "<Result><Code>0</Result>");
	}
}
