//! Cached bearer token model and the token endpoint's wire format.

// self
use crate::{_prelude::*, auth::Secret, error::AuthError};

/// Bearer token plus the instant it stops being accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
	/// Opaque access token; callers must avoid logging it.
	pub token: Secret,
	/// Provider-reported expiry instant.
	pub expiry: OffsetDateTime,
}
impl AuthToken {
	/// Creates a token record.
	pub fn new(token: impl Into<String>, expiry: OffsetDateTime) -> Self {
		Self { token: Secret::new(token), expiry }
	}

	/// Returns `true` when the token is non-empty and `now + margin` is still before expiry.
	pub fn is_fresh_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		!self.token.is_empty()
			&& now.checked_add(margin).is_some_and(|deadline| deadline < self.expiry)
	}

	/// Builds the `Authorization: Bearer ...` header value, marked sensitive.
	pub fn authorization(&self) -> Result<HeaderValue, AuthError> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token.expose()))
			.map_err(|_| AuthError::MalformedToken)?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl Debug for AuthToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthToken")
			.field("token", &"<redacted>")
			.field("expiry", &self.expiry)
			.finish()
	}
}

/// Token endpoint response body.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
	/// Issued access token.
	pub access_token: Secret,
	/// Token type, when reported.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Lifetime in seconds; the provider sends it as a string.
	pub expires_in: ExpiresIn,
}
impl TokenResponse {
	/// Validates the payload and converts it into an [`AuthToken`] issued at `issued_at`.
	pub fn into_auth_token(self, issued_at: OffsetDateTime) -> Result<AuthToken, AuthError> {
		let token = self.access_token.expose().trim();

		if token.is_empty() || HeaderValue::from_str(token).is_err() {
			return Err(AuthError::MalformedToken);
		}

		let lifetime = self.expires_in.seconds()?;
		let expiry = issued_at
			.checked_add(Duration::seconds(lifetime))
			.ok_or_else(|| AuthError::InvalidExpiresIn { value: self.expires_in.to_string() })?;

		Ok(AuthToken::new(token, expiry))
	}
}

/// `expires_in` as received: providers disagree on string versus number.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExpiresIn {
	/// Numeric seconds.
	Seconds(i64),
	/// Seconds encoded as a string.
	Text(String),
}
impl ExpiresIn {
	/// Returns the positive lifetime in seconds.
	pub fn seconds(&self) -> Result<i64, AuthError> {
		let parsed = match self {
			Self::Seconds(secs) => Some(*secs),
			Self::Text(text) => text.trim().parse::<i64>().ok(),
		};

		parsed
			.filter(|secs| *secs > 0)
			.ok_or_else(|| AuthError::InvalidExpiresIn { value: self.to_string() })
	}
}
impl Display for ExpiresIn {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Seconds(secs) => write!(f, "{secs}"),
			Self::Text(text) => f.write_str(text),
		}
	}
}
