// self
use crate::{
	_prelude::*,
	auth::Secret,
	config::MpesaConfig,
	error::ConfigError,
};

/// Builder for [`MpesaConfig`] values; also the deserialization shape of configuration files.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MpesaConfigBuilder {
	/// Consumer key issued by the provider portal.
	pub consumer_key: Option<String>,
	/// Consumer secret issued by the provider portal.
	pub consumer_secret: Option<Secret>,
	/// Paybill or till number.
	pub business_short_code: Option<String>,
	/// Lipa Na M-Pesa Online passkey.
	pub passkey: Option<Secret>,
	/// Transaction type sent with checkout requests.
	pub transaction_type: Option<String>,
	/// OAuth token issuance endpoint.
	pub token_url: Option<Url>,
	/// STK push processing endpoint.
	pub checkout_url: Option<Url>,
	/// Callback URL template containing `{}`.
	pub callback_url_template: Option<String>,
	/// Token safety margin in seconds.
	pub token_safety_margin: Option<i64>,
}
impl MpesaConfigBuilder {
	/// Sets the consumer key.
	pub fn consumer_key(mut self, value: impl Into<String>) -> Self {
		self.consumer_key = Some(value.into());

		self
	}

	/// Sets the consumer secret.
	pub fn consumer_secret(mut self, value: Secret) -> Self {
		self.consumer_secret = Some(value);

		self
	}

	/// Sets the business short code.
	pub fn business_short_code(mut self, value: impl Into<String>) -> Self {
		self.business_short_code = Some(value.into());

		self
	}

	/// Sets the STK passkey.
	pub fn passkey(mut self, value: Secret) -> Self {
		self.passkey = Some(value);

		self
	}

	/// Sets the checkout transaction type.
	pub fn transaction_type(mut self, value: impl Into<String>) -> Self {
		self.transaction_type = Some(value.into());

		self
	}

	/// Sets the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Sets the STK push endpoint.
	pub fn checkout_url(mut self, url: Url) -> Self {
		self.checkout_url = Some(url);

		self
	}

	/// Sets the callback URL template.
	pub fn callback_url_template(mut self, template: impl Into<String>) -> Self {
		self.callback_url_template = Some(template.into());

		self
	}

	/// Overrides the token safety margin.
	///
	/// Defaults to 30 seconds. Negative values clamp to 0 and anything above
	/// [`MpesaConfig::MAX_TOKEN_SAFETY_MARGIN`] is rejected by [`build`](Self::build).
	pub fn token_safety_margin(mut self, margin: Duration) -> Self {
		self.token_safety_margin = Some(margin.whole_seconds());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<MpesaConfig, ConfigError> {
		let mut missing = Vec::new();
		let consumer_key = required(self.consumer_key, "consumer_key", &mut missing);
		let consumer_secret = self
			.consumer_secret
			.filter(|secret| !secret.is_blank())
			.or_else(|| {
				missing.push("consumer_secret");

				None
			});
		let business_short_code =
			required(self.business_short_code, "business_short_code", &mut missing);
		let passkey = self.passkey.filter(|secret| !secret.is_blank()).or_else(|| {
			missing.push("passkey");

			None
		});
		let transaction_type = required(self.transaction_type, "transaction_type", &mut missing);
		let token_url = self.token_url.or_else(|| {
			missing.push("token_url");

			None
		});
		let checkout_url = self.checkout_url.or_else(|| {
			missing.push("checkout_url");

			None
		});
		let callback_url_template =
			required(self.callback_url_template, "callback_url_template", &mut missing);

		let (
			Some(consumer_key),
			Some(consumer_secret),
			Some(business_short_code),
			Some(passkey),
			Some(transaction_type),
			Some(token_url),
			Some(checkout_url),
			Some(callback_url_template),
		) = (
			consumer_key,
			consumer_secret,
			business_short_code,
			passkey,
			transaction_type,
			token_url,
			checkout_url,
			callback_url_template,
		)
		else {
			return Err(ConfigError::MissingFields { fields: missing });
		};
		let token_safety_margin = match self.token_safety_margin {
			Some(seconds) if seconds > MpesaConfig::MAX_TOKEN_SAFETY_MARGIN.whole_seconds() =>
				return Err(ConfigError::InvalidSafetyMargin {
					seconds,
					max: MpesaConfig::MAX_TOKEN_SAFETY_MARGIN.whole_seconds(),
				}),
			Some(seconds) => Duration::seconds(seconds.max(0)),
			None => MpesaConfig::DEFAULT_TOKEN_SAFETY_MARGIN,
		};
		let config = MpesaConfig {
			consumer_key,
			consumer_secret,
			business_short_code,
			passkey,
			transaction_type,
			token_url,
			checkout_url,
			callback_url_template,
			token_safety_margin,
		};

		config.validate()?;

		Ok(config)
	}
}
impl TryFrom<MpesaConfigBuilder> for MpesaConfig {
	type Error = ConfigError;

	fn try_from(builder: MpesaConfigBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

impl MpesaConfig {
	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), ConfigError> {
		validate_endpoint("token", &self.token_url)?;
		validate_endpoint("checkout", &self.checkout_url)?;

		if !self.callback_url_template.contains("{}") {
			return Err(ConfigError::InvalidCallbackTemplate {
				template: self.callback_url_template.clone(),
			});
		}

		Ok(())
	}
}

fn required(
	value: Option<String>,
	field: &'static str,
	missing: &mut Vec<&'static str>,
) -> Option<String> {
	let value = value.filter(|value| !value.trim().is_empty());

	if value.is_none() {
		missing.push(field);
	}

	value
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ConfigError::InvalidEndpoint { endpoint: name, url: url.to_string() }),
	}
}
