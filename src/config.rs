//! Relay configuration and startup validation.

// std
use std::net::{Ipv4Addr, SocketAddr};
// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError};

/// Settings shared by the front service and the diagnostic tools.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
	/// Backend endpoint every inbound request is forwarded to.
	pub backend_url: Url,
	/// Attach a bearer token to backend calls.
	#[serde(default)]
	pub use_auth: bool,
	/// Whitespace-delimited scope identifiers requested from the issuer.
	#[serde(default)]
	pub scope: String,
	/// Address the front service listens on.
	#[serde(default = "RelayConfig::default_bind")]
	pub bind: SocketAddr,
	/// Credential issuer settings; required when `use_auth` is set.
	#[serde(default)]
	pub issuer: Option<IssuerConfig>,
}
impl RelayConfig {
	/// Creates an unauthenticated config for `backend_url`.
	pub fn new(backend_url: Url) -> Self {
		Self {
			backend_url,
			use_auth: false,
			scope: String::new(),
			bind: Self::default_bind(),
			issuer: None,
		}
	}

	/// Enables bearer authentication with the given scope and issuer.
	pub fn with_auth(mut self, scope: impl Into<String>, issuer: IssuerConfig) -> Self {
		self.use_auth = true;
		self.scope = scope.into();
		self.issuer = Some(issuer);

		self
	}

	/// Checks the settings that must hold before the service starts.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.use_auth {
			return Ok(());
		}

		let scopes = self.scopes()?;

		if scopes.is_empty() {
			return Err(ConfigError::MissingScope);
		}
		if self.issuer.is_none() {
			return Err(ConfigError::MissingIssuer);
		}

		Ok(())
	}

	/// Parses the configured scope string.
	pub fn scopes(&self) -> Result<ScopeSet, ConfigError> {
		if self.scope.trim().is_empty() {
			return Ok(ScopeSet::default());
		}

		Ok(ScopeSet::from_str(&self.scope)?)
	}

	fn default_bind() -> SocketAddr {
		SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
	}
}

/// How client credentials are presented to the issuer's token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuerAuthStyle {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	Basic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	RequestBody,
}

/// Connection settings for the OAuth 2.0 client-credentials issuer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerConfig {
	/// Token endpoint.
	pub token_url: Url,
	/// Client identifier.
	pub client_id: String,
	/// Client secret, if the client is confidential.
	#[serde(default)]
	pub client_secret: Option<String>,
	/// Client authentication style.
	#[serde(default)]
	pub auth_style: IssuerAuthStyle,
}
impl IssuerConfig {
	/// Creates issuer settings for a public client.
	pub fn new(token_url: Url, client_id: impl Into<String>) -> Self {
		Self {
			token_url,
			client_id: client_id.into(),
			client_secret: None,
			auth_style: IssuerAuthStyle::default(),
		}
	}

	/// Sets the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the client authentication style.
	pub fn with_auth_style(mut self, style: IssuerAuthStyle) -> Self {
		self.auth_style = style;

		self
	}
}
impl Debug for IssuerConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuerConfig")
			.field("token_url", &self.token_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("auth_style", &self.auth_style)
			.finish()
	}
}
