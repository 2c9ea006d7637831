//! Outbound backend calls, optionally authenticated with a cached bearer token.

// crates.io
use reqwest::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	cache::TokenCache,
	config::RelayConfig,
	error::{ConfigError, TransportError},
	oauth::ClientCredentialsSource,
};

/// Issues `GET` requests to the backend, attaching `Authorization: Bearer <token>` when a token
/// cache is configured.
#[derive(Clone)]
pub struct AuthenticatedRequester {
	http_client: ReqwestClient,
	backend_url: Url,
	tokens: Option<TokenCache>,
}
impl AuthenticatedRequester {
	/// Creates an unauthenticated requester for `backend_url`.
	pub fn new(http_client: ReqwestClient, backend_url: Url) -> Self {
		Self { http_client, backend_url, tokens: None }
	}

	/// Validates `config` and wires the issuer, token cache, and HTTP client it describes.
	///
	/// This is the composition root for the auth path: one [`TokenCache`] is built here and
	/// shared by every clone of the returned requester.
	pub fn from_config(config: &RelayConfig) -> Result<Self> {
		config.validate()?;

		let http_client = ReqwestClient::builder().build().map_err(ConfigError::from)?;
		let requester = Self::new(http_client, config.backend_url.clone());

		if !config.use_auth {
			return Ok(requester);
		}

		let issuer = config.issuer.as_ref().ok_or(ConfigError::MissingIssuer)?;
		let source = ClientCredentialsSource::from_config(issuer)?;

		Ok(requester.with_token_cache(TokenCache::new(source, config.scopes()?)))
	}

	/// Enables bearer authentication backed by `cache`.
	pub fn with_token_cache(mut self, cache: TokenCache) -> Self {
		self.tokens = Some(cache);

		self
	}

	/// Returns `true` when outbound calls carry a bearer token.
	pub fn uses_auth(&self) -> bool {
		self.tokens.is_some()
	}

	/// Token cache in use, if auth is enabled.
	pub fn token_cache(&self) -> Option<&TokenCache> {
		self.tokens.as_ref()
	}

	/// Calls the backend and returns its body.
	///
	/// A non-success status becomes [`Error::Upstream`]; token failures surface as
	/// [`Error::TokenIssuer`] before any backend call is made.
	pub async fn fetch(&self) -> Result<String> {
		let mut request = self.http_client.get(self.backend_url.clone());

		if let Some(cache) = &self.tokens {
			let token = cache.get_valid_token().await?;

			request = request.header(AUTHORIZATION, token.bearer());
		}

		let response = request.send().await.map_err(TransportError::from)?;
		let status = response.status();

		if !status.is_success() {
			return Err(Error::Upstream {
				status: status.as_u16(),
				reason: status.canonical_reason().unwrap_or_default().to_owned(),
			});
		}

		Ok(response.text().await.map_err(TransportError::from)?)
	}
}
impl Debug for AuthenticatedRequester {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedRequester")
			.field("backend_url", &self.backend_url.as_str())
			.field("uses_auth", &self.uses_auth())
			.finish()
	}
}
