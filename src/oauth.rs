//! OAuth 2.0 client-credentials adapter implementing [`CredentialSource`].
//!
//! Only the token request is used: the issuer is asked for a token with the configured scopes,
//! and the response's `expires_in` is turned into an absolute `expires_at` using the adapter's
//! clock at the moment the response arrives. Everything else about the protocol stays with the
//! issuer.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	clock::{Clock, SystemClock},
	config::{IssuerAuthStyle, IssuerConfig},
	error::{ConfigError, IssuerError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	source::{CredentialSource, IssuedToken, SourceFuture},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Credential source that runs the client-credentials grant against a token endpoint.
pub struct ClientCredentialsSource<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	clock: Arc<dyn Clock>,
	token_url: Url,
}
impl ClientCredentialsSource<ReqwestHttpClient> {
	/// Builds a source that uses the crate's default reqwest transport.
	pub fn from_config(config: &IssuerConfig) -> Result<Self> {
		Self::with_http_client(config, ReqwestHttpClient::try_new()?)
	}
}
impl<C> ClientCredentialsSource<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Builds a source over a caller-provided transport.
	pub fn with_http_client(config: &IssuerConfig, http_client: impl Into<Arc<C>>) -> Result<Self> {
		let token_url = TokenUrl::new(config.token_url.to_string())
			.map_err(|source| ConfigError::InvalidTokenUrl { source })?;
		let mut oauth_client =
			BasicClient::new(ClientId::new(config.client_id.clone())).set_token_uri(token_url);

		if let Some(secret) = &config.client_secret {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.clone()));
		}
		if matches!(config.auth_style, IssuerAuthStyle::RequestBody) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			http_client: http_client.into(),
			clock: Arc::new(SystemClock),
			token_url: config.token_url.clone(),
		})
	}

	/// Overrides the clock used to anchor `expires_in`.
	pub fn with_clock(mut self, clock: impl 'static + Clock) -> Self {
		self.clock = Arc::new(clock);

		self
	}

	/// Token endpoint this source talks to.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}
}
impl<C> CredentialSource for ClientCredentialsSource<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fetch_token<'a>(&'a self, scopes: &'a ScopeSet) -> SourceFuture<'a> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut request = self.oauth_client.exchange_client_credentials();

			for scope in scopes {
				request = request.add_scope(Scope::new(scope.to_owned()));
			}

			let response = request
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(meta.take(), err))?;
			let received_at = self.clock.now();
			let expires_in = response.expires_in().ok_or(IssuerError::MissingExpiry)?;
			let expires_in =
				Duration::try_from(expires_in).map_err(|_| IssuerError::ExpiryOutOfRange)?;
			let expires_at =
				received_at.checked_add(expires_in).ok_or(IssuerError::ExpiryOutOfRange)?;

			Ok(IssuedToken::new(response.access_token().secret().to_owned(), expires_at))
		})
	}
}
impl<C> Debug for ClientCredentialsSource<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsSource")
			.field("token_url", &self.token_url.as_str())
			.finish()
	}
}

fn map_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> IssuerError
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, status),
		RequestTokenError::Request(error) => map_transport_error(error, status),
		RequestTokenError::Parse(source, _body) => IssuerError::Malformed { source, status },
		RequestTokenError::Other(message) => IssuerError::Unexpected { message, status },
	}
}

fn map_server_response_error(response: BasicErrorResponse, status: Option<u16>) -> IssuerError {
	let reason = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	IssuerError::Denied { reason, status }
}

fn map_transport_error<E>(err: HttpClientError<E>, status: Option<u16>) -> IssuerError
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => IssuerError::Network { source: inner },
		HttpClientError::Io(inner) => IssuerError::network(inner),
		HttpClientError::Http(inner) => IssuerError::Unexpected {
			message: format!("Token request could not be built: {inner}"),
			status,
		},
		HttpClientError::Other(message) => IssuerError::Unexpected { message, status },
		_ => IssuerError::Unexpected {
			message: "HTTP client error occurred while calling the credential issuer".into(),
			status,
		},
	}
}
