//! Command-line and environment surface shared by the relay binaries.

// std
use std::net::SocketAddr;
// crates.io
use clap::{Args, ValueEnum};
use tracing_subscriber::{
	EnvFilter, fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt,
};
// self
use crate::{
	_prelude::*,
	config::{IssuerAuthStyle, IssuerConfig, RelayConfig},
};

/// Log output layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	/// Human-oriented single-line output with ANSI colors.
	#[default]
	Compact,
	/// Flattened JSON events, one per line.
	Json,
}

/// Logging flags.
#[derive(Clone, Debug, Args)]
pub struct LogArgs {
	/// Filter directive, e.g. `info` or `bearer_relay=debug,info`.
	#[arg(long, env = "LOG_LEVEL", default_value = "info")]
	pub log_level: String,
	/// Output layout.
	#[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
	pub log_format: LogFormat,
}
impl LogArgs {
	/// Installs the global subscriber. Repeated calls keep the first subscriber.
	pub fn init(&self) {
		let filter = EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
		let registry = tracing_subscriber::registry().with(filter);

		match self.log_format {
			LogFormat::Json => {
				let layer = fmt::layer()
					.json()
					.with_timer(UtcTime::rfc_3339())
					.flatten_event(true)
					.with_ansi(false);
				let _ = registry.with(layer).try_init();
			},
			LogFormat::Compact => {
				let layer = fmt::layer().compact().with_timer(UtcTime::rfc_3339()).with_ansi(true);
				let _ = registry.with(layer).try_init();
			},
		}
	}
}

/// Issuer flags, all optional so unauthenticated deployments need none of them.
#[derive(Clone, Args)]
pub struct IssuerArgs {
	/// OAuth 2.0 token endpoint of the credential issuer.
	#[arg(long, env = "ISSUER_TOKEN_URL")]
	pub issuer_token_url: Option<Url>,
	/// Client identifier registered with the issuer.
	#[arg(long, env = "ISSUER_CLIENT_ID")]
	pub issuer_client_id: Option<String>,
	/// Client secret registered with the issuer.
	#[arg(long, env = "ISSUER_CLIENT_SECRET", hide_env_values = true)]
	pub issuer_client_secret: Option<String>,
	/// How client credentials are presented to the token endpoint.
	#[arg(long, env = "ISSUER_AUTH_STYLE", value_enum, default_value_t = AuthStyleArg::Basic)]
	pub issuer_auth_style: AuthStyleArg,
}
impl IssuerArgs {
	/// Builds issuer settings when both the endpoint and client id are present.
	pub fn to_config(&self) -> Option<IssuerConfig> {
		let token_url = self.issuer_token_url.clone()?;
		let client_id = self.issuer_client_id.clone()?;
		let mut config =
			IssuerConfig::new(token_url, client_id).with_auth_style(self.issuer_auth_style.into());

		if let Some(secret) = &self.issuer_client_secret {
			config = config.with_client_secret(secret.clone());
		}

		Some(config)
	}
}
impl Debug for IssuerArgs {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuerArgs")
			.field("issuer_token_url", &self.issuer_token_url.as_ref().map(Url::as_str))
			.field("issuer_client_id", &self.issuer_client_id)
			.field("issuer_client_secret_set", &self.issuer_client_secret.is_some())
			.field("issuer_auth_style", &self.issuer_auth_style)
			.finish()
	}
}

/// Command-line spelling of [`IssuerAuthStyle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AuthStyleArg {
	/// HTTP Basic.
	Basic,
	/// Form body parameters.
	RequestBody,
}
impl From<AuthStyleArg> for IssuerAuthStyle {
	fn from(value: AuthStyleArg) -> Self {
		match value {
			AuthStyleArg::Basic => Self::Basic,
			AuthStyleArg::RequestBody => Self::RequestBody,
		}
	}
}

/// Relay flags: backend target, auth toggle, scope, and issuer.
#[derive(Clone, Debug, Args)]
pub struct RelayArgs {
	/// Backend endpoint requests are forwarded to.
	#[arg(long, env = "BACKEND_URL")]
	pub backend_url: Url,
	/// Attach a bearer token to backend calls.
	#[arg(long, env = "BACKEND_USE_AUTH", default_value_t = false, action = clap::ArgAction::Set)]
	pub use_auth: bool,
	/// Whitespace-delimited scopes requested from the issuer.
	#[arg(long, env = "BACKEND_AUTH_SCOPE", default_value = "")]
	pub scope: String,
	#[command(flatten)]
	#[allow(missing_docs)]
	pub issuer: IssuerArgs,
}
impl RelayArgs {
	/// Converts parsed flags into a [`RelayConfig`] listening on `bind`.
	pub fn to_config(&self, bind: SocketAddr) -> RelayConfig {
		RelayConfig {
			backend_url: self.backend_url.clone(),
			use_auth: self.use_auth,
			scope: self.scope.clone(),
			bind,
			issuer: self.issuer.to_config(),
		}
	}
}
