//! Diagnostic: acquires one token, prints it, and makes a single authenticated backend call.

// std
use std::net::SocketAddr;
// crates.io
use clap::Parser;
use color_eyre::eyre::{WrapErr, eyre};
// self
use bearer_relay::{
	cli::{LogArgs, RelayArgs},
	requester::AuthenticatedRequester,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
	#[command(flatten)]
	relay: RelayArgs,
	#[command(flatten)]
	log: LogArgs,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let cli = Cli::parse();

	cli.log.init();

	let mut config = cli.relay.to_config(SocketAddr::from(([127, 0, 0, 1], 0)));

	config.use_auth = true;

	let requester =
		AuthenticatedRequester::from_config(&config).wrap_err("Failed to configure the relay.")?;
	let cache = requester.token_cache().ok_or_else(|| eyre!("Token cache is not configured."))?;
	let token = cache.get_valid_token().await.wrap_err("Failed to acquire a token.")?;

	println!("Scope: {}", cache.scopes());
	println!("Token: {}", token.expose());

	let body = requester.fetch().await.wrap_err("Backend call failed.")?;

	println!("Backend response: {body}");

	Ok(())
}
