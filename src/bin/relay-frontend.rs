//! Front-line service: relays `GET /` to the backend, optionally with a bearer token.

// std
use std::net::SocketAddr;
// crates.io
use clap::Parser;
// self
use bearer_relay::{
	cli::{LogArgs, RelayArgs},
	requester::AuthenticatedRequester,
	service,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// Address to listen on.
	#[arg(long, env = "BIND", default_value = "127.0.0.1:8080")]
	bind: SocketAddr,
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

	let config = cli.relay.to_config(cli.bind);
	let requester = AuthenticatedRequester::from_config(&config)?;

	tracing::info!(backend_url = %config.backend_url, use_auth = config.use_auth, "relay configured");

	service::serve(service::front_router(requester), config.bind).await?;

	Ok(())
}
