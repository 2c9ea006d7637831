//! Demo backend: answers `GET /` with a UTC greeting.

// std
use std::{net::SocketAddr, sync::Arc};
// crates.io
use clap::Parser;
// self
use bearer_relay::{cli::LogArgs, clock::SystemClock, service};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// Address to listen on.
	#[arg(long, env = "BIND", default_value = "127.0.0.1:8081")]
	bind: SocketAddr,
	#[command(flatten)]
	log: LogArgs,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let cli = Cli::parse();

	cli.log.init();
	service::serve(service::backend_router(Arc::new(SystemClock)), cli.bind).await?;

	Ok(())
}
