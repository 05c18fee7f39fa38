pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::eyre;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = mesh_cli::VERSION,
	rename_all = "kebab",
	styles = mesh_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = mesh_config::load(&args.config)?;

	init_tracing(&config)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let ops_addr: SocketAddr = config.service.ops_bind.parse()?;

	// The ops surface exposes validation telemetry and carries no
	// authentication, so it never leaves the host.
	if !ops_addr.ip().is_loopback() {
		return Err(eyre::eyre!("ops_bind must be a loopback address."));
	}

	let state = AppState::new(config);
	let app = routes::router(state.clone());
	let ops_app = routes::ops_router(state);

	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	let http_server = axum::serve(http_listener, app);
	let ops_listener = TcpListener::bind(ops_addr).await?;

	tracing::info!(%ops_addr, "Ops server listening.");

	let ops_server = axum::serve(ops_listener, ops_app);

	tokio::try_join!(http_server, ops_server)?;

	Ok(())
}

fn init_tracing(config: &mesh_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
