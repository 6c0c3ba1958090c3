pub mod render;
pub mod server;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use ctxg_service::TraceStore;

#[derive(Debug, Parser)]
#[command(
	version = ctxg_cli::VERSION,
	rename_all = "kebab",
	styles = ctxg_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> Result<()> {
	let config = ctxg_config::load(&args.config)?;

	init_tracing(&config);

	let backend = ctxg_storage::backend(&config.storage)?;
	let bind_addr = config.service.mcp_bind.clone();

	tracing::info!(backend = ?config.storage.backend, "Trace store ready.");

	let store = Arc::new(TraceStore::new(config, backend));

	server::serve_mcp(&bind_addr, store).await
}

fn init_tracing(config: &ctxg_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
