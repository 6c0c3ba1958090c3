use clap::Parser;

use ctxg_mcp::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	ctxg_mcp::run(args).await
}
