use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = ctxg_api::Args::parse();

	ctxg_api::run(args).await
}
