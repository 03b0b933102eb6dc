use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lexa_api::Args::parse();

	lexa_api::run(args).await
}
