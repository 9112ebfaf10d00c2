use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = procedio_api::Args::parse();

	procedio_api::run(args).await
}
