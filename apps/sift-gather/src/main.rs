use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = sift_gather::Args::parse();

	sift_gather::run(args).await
}
