use clap::Parser;

use sift_query::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	sift_query::run(args).await
}
