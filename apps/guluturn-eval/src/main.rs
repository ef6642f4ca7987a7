use clap::Parser;

use guluturn_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	guluturn_eval::run(args).await
}
