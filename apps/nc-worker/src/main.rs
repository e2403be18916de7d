use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = nc_worker::Args::parse();

	nc_worker::run(args).await
}
