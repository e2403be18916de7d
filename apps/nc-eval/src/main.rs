use clap::Parser;

use nc_eval::Args;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	nc_eval::run(args)
}
