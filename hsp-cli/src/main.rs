//! HSP CLI - Command line tool for building hydropower solver input.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "hsp-cli",
    version,
    about = "Hydropower solver input preparation toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: hsp_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    hsp_cmd::run(cli.command)
}
