use anyhow::Result;
use clap::Parser;
use multiproc::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
