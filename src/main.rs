use anyhow::{Context, Result};
use clap::Parser;
use intentc::cli::{self, Cli};

fn main() -> Result<()> {
    let args = Cli::parse();
    let exit_code = cli::run(args).context("intentc run failed")?;
    std::process::exit(exit_code);
}
