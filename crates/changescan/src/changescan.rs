mod cli;
mod output;
mod run;

use clap::Parser;
use env_logger::Env;

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    run::run(&cli)
}
