use anyhow::{Context, Result};
use netsim_cli::{cli, config::Config, setup_logging};

fn main() -> Result<()> {
    let args = cli::parse_args();

    // The config file may enable debug logging, so it is resolved first
    let config = Config::from_args(&args).context("Invalid console configuration")?;
    setup_logging(config.debug)?;

    cli::execute_command(&config, &args.command)
}
