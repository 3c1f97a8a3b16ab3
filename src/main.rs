//! Concrete strength pipeline - Main Entry Point

use clap::Parser;
use concrete_strength::cli::{cmd_experiments, cmd_predict, cmd_run, Cli, Commands};
use concrete_strength::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Run { config, root } => {
            cmd_run(&config, &root)?;
        }
        Commands::Experiments { config, root, limit } => {
            cmd_experiments(&config, &root, limit)?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
    }

    Ok(())
}
