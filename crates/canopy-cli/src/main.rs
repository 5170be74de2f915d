use anyhow::{Context, Result};
use canopy_cli::{check, logging, render, CliConfig, Cli, Commands};
use clap::Parser as ClapParser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment variables
    let mut config = CliConfig::load();
    if cli.log_json {
        config.log_json = true;
    }

    logging::init_logging(&config).context("Failed to initialize logging")?;

    let output = match &cli.command {
        Commands::Render(args) => render(args, &config)
            .await
            .with_context(|| format!("Failed to render {}", args.file.display()))?,
        Commands::Check { file } => check(file)
            .await
            .with_context(|| format!("Failed to check {}", file.display()))?,
    };

    println!("{}", output);
    Ok(())
}
