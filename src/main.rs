use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use panopticon::{config::Config, engine::Engine};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run,

    Check,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let cfg = Config::from_file(&args.config).context("failed to construct cfg")?;
    log::info!("{cfg:#?}");

    match args.command {
        Command::Run => {
            let engine = Engine::new(cfg).context("failed to construct engine")?;
            let output = engine.run_to_end().context("failed to run simulation")?;
            let summary = &output.summary;
            log::info!("seed: {}", output.seed);
            log::info!("steps: {}", output.history.len());
            log::info!("nash distance start: {:.3}", summary.start);
            log::info!("nash distance end: {:.3}", summary.end);
            log::info!("nash distance mean: {:.3}", summary.mean);
            log::info!("nash distance range: [{:.3}, {:.3}]", summary.min, summary.max);
            log::info!("nash distance std dev: {:.3}", summary.std_dev);
            log::info!("trend: {:?}", summary.trend);
            log::info!(
                "stable: {} (trailing variance {:.5})",
                summary.is_stable,
                summary.trailing_variance
            );
        }
        Command::Check => log::info!("config is valid"),
    }

    Ok(())
}
