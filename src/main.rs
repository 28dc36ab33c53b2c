use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};
use config::{Config, LogLevel};

fn log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("OUTRELAY_LOG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("outrelay")
        .join("logs")
}

fn setup_logging(log_level: LogLevel, verbose: bool) -> Result<()> {
    // Logs never go to stdout; stdout carries relayed output
    let log_dir = log_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("outrelay.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let level = if verbose && log_level.to_level_filter() < log::LevelFilter::Debug {
        LogLevel::Debug
    } else {
        log_level
    };

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(level.to_level_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            record,
            no_echo,
            chunks,
            timestamps,
            command,
        } => commands::run::run(
            commands::run::RunOptions {
                record,
                no_echo,
                chunks,
                timestamps,
                command,
                quiet: cli.quiet,
            },
            &config,
        ),
        Commands::Replay {
            path,
            filter,
            channel,
            decode,
        } => commands::replay::run(&path, filter.as_deref(), channel.map(Into::into), decode),
        Commands::Emit {
            text,
            line,
            value,
            format,
        } => commands::emit::run(text, line, value, format, &config),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level, cli.verbose).context("Failed to setup logging")?;

    info!("Starting outrelay with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
