use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "outrelay Configuration".bold());
            println!();

            println!("log_level: {}", config.log_level.as_filter());
            println!();

            println!("{}:", "relay".cyan());
            println!("  format: {}", config.relay.format);
            println!("  echo: {}", config.relay.echo);
            println!("  timestamps: {}", config.relay.timestamps);
            match config.relay.record {
                Some(ref path) => println!("  record: {}", path.display()),
                None => println!("  record: {}", "none".dimmed()),
            }
        }
    }

    Ok(())
}
