use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use outrelay::Format;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

/// Channel filter for replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChannelArg {
    Write,
    WriteLine,
}

impl From<ChannelArg> for outrelay::Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Write => outrelay::Channel::Write,
            ChannelArg::WriteLine => outrelay::Channel::WriteLine,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "outrelay",
    about = "Intercept standard output and relay every write to observers",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/outrelay/logs/outrelay.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to outrelay.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command and relay its standard output
    Run {
        /// Append every relayed write to this JSONL file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Do not echo relayed output to the terminal
        #[arg(long)]
        no_echo: bool,

        /// Relay raw output chunks as text writes instead of lines
        #[arg(long)]
        chunks: bool,

        /// Prefix echoed lines with the local time
        #[arg(long)]
        timestamps: bool,

        /// Command and arguments
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Print a recording
    Replay {
        /// Recording to read
        path: PathBuf,

        /// Only show writes whose text matches this regex
        #[arg(long)]
        filter: Option<String>,

        /// Only show one channel
        #[arg(long, value_enum)]
        channel: Option<ChannelArg>,

        /// Pretty-print payloads that decode as JSON
        #[arg(long)]
        decode: bool,
    },

    /// Push one write through a sink
    Emit {
        /// Text to write
        text: String,

        /// Write as a line instead of plain text
        #[arg(long)]
        line: bool,

        /// Parse TEXT as JSON and write the encoded value
        #[arg(long)]
        value: bool,

        /// Codec used with --value
        #[arg(long, value_enum)]
        format: Option<Format>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_collects_trailing_command() {
        let cli = Cli::parse_from(["outrelay", "run", "--record", "out.jsonl", "--", "echo", "-n", "hi"]);
        match cli.command {
            Commands::Run { record, command, .. } => {
                assert_eq!(record, Some(PathBuf::from("out.jsonl")));
                assert_eq!(command, vec!["echo", "-n", "hi"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_has_no_codec_option() {
        let parsed = Cli::try_parse_from(["outrelay", "run", "--format", "yaml", "--", "true"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_replay_channel_filter() {
        let cli = Cli::parse_from(["outrelay", "replay", "run.jsonl", "--channel", "write-line"]);
        match cli.command {
            Commands::Replay { channel, .. } => {
                assert_eq!(channel.map(outrelay::Channel::from), Some(outrelay::Channel::WriteLine));
            }
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn test_output_format_explicit() {
        assert_eq!(OutputFormat::resolve(Some(OutputFormat::Yaml)), OutputFormat::Yaml);
    }
}
