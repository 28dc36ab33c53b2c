use clap::CommandFactory;
use clap_complete::{Shell, generate};
use eyre::Result;
use std::io::{self, Write};

use crate::cli::Cli;

pub fn run(shell: Shell) -> Result<()> {
    write_completions(shell, &mut io::stdout().lock());
    Ok(())
}

/// Completion script for `shell`, named after the binary clap knows about
fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    log::debug!("Generating {} completions for {}", shell, bin_name);
    generate(shell, &mut cmd, bin_name, out);
}
