//! Relay a child process's standard output
//!
//! The child's stdout is read on this thread and pushed through an installed
//! sink: one line event per output line, or one text event per raw chunk.
//! Disposal is bound to the session's shutdown signal, fired once the child
//! has exited.

use colored::*;
use eyre::{Context, Result, eyre};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use outrelay::lifecycle::{ElementKind, LifecycleSignal, Runtime, Signal, TopLevel, UiElement};
use outrelay::observability::{ConsoleObserver, Recorder};
use outrelay::{RedirectEvent, RedirectSink, bind_to_lifecycle, observer_fn, stdout};

use crate::config::Config;

const CHUNK_SIZE: usize = 8192;

pub struct RunOptions {
    pub record: Option<PathBuf>,
    pub no_echo: bool,
    pub chunks: bool,
    pub timestamps: bool,
    pub command: Vec<String>,
    pub quiet: bool,
}

/// Running relay session; owns the shutdown signal the sink is bound to
#[derive(Default)]
struct Session {
    shutdown: Signal,
}

impl Runtime for Session {
    fn shutdown_started(&self) -> &dyn LifecycleSignal {
        &self.shutdown
    }
}

impl UiElement for Session {
    fn kind(&self) -> ElementKind<'_> {
        ElementKind::Other
    }

    fn enclosing_top_level(&self) -> Option<&dyn TopLevel> {
        None
    }

    fn runtime(&self) -> &dyn Runtime {
        self
    }
}

#[derive(Default)]
struct Stats {
    writes: AtomicUsize,
    bytes: AtomicUsize,
}

pub fn run(opts: RunOptions, config: &Config) -> Result<()> {
    let (program, args) = opts.command.split_first().ok_or_else(|| eyre!("No command given"))?;
    let resolved = which::which(program).context(format!("Command not found: {}", program))?;

    let echo = !opts.no_echo && config.relay.echo;
    let timestamps = opts.timestamps || config.relay.timestamps;
    let record = opts
        .record
        .or_else(|| config.relay.record.clone())
        .map(|p| Config::expand_path(&p));

    let stats = Arc::new(Stats::default());
    let counter = Arc::clone(&stats);
    let mut sink = RedirectSink::new(observer_fn(move |_, event: &mut RedirectEvent| {
        counter.writes.fetch_add(1, Ordering::Relaxed);
        counter.bytes.fetch_add(event.text().len(), Ordering::Relaxed);
        Ok(())
    }));
    if echo {
        sink.add_observer(ConsoleObserver::new().timestamps(timestamps));
    }
    if let Some(ref path) = record {
        sink.add_observer(Recorder::open(path)?);
    }

    let handle = stdout::install(sink);
    let session = Session::default();
    bind_to_lifecycle(&handle, &session);

    log::info!("Relaying {} {:?} through {}", resolved.display(), args, handle.id());

    let mut child = Command::new(&resolved)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .context(format!("Failed to start {}", program))?;

    let child_stdout = child
        .stdout
        .take()
        .ok_or_else(|| eyre!("Child stdout was not captured"))?;

    let relayed = if opts.chunks {
        relay_chunks(child_stdout)
    } else {
        relay_lines(child_stdout)
    };
    if relayed.is_err() {
        let _ = child.kill();
    }

    let status = child.wait().context("Failed to wait for command")?;
    session.shutdown.fire();
    relayed?;

    let writes = stats.writes.load(Ordering::Relaxed);
    let bytes = stats.bytes.load(Ordering::Relaxed);
    log::info!("{} exited with {} after {} writes ({} bytes)", program, status, writes, bytes);

    if !opts.quiet {
        eprintln!(
            "{} Relayed {} writes ({} bytes) from {}",
            "✓".green(),
            writes,
            bytes,
            program.cyan()
        );
        if let Some(path) = record {
            eprintln!("  Recorded to {}", path.display().to_string().dimmed());
        }
    }

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }

    Ok(())
}

fn relay_lines(child_stdout: ChildStdout) -> Result<()> {
    let mut reader = BufReader::new(child_stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).context("Failed to read command output")?;
        if n == 0 {
            return Ok(());
        }
        stdout::println(strip_newline(&buf)).context("Failed to relay output line")?;
    }
}

fn relay_chunks(mut child_stdout: ChildStdout) -> Result<()> {
    let mut buf = [0u8; CHUNK_SIZE];
    // Bytes of a character split across reads
    let mut pending = Vec::new();

    loop {
        let n = child_stdout.read(&mut buf).context("Failed to read command output")?;
        if n == 0 {
            if !pending.is_empty() {
                stdout::print(String::from_utf8_lossy(&pending).into_owned())
                    .context("Failed to relay output chunk")?;
            }
            return Ok(());
        }
        pending.extend_from_slice(&buf[..n]);
        let text = take_complete_utf8(&mut pending);
        if !text.is_empty() {
            stdout::print(text).context("Failed to relay output chunk")?;
        }
    }
}

/// Drain the decodable prefix of `pending`, leaving an incomplete trailing
/// sequence in place. Invalid bytes become U+FFFD.
fn take_complete_utf8(pending: &mut Vec<u8>) -> String {
    let mut text = String::with_capacity(pending.len());
    let mut start = 0;

    while start < pending.len() {
        match std::str::from_utf8(&pending[start..]) {
            Ok(valid) => {
                text.push_str(valid);
                start = pending.len();
            }
            Err(e) => {
                let valid_end = start + e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&pending[start..valid_end]));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        start = valid_end + len;
                    }
                    None => {
                        start = valid_end;
                        break;
                    }
                }
            }
        }
    }

    pending.drain(..start);
    text
}

fn strip_newline(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
