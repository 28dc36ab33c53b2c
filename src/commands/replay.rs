//! Replay a recording
//!
//! Prints recorded writes in order. Text writes are emitted verbatim, line
//! writes get their recorded local time.

use colored::*;
use eyre::{Context, Result};
use regex::Regex;
use std::path::Path;

use outrelay::Channel;
use outrelay::observability::{EventRecord, read_records};

use crate::config::Config;

pub fn run(path: &Path, filter: Option<&str>, channel: Option<Channel>, decode: bool) -> Result<()> {
    let path = Config::expand_path(path);
    let records = read_records(&path)?;
    let pattern = filter.map(Regex::new).transpose().context("Invalid filter regex")?;

    log::info!("Replaying {} records from {}", records.len(), path.display());

    for record in select(&records, pattern.as_ref(), channel) {
        print_record(record, decode);
    }

    Ok(())
}

fn select<'a>(
    records: &'a [EventRecord],
    pattern: Option<&'a Regex>,
    channel: Option<Channel>,
) -> impl Iterator<Item = &'a EventRecord> {
    records.iter().filter(move |record| {
        if let Some(ch) = channel
            && record.channel != ch
        {
            return false;
        }
        pattern.is_none_or(|re| re.is_match(&record.text))
    })
}

fn render(record: &EventRecord, decode: bool) -> String {
    if decode
        && let Ok(value) = record.to_event().decode_as::<serde_json::Value>()
        && (value.is_object() || value.is_array())
        && let Ok(pretty) = serde_json::to_string_pretty(&value)
    {
        return pretty;
    }
    record.text.clone()
}

fn print_record(record: &EventRecord, decode: bool) {
    let text = render(record, decode);
    match record.channel {
        Channel::Write => print!("{}", text),
        Channel::WriteLine => println!("{} {}", record.local_time.dimmed(), text),
    }
}
