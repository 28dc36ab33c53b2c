use eyre::{Context, Result};

use outrelay::observability::ConsoleObserver;
use outrelay::{Format, RedirectSink};

use crate::config::Config;

pub fn run(text: String, line: bool, value: bool, format: Option<Format>, config: &Config) -> Result<()> {
    let format = format.unwrap_or(config.relay.format);
    let mut sink = RedirectSink::with_codec(format, ConsoleObserver::new().timestamps(config.relay.timestamps));

    let written = if value {
        let parsed: serde_json::Value = serde_json::from_str(&text).context("TEXT is not valid JSON")?;
        if line {
            sink.write_value_line(&parsed)
        } else {
            sink.write_value(&parsed)
        }
    } else if line {
        sink.write_line(text)
    } else {
        sink.write_text(text)
    };
    let event = written.context("Failed to emit")?;

    log::debug!("Emitted {} event ({} bytes) via {}", event.channel(), event.text().len(), sink.id());
    sink.dispose();

    Ok(())
}
