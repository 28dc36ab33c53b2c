//! Console observer: echoes relayed writes to a terminal

use chrono::Local;
use colored::*;
use std::io::{self, Write};

use crate::error::ObserverError;
use crate::event::{Channel, RedirectEvent};
use crate::observer::{Observer, SinkId};

/// Prints every event to a writer (the real stdout by default)
///
/// Line events get an optional dimmed timestamp and source prefix; text
/// events are written verbatim so partial writes join up as they would on a
/// terminal.
pub struct ConsoleObserver {
    out: Box<dyn Write + Send>,
    timestamps: bool,
    show_source: bool,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            out: Box::new(out),
            timestamps: false,
            show_source: false,
        }
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn show_source(mut self, enabled: bool) -> Self {
        self.show_source = enabled;
        self
    }

    fn format_line(&self, source: SinkId, text: &str) -> String {
        let mut parts = Vec::new();
        if self.timestamps {
            parts.push(Local::now().format("%Y-%m-%d %H:%M:%S").to_string().dimmed().to_string());
        }
        if self.show_source {
            parts.push(format!("[{}]", source).cyan().to_string());
        }
        parts.push(text.to_string());
        parts.join(" ")
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ConsoleObserver {
    fn notify(&mut self, source: SinkId, event: &mut RedirectEvent) -> Result<(), ObserverError> {
        match event.channel() {
            Channel::Write => self.out.write_all(event.text().as_bytes())?,
            Channel::WriteLine => {
                let line = self.format_line(source, event.text());
                writeln!(self.out, "{}", line)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RedirectSink;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    #[test]
    fn test_lines_and_text() {
        let buf = SharedBuf::default();
        let mut sink = RedirectSink::new(ConsoleObserver::with_writer(buf.clone()));

        sink.write_text("a").unwrap();
        sink.write_text("b").unwrap();
        sink.write_line("").unwrap();
        sink.write_line("line").unwrap();

        assert_eq!(buf.contents(), "ab\nline\n");
    }

    #[test]
    fn test_source_prefix() {
        let buf = SharedBuf::default();
        let mut sink = RedirectSink::new(ConsoleObserver::with_writer(buf.clone()).show_source(true));

        sink.write_line("hello").unwrap();

        let out = buf.contents();
        assert!(out.contains(&sink.id().to_string()));
        assert!(out.trim_end().ends_with("hello"));
    }

    #[test]
    fn test_timestamps() {
        let buf = SharedBuf::default();
        let mut sink = RedirectSink::new(ConsoleObserver::with_writer(buf.clone()).timestamps(true));

        sink.write_line("tick").unwrap();

        let out = buf.contents();
        let year = Local::now().format("%Y").to_string();
        assert!(out.contains(&year));
        assert!(out.contains("tick"));
    }
}
