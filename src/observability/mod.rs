//! Stock observers
//!
//! - Console - prints events as they arrive
//! - Recorder - appends events to a JSONL file for later replay

pub mod console;
pub mod recorder;

pub use console::ConsoleObserver;
pub use recorder::{EventRecord, Recorder, read_records};
