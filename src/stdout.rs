//! Process-wide output installation
//!
//! Installing a sink does not touch the real stdout file descriptor. It
//! records the sink as the process's output target and hands back an
//! [`OutputHandle`]; code that writes through [`print`], [`println`] or the
//! `relay_print!`/`relay_println!` macros is routed to whichever sink is
//! installed, and falls through to the real stdout when none is.

use once_cell::sync::Lazy;
use parking_lot::{Mutex, ReentrantMutex};
use serde::Serialize;
use std::cell::RefCell;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::codec::{Codec, JsonCodec};
use crate::error::{RelayError, Result};
use crate::event::{Channel, RedirectEvent};
use crate::observer::{Observer, SinkId};
use crate::sink::RedirectSink;

static PROCESS_OUTPUT: Lazy<Mutex<Option<OutputHandle>>> = Lazy::new(|| Mutex::new(None));

/// Shared capability for a sink that may be the process's output target
///
/// Cloning is cheap; all clones refer to the same sink. Writes from several
/// threads are serialized for the length of one dispatch.
#[derive(Clone)]
pub struct OutputHandle {
    id: SinkId,
    shared: Arc<Shared>,
}

struct Shared {
    sink: ReentrantMutex<RefCell<RedirectSink>>,
    // Set when dispose is requested while the sink is mid-dispatch
    dispose_pending: AtomicBool,
}

impl OutputHandle {
    /// Wrap a sink without installing it
    pub fn new(sink: RedirectSink) -> Self {
        Self {
            id: sink.id(),
            shared: Arc::new(Shared {
                sink: ReentrantMutex::new(RefCell::new(sink)),
                dispose_pending: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    fn with_sink<R>(&self, f: impl FnOnce(&mut RedirectSink) -> R) -> Result<R> {
        let guard = self.shared.sink.lock();
        let mut sink = guard
            .try_borrow_mut()
            .map_err(|_| RelayError::Reentrant(self.id.get()))?;
        let out = f(&mut *sink);
        if self.shared.dispose_pending.load(Ordering::Acquire) && !sink.is_disposed() {
            sink.dispose();
            log::debug!("Disposed {} after dispatch", self.id);
        }
        Ok(out)
    }

    pub fn write_text(&self, text: impl Into<String>) -> Result<RedirectEvent> {
        self.with_sink(|sink| sink.write_text(text))?
    }

    pub fn write_line(&self, text: impl Into<String>) -> Result<RedirectEvent> {
        self.with_sink(|sink| sink.write_line(text))?
    }

    pub fn write_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<RedirectEvent> {
        self.with_sink(|sink| sink.write_value(value))?
    }

    pub fn write_value_line<T: Serialize + ?Sized>(&self, value: &T) -> Result<RedirectEvent> {
        self.with_sink(|sink| sink.write_value_line(value))?
    }

    pub fn add_observer<O: Observer + 'static>(&self, observer: O) -> Result<()> {
        self.with_sink(|sink| sink.add_observer(observer))
    }

    pub fn add_channel_observer<O: Observer + 'static>(&self, channel: Channel, observer: O) -> Result<()> {
        self.with_sink(|sink| sink.add_channel_observer(channel, observer))
    }

    /// Release the sink and stop routing process output to it
    ///
    /// Safe to call any number of times, from any clone, including from
    /// lifecycle callbacks fired while the sink is busy.
    pub fn dispose(&self) {
        {
            let mut slot = PROCESS_OUTPUT.lock();
            if slot.as_ref().is_some_and(|current| current.same_sink(self)) {
                *slot = None;
                log::debug!("Uninstalled {} on dispose", self.id);
            }
        }

        self.shared.dispose_pending.store(true, Ordering::Release);
        let guard = self.shared.sink.lock();
        match guard.try_borrow_mut() {
            Ok(mut sink) => {
                if !sink.is_disposed() {
                    sink.dispose();
                    log::debug!("Disposed {}", self.id);
                }
            }
            // Called from one of our own observers; finished when the dispatch returns
            Err(_) => log::debug!("Deferred dispose of busy {}", self.id),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.dispose_pending.load(Ordering::Acquire)
    }

    /// Whether this handle is the current process output target
    pub fn is_installed(&self) -> bool {
        PROCESS_OUTPUT
            .lock()
            .as_ref()
            .is_some_and(|current| current.same_sink(self))
    }

    fn same_sink(&self, other: &OutputHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

/// Make `sink` the process's output target until replaced or disposed
pub fn install(sink: RedirectSink) -> OutputHandle {
    let handle = OutputHandle::new(sink);
    install_handle(&handle);
    handle
}

/// Install an existing handle, replacing the current target
pub fn install_handle(handle: &OutputHandle) {
    let previous = PROCESS_OUTPUT.lock().replace(handle.clone());
    match previous {
        Some(previous) if !previous.same_sink(handle) => {
            log::debug!("Installed {} as process output, replacing {}", handle.id, previous.id)
        }
        _ => log::debug!("Installed {} as process output", handle.id),
    }
}

/// Currently installed handle, if any
pub fn installed() -> Option<OutputHandle> {
    PROCESS_OUTPUT.lock().clone()
}

/// Remove the installed handle without disposing it
pub fn uninstall() -> Option<OutputHandle> {
    let previous = PROCESS_OUTPUT.lock().take();
    if let Some(ref handle) = previous {
        log::debug!("Uninstalled {}", handle.id);
    }
    previous
}

fn route(channel: Channel, text: String) -> Result<()> {
    // Clone out of the slot so observers may install/uninstall while dispatching
    let current = installed();

    if let Some(handle) = current {
        let outcome = match channel {
            Channel::Write => handle.write_text(text.as_str()),
            Channel::WriteLine => handle.write_line(text.as_str()),
        };
        match outcome {
            Ok(_) => return Ok(()),
            Err(RelayError::Reentrant(_)) => {}
            Err(e) => return Err(e),
        }
    }

    passthrough(channel, &text).map_err(RelayError::Passthrough)
}

fn passthrough(channel: Channel, text: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    match channel {
        Channel::Write => out.write_all(text.as_bytes())?,
        Channel::WriteLine => writeln!(out, "{}", text)?,
    }
    out.flush()
}

/// Write text to the process output
pub fn print(text: impl Into<String>) -> Result<()> {
    route(Channel::Write, text.into())
}

/// Write a line to the process output
pub fn println(text: impl Into<String>) -> Result<()> {
    route(Channel::WriteLine, text.into())
}

/// JSON-encode `value` and write it as a line to the process output
pub fn write_object<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = JsonCodec.encode(value)?;
    println(json)
}

/// `print!` routed through the installed sink; evaluates to `outrelay::Result<()>`
#[macro_export]
macro_rules! relay_print {
    ($($arg:tt)*) => {
        $crate::stdout::print(::std::format!($($arg)*))
    };
}

/// `println!` routed through the installed sink; evaluates to `outrelay::Result<()>`
#[macro_export]
macro_rules! relay_println {
    () => {
        $crate::stdout::println(::std::string::String::new())
    };
    ($($arg:tt)*) => {
        $crate::stdout::println(::std::format!($($arg)*))
    };
}
