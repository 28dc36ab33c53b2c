//! Redirect sink: turns every write into an observer notification

use serde::Serialize;
use std::io;

use crate::codec::{Codec, Format};
use crate::error::{RelayError, Result};
use crate::event::{Channel, RedirectEvent};
use crate::observer::{Observer, Registration, SinkId, Subscription};

/// Stdout-compatible writer that fans each write out to its observers
///
/// Every write call builds exactly one [`RedirectEvent`], hands it to the
/// observers subscribed to that channel in registration order, and returns
/// it once dispatch is done. Observers added later never see earlier writes.
pub struct RedirectSink<C: Codec = Format> {
    id: SinkId,
    codec: C,
    observers: Vec<Registration>,
    disposed: bool,
}

impl RedirectSink<Format> {
    /// Create a JSON sink with its first observer, subscribed to both channels
    pub fn new<O: Observer + 'static>(initial_observer: O) -> Self {
        Self::with_codec(Format::Json, initial_observer)
    }
}

impl<C: Codec> RedirectSink<C> {
    pub fn with_codec<O: Observer + 'static>(codec: C, initial_observer: O) -> Self {
        let mut sink = Self {
            id: SinkId::next(),
            codec,
            observers: Vec::new(),
            disposed: false,
        };
        sink.add_observer(initial_observer);
        sink
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Register an observer on both channels
    pub fn add_observer<O: Observer + 'static>(&mut self, observer: O) {
        self.register(Subscription::All, Box::new(observer));
    }

    /// Register an observer on a single channel
    pub fn add_channel_observer<O: Observer + 'static>(&mut self, channel: Channel, observer: O) {
        self.register(Subscription::Only(channel), Box::new(observer));
    }

    fn register(&mut self, subscription: Subscription, observer: Box<dyn Observer>) {
        if self.disposed {
            return;
        }
        self.observers.push(Registration { subscription, observer });
    }

    pub fn write_text(&mut self, text: impl Into<String>) -> Result<RedirectEvent> {
        self.dispatch(Channel::Write, text.into())
    }

    pub fn write_line(&mut self, text: impl Into<String>) -> Result<RedirectEvent> {
        self.dispatch(Channel::WriteLine, text.into())
    }

    /// Encode `value` with the sink's codec and write it as text
    pub fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<RedirectEvent> {
        let text = self.codec.encode(value)?;
        self.write_text(text)
    }

    /// Encode `value` with the sink's codec and write it as a line
    pub fn write_value_line<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<RedirectEvent> {
        let text = self.codec.encode(value)?;
        self.write_line(text)
    }

    fn dispatch(&mut self, channel: Channel, text: String) -> Result<RedirectEvent> {
        let source = self.id;
        let mut event = RedirectEvent::new(channel, text);

        if !event.is_consumed() {
            for registration in self.observers.iter_mut() {
                if !registration.subscription.covers(channel) {
                    continue;
                }
                registration
                    .observer
                    .notify(source, &mut event)
                    .map_err(|source| RelayError::Observer { channel, source })?;
            }
            event.mark_consumed();
        }

        Ok(event)
    }

    /// Release every observer; later calls are no-ops
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.observers.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Each `write` call is one [`Channel::Write`] event
impl<C: Codec> io::Write for RedirectSink<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf).into_owned();
        self.write_text(text).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
