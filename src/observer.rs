//! Observer callbacks and registry entries

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ObserverError;
use crate::event::{Channel, RedirectEvent};

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of the sink that dispatched an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl SinkId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink-{}", self.0)
    }
}

/// Receives intercepted writes
///
/// Returning an error aborts the dispatch and hands the error back to
/// whoever issued the write.
pub trait Observer: Send {
    fn notify(&mut self, source: SinkId, event: &mut RedirectEvent) -> Result<(), ObserverError>;
}

impl Observer for Box<dyn Observer> {
    fn notify(&mut self, source: SinkId, event: &mut RedirectEvent) -> Result<(), ObserverError> {
        (**self).notify(source, event)
    }
}

/// Observer backed by a closure, see [`observer_fn`]
pub struct FnObserver<F>(F);

impl<F> Observer for FnObserver<F>
where
    F: FnMut(SinkId, &mut RedirectEvent) -> Result<(), ObserverError> + Send,
{
    fn notify(&mut self, source: SinkId, event: &mut RedirectEvent) -> Result<(), ObserverError> {
        (self.0)(source, event)
    }
}

/// Wrap a closure as an [`Observer`]
pub fn observer_fn<F>(f: F) -> FnObserver<F>
where
    F: FnMut(SinkId, &mut RedirectEvent) -> Result<(), ObserverError> + Send,
{
    FnObserver(f)
}

/// Which channels a registered observer listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    All,
    Only(Channel),
}

impl Subscription {
    pub fn covers(&self, channel: Channel) -> bool {
        match self {
            Subscription::All => true,
            Subscription::Only(only) => *only == channel,
        }
    }
}

pub(crate) struct Registration {
    pub(crate) subscription: Subscription,
    pub(crate) observer: Box<dyn Observer>,
}
