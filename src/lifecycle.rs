//! Tie a sink's disposal to an external container's lifecycle
//!
//! The traits here describe the small slice of a UI framework the binding
//! needs: something that can be subscribed to, a top-level container with a
//! closing signal, and a runtime with a shutdown-started signal. Each wired
//! signal calls [`OutputHandle::dispose`], which is idempotent, so firing
//! several of them is harmless.

use parking_lot::Mutex;

use crate::stdout::OutputHandle;

pub type Callback = Box<dyn FnMut() + Send>;

/// A signal callbacks can be attached to
pub trait LifecycleSignal {
    fn subscribe(&self, callback: Callback);
}

/// Top-level container, e.g. a window
pub trait TopLevel {
    fn closing(&self) -> &dyn LifecycleSignal;
}

/// Runtime that owns the element tree, e.g. a UI dispatcher
pub trait Runtime {
    fn shutdown_started(&self) -> &dyn LifecycleSignal;
}

/// Runtime category of an element
pub enum ElementKind<'a> {
    TopLevel(&'a dyn TopLevel),
    /// Nested interactive control
    Control,
    Other,
}

pub trait UiElement {
    fn kind(&self) -> ElementKind<'_>;

    /// Top-level container enclosing this element, if it is attached to one
    fn enclosing_top_level(&self) -> Option<&dyn TopLevel>;

    fn runtime(&self) -> &dyn Runtime;
}

/// Which signals a binding subscribed to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleBinding {
    pub closing: bool,
    pub shutdown: bool,
}

/// Dispose `handle` when `element`'s container closes or its runtime shuts down
pub fn bind_to_lifecycle(handle: &OutputHandle, element: &dyn UiElement) -> LifecycleBinding {
    let mut binding = LifecycleBinding::default();

    let top_level = match element.kind() {
        ElementKind::TopLevel(top_level) => Some(top_level),
        ElementKind::Control => element.enclosing_top_level(),
        ElementKind::Other => None,
    };

    if let Some(top_level) = top_level {
        top_level.closing().subscribe(dispose_callback(handle));
        binding.closing = true;
    }

    element.runtime().shutdown_started().subscribe(dispose_callback(handle));
    binding.shutdown = true;

    log::debug!(
        "Bound {} to lifecycle (closing: {}, shutdown: {})",
        handle.id(),
        binding.closing,
        binding.shutdown
    );
    binding
}

fn dispose_callback(handle: &OutputHandle) -> Callback {
    let handle = handle.clone();
    Box::new(move || handle.dispose())
}

/// In-process signal: callbacks run in subscription order on every `fire`
#[derive(Default)]
pub struct Signal {
    callbacks: Mutex<Vec<Callback>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        // Callbacks may subscribe more callbacks; run on a detached list
        let mut callbacks = std::mem::take(&mut *self.callbacks.lock());
        for callback in callbacks.iter_mut() {
            callback();
        }
        let mut slot = self.callbacks.lock();
        callbacks.append(&mut slot);
        *slot = callbacks;
    }

    pub fn subscriber_count(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl LifecycleSignal for Signal {
    fn subscribe(&self, callback: Callback) {
        self.callbacks.lock().push(callback);
    }
}
