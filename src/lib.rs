//! Standard output interception and fan-out
//!
//! A [`RedirectSink`] stands in for stdout: each write becomes one
//! [`RedirectEvent`] delivered synchronously to every registered
//! [`Observer`]. Typed values go through an injected [`Codec`] on the way
//! in and can be decoded back from the event on the way out.
//!
//! ```no_run
//! use outrelay::{RedirectEvent, RedirectSink, observer_fn, relay_println, stdout};
//!
//! let sink = RedirectSink::new(observer_fn(|_, event: &mut RedirectEvent| {
//!     eprintln!("intercepted: {}", event.text());
//!     Ok(())
//! }));
//! let handle = stdout::install(sink);
//! relay_println!("hello {}", 42)?;
//! handle.dispose();
//! # Ok::<(), outrelay::RelayError>(())
//! ```

pub mod codec;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod observability;
pub mod observer;
pub mod sink;
pub mod stdout;

pub use codec::{Codec, Format, JsonCodec, YamlCodec};
pub use error::{ObserverError, RelayError, Result};
pub use event::{Channel, RedirectEvent};
pub use lifecycle::{LifecycleBinding, bind_to_lifecycle};
pub use observer::{Observer, SinkId, observer_fn};
pub use sink::RedirectSink;
pub use stdout::OutputHandle;
