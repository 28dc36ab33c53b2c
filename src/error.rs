//! Error types for the relay core
//!
//! Every failure the core can produce is returned to the caller that issued
//! the write. Codec errors are flattened into category + message so the
//! serializer's own error type never leaks through the public API.

use thiserror::Error;

use crate::event::Channel;

/// Error type observers return to abort a dispatch
pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// A value could not be converted to interchange text.
    #[error("Failed to encode value as {format}: {category}: {message}")]
    Encode {
        /// Codec name (`json`, `yaml`)
        format: &'static str,
        /// Category of the underlying serializer error
        category: String,
        message: String,
    },

    /// Event text could not be decoded into the requested type.
    #[error("Failed to decode payload into {target}: {category}: {message}")]
    Decode {
        /// Requested type name
        target: &'static str,
        /// Category of the underlying deserializer error
        category: String,
        message: String,
    },

    /// An observer failed; the remaining observers were not invoked.
    #[error("Observer failed on {channel} event: {source}")]
    Observer {
        channel: Channel,
        #[source]
        source: ObserverError,
    },

    /// Fallback write to the real stdout failed.
    #[error("Failed to write to stdout: {0}")]
    Passthrough(#[source] std::io::Error),

    /// A shared sink was used from inside one of its own observers.
    #[error("Sink {0} is already dispatching on this thread")]
    Reentrant(u64),
}

impl RelayError {
    /// Category of the underlying codec error, if this is a codec failure
    pub fn category(&self) -> Option<&str> {
        match self {
            RelayError::Encode { category, .. } | RelayError::Decode { category, .. } => Some(category),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_carries_category() {
        let err = RelayError::Decode {
            target: "u32",
            category: "Syntax".to_string(),
            message: "expected value at line 1 column 1".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("u32"));
        assert!(msg.contains("Syntax"));
        assert!(msg.contains("expected value"));
        assert_eq!(err.category(), Some("Syntax"));
    }

    #[test]
    fn test_observer_error_keeps_source() {
        use std::error::Error as _;

        let err = RelayError::Observer {
            channel: Channel::WriteLine,
            source: "boom".into(),
        };

        assert!(err.to_string().contains("write_line"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
        assert!(err.category().is_none());
    }
}
