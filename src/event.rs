//! Intercepted write payload

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::codec::{Codec, JsonCodec};
use crate::error::Result;

/// Notification channel a write was issued on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Plain text write, no line terminator semantics
    Write,
    /// Line write
    WriteLine,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Write => "write",
            Channel::WriteLine => "write_line",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "write" => Some(Self::Write),
            "writeline" | "line" => Some(Self::WriteLine),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One intercepted write
///
/// Built fresh for every write call. `consumed` only ever moves from false
/// to true and means "this event has been dispatched", not "every observer
/// acknowledged it".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectEvent {
    text: String,
    channel: Channel,
    consumed: bool,
}

impl RedirectEvent {
    pub fn new(channel: Channel, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            channel,
            consumed: false,
        }
    }

    /// Text that would have gone to stdout
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    pub fn mark_consumed(&mut self) {
        self.consumed = true;
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Decode the text as JSON into `T`
    ///
    /// A JSON `null` payload yields `T::default()`.
    pub fn decode_as<T: DeserializeOwned + Default>(&self) -> Result<T> {
        self.decode_with(&JsonCodec)
    }

    /// Decode the text with `codec` into `T`
    ///
    /// Tries the raw text first, then the codec's unescaped form. When both
    /// fail the error from the raw text is returned.
    pub fn decode_with<T, C>(&self, codec: &C) -> Result<T>
    where
        T: DeserializeOwned + Default,
        C: Codec + ?Sized,
    {
        match codec.decode(&self.text) {
            Ok(value) => Ok(value),
            Err(err) => match codec.unescape(&self.text) {
                Cow::Owned(unescaped) => codec.decode(&unescaped).map_err(|_| err),
                Cow::Borrowed(_) => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::YamlCodec;
    use crate::error::RelayError;

    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_new_event_not_consumed() {
        let event = RedirectEvent::new(Channel::Write, "hello");
        assert_eq!(event.text(), "hello");
        assert_eq!(event.channel(), Channel::Write);
        assert!(!event.is_consumed());
    }

    #[test]
    fn test_mark_consumed() {
        let mut event = RedirectEvent::new(Channel::WriteLine, "x");
        event.mark_consumed();
        event.mark_consumed();
        assert!(event.is_consumed());
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!(Channel::from_str("write"), Some(Channel::Write));
        assert_eq!(Channel::from_str("write-line"), Some(Channel::WriteLine));
        assert_eq!(Channel::from_str("WRITE_LINE"), Some(Channel::WriteLine));
        assert_eq!(Channel::from_str("line"), Some(Channel::WriteLine));
        assert_eq!(Channel::from_str("stderr"), None);
    }

    #[test]
    fn test_channel_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Channel::WriteLine).unwrap(), "\"write_line\"");
        assert_eq!(Channel::WriteLine.to_string(), "write_line");
    }

    #[test]
    fn test_decode_as_object() {
        let event = RedirectEvent::new(Channel::WriteLine, r#"{"id":1}"#);
        let item: Item = event.decode_as().unwrap();
        assert_eq!(item, Item { id: 1 });
    }

    #[test]
    fn test_decode_as_null_yields_default() {
        let event = RedirectEvent::new(Channel::WriteLine, "null");
        let item: Item = event.decode_as().unwrap();
        assert_eq!(item, Item::default());
    }

    #[test]
    fn test_decode_as_double_encoded() {
        // A document that was itself encoded as a JSON string
        let event = RedirectEvent::new(Channel::Write, r#""{\"id\":7}""#);
        let item: Item = event.decode_as().unwrap();
        assert_eq!(item, Item { id: 7 });
    }

    #[test]
    fn test_decode_as_backslash_escaped() {
        let event = RedirectEvent::new(Channel::WriteLine, r#"{\"id\":1}"#);
        let item: Item = event.decode_as().unwrap();
        assert_eq!(item, Item { id: 1 });
    }

    #[test]
    fn test_decode_as_prefers_raw_text() {
        // Escaped quotes inside a valid document must not be unescaped first
        let event = RedirectEvent::new(Channel::WriteLine, r#"{"id":4,"note":"say \"hi\""}"#);
        let item: Item = event.decode_as().unwrap();
        assert_eq!(item, Item { id: 4 });
    }

    #[test]
    fn test_decode_as_string_payload_stays_string() {
        let event = RedirectEvent::new(Channel::Write, r#""plain""#);
        let s: String = event.decode_as().unwrap();
        assert_eq!(s, "plain");
    }

    #[test]
    fn test_decode_as_malformed_is_wrapped() {
        let event = RedirectEvent::new(Channel::Write, r#"{"id":"#);
        let err = event.decode_as::<Item>().unwrap_err();

        match &err {
            RelayError::Decode { category, .. } => assert_eq!(category, "Eof"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("Item"));
    }

    #[test]
    fn test_decode_as_wrong_shape_is_data_error() {
        let event = RedirectEvent::new(Channel::Write, r#"{"id":"one"}"#);
        let err = event.decode_as::<Item>().unwrap_err();
        assert_eq!(err.category(), Some("Data"));
    }

    #[test]
    fn test_decode_with_yaml() {
        let event = RedirectEvent::new(Channel::WriteLine, "id: 3\n");
        let item: Item = event.decode_with(&YamlCodec).unwrap();
        assert_eq!(item, Item { id: 3 });
    }
}
