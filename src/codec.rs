//! Interchange codecs for typed writes
//!
//! A sink is parametric over a [`Codec`]: values passed to `write_value` are
//! encoded to text before dispatch, and observers decode them back with
//! [`RedirectEvent::decode_with`](crate::RedirectEvent::decode_with).
//!
//! Decoding a null document yields `T::default()` instead of an error.

use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::type_name;
use std::borrow::Cow;
use std::fmt;

use crate::error::{RelayError, Result};

/// Encode/decode capability for an interchange format
pub trait Codec {
    /// Short format name used in error messages
    fn name(&self) -> &'static str;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String>;

    fn decode<T: DeserializeOwned + Default>(&self, text: &str) -> Result<T>;

    /// Undo transport-level escaping applied on top of an encoded document
    fn unescape<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

/// JSON via serde_json
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

fn json_category(err: &serde_json::Error) -> String {
    format!("{:?}", err.classify())
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| RelayError::Encode {
            format: self.name(),
            category: json_category(&e),
            message: e.to_string(),
        })
    }

    fn decode<T: DeserializeOwned + Default>(&self, text: &str) -> Result<T> {
        if text.trim() == "null" {
            return Ok(T::default());
        }

        serde_json::from_str(text).map_err(|e| RelayError::Decode {
            target: type_name::<T>(),
            category: json_category(&e),
            message: e.to_string(),
        })
    }

    /// A payload that is itself a JSON string literal is unwrapped once;
    /// otherwise backslash escapes such as `\"` and `\uXXXX` are resolved.
    fn unescape<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let trimmed = text.trim();
        if trimmed.len() >= 2
            && trimmed.starts_with('"')
            && trimmed.ends_with('"')
            && let Ok(inner) = serde_json::from_str::<String>(trimmed)
        {
            return Cow::Owned(inner);
        }
        match unescape_backslashes(text) {
            Some(unescaped) => Cow::Owned(unescaped),
            None => Cow::Borrowed(text),
        }
    }
}

/// Resolve backslash escape sequences; `None` when there are none or one is malformed
fn unescape_backslashes(text: &str) -> Option<String> {
    if !text.contains('\\') {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return None;
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            // \" \\ \/ and anything else stand for themselves
            other => out.push(other),
        }
    }
    Some(out)
}

/// YAML via serde_yaml
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    /// The document terminator newline is dropped; line writes add their own
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let mut text = serde_yaml::to_string(value).map_err(|e| RelayError::Encode {
            format: self.name(),
            category: "Yaml".to_string(),
            message: e.to_string(),
        })?;
        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }

    fn decode<T: DeserializeOwned + Default>(&self, text: &str) -> Result<T> {
        let wrap = |e: serde_yaml::Error| RelayError::Decode {
            target: type_name::<T>(),
            category: "Yaml".to_string(),
            message: e.to_string(),
        };

        let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(wrap)?;
        if value.is_null() {
            return Ok(T::default());
        }
        serde_yaml::from_value(value).map_err(wrap)
    }
}

/// Runtime-selectable codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Codec for Format {
    fn name(&self) -> &'static str {
        match self {
            Format::Json => JsonCodec.name(),
            Format::Yaml => YamlCodec.name(),
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        match self {
            Format::Json => JsonCodec.encode(value),
            Format::Yaml => YamlCodec.encode(value),
        }
    }

    fn decode<T: DeserializeOwned + Default>(&self, text: &str) -> Result<T> {
        match self {
            Format::Json => JsonCodec.decode(text),
            Format::Yaml => YamlCodec.decode(text),
        }
    }

    fn unescape<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            Format::Json => JsonCodec.unescape(text),
            Format::Yaml => YamlCodec.unescape(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
    struct Sample {
        id: u32,
        name: String,
        tags: Vec<String>,
    }

    fn sample() -> Sample {
        Sample {
            id: 42,
            name: "relay".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let text = JsonCodec.encode(&sample()).unwrap();
        assert_eq!(text, r#"{"id":42,"name":"relay","tags":["a","b"]}"#);
        let back: Sample = JsonCodec.decode(&text).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let text = YamlCodec.encode(&sample()).unwrap();
        assert!(text.starts_with("id: 42\n"));
        assert!(!text.ends_with('\n'));
        let back: Sample = YamlCodec.decode(&text).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_json_null_yields_default() {
        let encoded = JsonCodec.encode(&Option::<Sample>::None).unwrap();
        assert_eq!(encoded, "null");
        let back: Sample = JsonCodec.decode(&encoded).unwrap();
        assert_eq!(back, Sample::default());
    }

    #[test]
    fn test_yaml_null_forms_yield_default() {
        for text in ["null", "~", ""] {
            let back: Sample = YamlCodec.decode(text).unwrap();
            assert_eq!(back, Sample::default(), "input {text:?}");
        }
    }

    #[test]
    fn test_json_encode_failure() {
        // serde_json only accepts string-like map keys
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1);
        let err = JsonCodec.encode(&map).unwrap_err();

        assert!(matches!(err, RelayError::Encode { format: "json", .. }));
    }

    #[test]
    fn test_json_decode_failure_category() {
        let err = JsonCodec.decode::<Sample>("{oops}").unwrap_err();
        assert_eq!(err.category(), Some("Syntax"));
    }

    #[test]
    fn test_yaml_decode_failure() {
        let err = YamlCodec.decode::<Sample>("id: [unterminated").unwrap_err();
        assert_eq!(err.category(), Some("Yaml"));
        assert!(err.to_string().contains("Sample"));
    }

    #[test]
    fn test_json_unescape() {
        assert_eq!(JsonCodec.unescape(r#""a\"b""#), Cow::<str>::Owned("a\"b".to_string()));
        assert!(matches!(JsonCodec.unescape(r#"{"a":1}"#), Cow::Borrowed(_)));
        assert!(matches!(JsonCodec.unescape("\""), Cow::Borrowed(_)));
    }

    #[test]
    fn test_json_unescape_backslash_sequences() {
        assert_eq!(JsonCodec.unescape(r#"{\"id\":1}"#), r#"{"id":1}"#);
        assert_eq!(JsonCodec.unescape(r#"a\\b\tc\u00e9\n"#), "a\\b\tc\u{e9}\n");
        // Malformed escapes leave the text untouched
        assert!(matches!(JsonCodec.unescape(r#"bad\u12"#), Cow::Borrowed(_)));
        assert!(matches!(JsonCodec.unescape("trailing\\"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_format_delegates() {
        assert_eq!(Format::default(), Format::Json);
        assert_eq!(Format::Yaml.to_string(), "yaml");
        let text = Format::Json.encode(&sample()).unwrap();
        let back: Sample = Format::Json.decode(&text).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let format: Format = serde_yaml::from_str("yaml").unwrap();
        assert_eq!(format, Format::Yaml);
    }
}
