//! Keys of the normalized maps.
//!
//! Entities are opaque JSON, so the value found under the configured `id` /
//! `byKey` / `parent` field is converted into a [`Key`] by a [`KeyCodec`]
//! before it is used to index a map, and converted back when it has to be
//! written into a URL or a prop.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Key of an entity inside `list`, or of a selection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    /// The JSON form of this key.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Int(i) => Value::from(*i),
            Key::Str(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

/// Key of a bucket in a parent-nested resource. `ParentKey::null()` is the
/// bucket of entities without a parent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ParentKey(pub Option<Key>);

impl ParentKey {
    pub fn null() -> Self {
        ParentKey(None)
    }

    pub fn key(&self) -> Option<&Key> {
        self.0.as_ref()
    }

    pub fn to_value(&self) -> Value {
        self.0.as_ref().map_or(Value::Null, Key::to_value)
    }
}

impl From<Key> for ParentKey {
    fn from(k: Key) -> Self {
        ParentKey(Some(k))
    }
}

impl From<i64> for ParentKey {
    fn from(i: i64) -> Self {
        ParentKey(Some(Key::Int(i)))
    }
}

impl From<&str> for ParentKey {
    fn from(s: &str) -> Self {
        ParentKey(Some(Key::from(s)))
    }
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(k) => k.fmt(f),
            None => f.write_str("null"),
        }
    }
}

// Map keys in JSON must be strings, so the null bucket serializes as "null".
impl Serialize for ParentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Some(k) => k.serialize(serializer),
            None => serializer.serialize_str("null"),
        }
    }
}

/// How raw JSON values become keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyCodec {
    /// Numbers stay numbers, strings stay strings.
    #[default]
    Verbatim,
    /// Numeric strings are parsed into integers, so `"7"` and `7` address the same entity.
    ParseInt,
}

impl KeyCodec {
    pub fn from_flag(parse_to_int: bool) -> Self {
        if parse_to_int {
            KeyCodec::ParseInt
        } else {
            KeyCodec::Verbatim
        }
    }

    /// Encode a scalar value. `null`, arrays and objects have no key.
    pub fn encode(self, value: &Value) -> Option<Key> {
        match value {
            Value::Number(n) => Some(n.as_i64().map_or_else(|| Key::Str(n.to_string()), Key::Int)),
            Value::String(s) => match self {
                KeyCodec::ParseInt => Some(s.trim().parse().map_or_else(|_| Key::Str(s.clone()), Key::Int)),
                KeyCodec::Verbatim => Some(Key::Str(s.clone())),
            },
            Value::Bool(b) => Some(Key::Str(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Encode a parent value, where `null` is a valid bucket.
    pub fn encode_parent(self, value: &Value) -> Option<ParentKey> {
        match value {
            Value::Null => Some(ParentKey::null()),
            other => self.encode(other).map(|k| ParentKey(Some(k))),
        }
    }

    /// Decode a key back into the JSON that would be written into an entity or URL.
    pub fn decode(self, key: &Key) -> Value {
        key.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_int_codec_unifies_numeric_strings() {
        assert_eq!(KeyCodec::ParseInt.encode(&json!("7")), Some(Key::Int(7)));
        assert_eq!(KeyCodec::ParseInt.encode(&json!(7)), Some(Key::Int(7)));
        assert_eq!(KeyCodec::ParseInt.encode(&json!("abc")), Some(Key::Str("abc".into())));
        assert_eq!(KeyCodec::Verbatim.encode(&json!("7")), Some(Key::Str("7".into())));
        assert_eq!(KeyCodec::Verbatim.encode(&json!(null)), None);
    }

    #[test]
    fn test_parent_key_null_bucket() {
        assert_eq!(KeyCodec::Verbatim.encode_parent(&json!(null)), Some(ParentKey::null()));
        assert_eq!(KeyCodec::Verbatim.encode_parent(&json!("A")), Some(ParentKey::from("A")));
        assert_eq!(ParentKey::null().to_string(), "null");
        assert_eq!(serde_json::to_value(ParentKey::null()).unwrap(), json!("null"));
    }
}
