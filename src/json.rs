//! Loosely typed JSON for backend payloads without a fixed schema.
//!
//! Report-generation output (chart data, analyst/communicator/critique blobs,
//! readiness history) changes shape independently of this client, so it is kept
//! as a [`JsonValue`] tree instead of a typed struct.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A JSON document of arbitrary shape.
///
/// Objects are stored in a `BTreeMap`, so re-encoding emits keys in sorted
/// order rather than the order they arrived in. Numbers are held as `f64`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
  #[default]
  Null,
  Bool(bool),
  Number(f64),
  String(String),
  Array(Vec<JsonValue>),
  Object(BTreeMap<String, JsonValue>),
}

impl JsonValue {
  pub fn is_null(&self) -> bool {
    matches!(self, JsonValue::Null)
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      JsonValue::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      JsonValue::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      JsonValue::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[JsonValue]> {
    match self {
      JsonValue::Array(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_object(&self) -> Option<&BTreeMap<String, JsonValue>> {
    match self {
      JsonValue::Object(map) => Some(map),
      _ => None,
    }
  }

  /// Look up a key if this value is an object.
  pub fn get(&self, key: &str) -> Option<&JsonValue> {
    self.as_object().and_then(|map| map.get(key))
  }

  pub fn get_mut(&mut self, key: &str) -> Option<&mut JsonValue> {
    match self {
      JsonValue::Object(map) => map.get_mut(key),
      _ => None,
    }
  }

  /// Set `key` on an object, replacing any previous value. Returns false and
  /// leaves the value alone if it is not an object.
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> bool {
    match self {
      JsonValue::Object(map) => {
        map.insert(key.into(), value.into());
        true
      }
      _ => false,
    }
  }
}

impl From<serde_json::Value> for JsonValue {
  fn from(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::Null => JsonValue::Null,
      serde_json::Value::Bool(b) => JsonValue::Bool(b),
      // Every serde_json number is representable as f64 (possibly lossy for huge ints)
      serde_json::Value::Number(n) => n.as_f64().map(JsonValue::Number).unwrap_or(JsonValue::Null),
      serde_json::Value::String(s) => JsonValue::String(s),
      serde_json::Value::Array(items) => {
        JsonValue::Array(items.into_iter().map(JsonValue::from).collect())
      }
      serde_json::Value::Object(map) => JsonValue::Object(
        map
          .into_iter()
          .map(|(k, v)| (k, JsonValue::from(v)))
          .collect(),
      ),
    }
  }
}

impl From<&str> for JsonValue {
  fn from(s: &str) -> Self {
    JsonValue::String(s.to_string())
  }
}

impl From<f64> for JsonValue {
  fn from(n: f64) -> Self {
    JsonValue::Number(n)
  }
}

impl From<bool> for JsonValue {
  fn from(b: bool) -> Self {
    JsonValue::Bool(b)
  }
}

// ============================================================================
// Encoding
// ============================================================================

impl Serialize for JsonValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      JsonValue::Null => serializer.serialize_unit(),
      JsonValue::Bool(b) => serializer.serialize_bool(*b),
      JsonValue::Number(n) => serializer.serialize_f64(*n),
      JsonValue::String(s) => serializer.serialize_str(s),
      JsonValue::Array(items) => {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
          seq.serialize_element(item)?;
        }
        seq.end()
      }
      JsonValue::Object(map) => {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (k, v) in map {
          out.serialize_entry(k, v)?;
        }
        out.end()
      }
    }
  }
}

// ============================================================================
// Decoding
// ============================================================================

// The visitor is driven by the token the parser actually saw, so a literal
// can only ever land in one variant: `true` is never a number, `1` is never
// a string, and `null` is always Null.
struct JsonValueVisitor;

impl<'de> Visitor<'de> for JsonValueVisitor {
  type Value = JsonValue;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("any JSON value")
  }

  fn visit_bool<E: de::Error>(self, v: bool) -> Result<JsonValue, E> {
    Ok(JsonValue::Bool(v))
  }

  fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonValue, E> {
    Ok(JsonValue::Number(v as f64))
  }

  fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonValue, E> {
    Ok(JsonValue::Number(v as f64))
  }

  fn visit_f64<E: de::Error>(self, v: f64) -> Result<JsonValue, E> {
    Ok(JsonValue::Number(v))
  }

  fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonValue, E> {
    Ok(JsonValue::String(v.to_string()))
  }

  fn visit_string<E: de::Error>(self, v: String) -> Result<JsonValue, E> {
    Ok(JsonValue::String(v))
  }

  fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<JsonValue, A::Error> {
    let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
    while let Some(item) = seq.next_element()? {
      items.push(item);
    }
    Ok(JsonValue::Array(items))
  }

  fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<JsonValue, A::Error> {
    let mut map = BTreeMap::new();
    while let Some((k, v)) = access.next_entry::<String, JsonValue>()? {
      map.insert(k, v);
    }
    Ok(JsonValue::Object(map))
  }

  fn visit_unit<E: de::Error>(self) -> Result<JsonValue, E> {
    Ok(JsonValue::Null)
  }

  fn visit_none<E: de::Error>(self) -> Result<JsonValue, E> {
    Ok(JsonValue::Null)
  }

  fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<JsonValue, D::Error> {
    Deserialize::deserialize(deserializer)
  }
}

impl<'de> Deserialize<'de> for JsonValue {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_any(JsonValueVisitor)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn obj(entries: Vec<(&str, JsonValue)>) -> JsonValue {
    JsonValue::Object(
      entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect(),
    )
  }

  #[test]
  fn test_decode_nested_mixed_array() {
    let value: JsonValue = serde_json::from_str(r#"{"a": [1, "x", null, {"b": true}]}"#).unwrap();

    let expected = obj(vec![(
      "a",
      JsonValue::Array(vec![
        JsonValue::Number(1.0),
        JsonValue::String("x".to_string()),
        JsonValue::Null,
        obj(vec![("b", JsonValue::Bool(true))]),
      ]),
    )]);
    assert_eq!(value, expected);

    let encoded = serde_json::to_string(&value).unwrap();
    let decoded: JsonValue = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, expected);
  }

  #[test]
  fn test_literals_map_to_one_variant() {
    let parse = |s: &str| serde_json::from_str::<JsonValue>(s).unwrap();

    assert_eq!(parse("true"), JsonValue::Bool(true));
    assert_eq!(parse("0"), JsonValue::Number(0.0));
    assert_eq!(parse("-2.5"), JsonValue::Number(-2.5));
    assert_eq!(parse(r#""true""#), JsonValue::String("true".to_string()));
    assert_eq!(parse(r#""1""#), JsonValue::String("1".to_string()));
    assert_eq!(parse("null"), JsonValue::Null);
    assert_eq!(parse("[]"), JsonValue::Array(vec![]));
    assert_eq!(parse("{}"), JsonValue::Object(BTreeMap::new()));
  }

  #[test]
  fn test_object_keys_reencode_sorted() {
    let value: JsonValue = serde_json::from_str(r#"{"z": 1, "a": 2}"#).unwrap();
    assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"a":2.0,"z":1.0}"#);
  }

  #[test]
  fn test_insert_and_get_mut() {
    let mut value = obj(vec![("score", JsonValue::from(80.0)), ("note", JsonValue::Null)]);
    assert!(value.get("note").is_some_and(JsonValue::is_null));

    assert!(value.insert("note", "rested"));
    assert!(value.insert("persist", true));
    if let Some(score) = value.get_mut("score") {
      *score = JsonValue::from(85.0);
    }

    assert_eq!(value.get("note").and_then(JsonValue::as_str), Some("rested"));
    assert_eq!(value.get("persist").and_then(JsonValue::as_bool), Some(true));
    assert_eq!(value.get("score").and_then(JsonValue::as_f64), Some(85.0));

    let mut not_object = JsonValue::from("text");
    assert!(!not_object.insert("k", 1.0));
    assert!(not_object.get_mut("k").is_none());
    assert_eq!(not_object, JsonValue::String("text".to_string()));
  }

  #[test]
  fn test_from_serde_json_value() {
    let value = JsonValue::from(serde_json::json!({
      "use_llm": false,
      "payload": { "user_id": "athlete_001", "history": [] }
    }));

    assert_eq!(value.get("use_llm").and_then(JsonValue::as_bool), Some(false));
    assert_eq!(
      value
        .get("payload")
        .and_then(|p| p.get("user_id"))
        .and_then(JsonValue::as_str),
      Some("athlete_001")
    );
    assert_eq!(
      value
        .get("payload")
        .and_then(|p| p.get("history"))
        .and_then(JsonValue::as_array)
        .map(|a| a.len()),
      Some(0)
    );
  }
}
