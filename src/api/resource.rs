//! Resource kinds and the trait tying each model to its endpoint and cache key.

use reqwest::Method;
use serde::de::{DeserializeOwned, Error as _};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::mock;
use super::types::{Baseline, Consumption, PhysioAge, Readiness, WeeklyReport};

/// The five independently fetched and cached resources.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  Readiness,
  Consumption,
  WeeklyReport,
  Baseline,
  PhysioAge,
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 5] = [
    ResourceKind::Readiness,
    ResourceKind::Consumption,
    ResourceKind::WeeklyReport,
    ResourceKind::Baseline,
    ResourceKind::PhysioAge,
  ];

  /// Stable key used for cache file names and log fields.
  pub fn key(self) -> &'static str {
    match self {
      Self::Readiness => "readiness",
      Self::Consumption => "consumption",
      Self::WeeklyReport => "weekly_report",
      Self::Baseline => "baseline",
      Self::PhysioAge => "physio_age",
    }
  }

  /// Resources that need a request body are POSTed; the rest are plain GETs.
  pub fn method(self) -> Method {
    match self {
      Self::Readiness | Self::Baseline => Method::GET,
      Self::Consumption | Self::WeeklyReport | Self::PhysioAge => Method::POST,
    }
  }

  /// Path segments appended to the base endpoint.
  pub fn path_segments(self, user_id: &str) -> Vec<&str> {
    match self {
      Self::Readiness => vec!["readiness", "from-healthkit"],
      Self::Consumption => vec!["readiness", "consumption"],
      Self::WeeklyReport => vec!["weekly-report", "run"],
      Self::Baseline => vec!["baseline", user_id],
      Self::PhysioAge => vec!["physio-age"],
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

impl FromStr for ResourceKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_lowercase().replace('-', "_");
    ResourceKind::ALL
      .into_iter()
      .find(|k| k.key() == normalized)
      .ok_or_else(|| format!("unknown resource kind: {}", s))
  }
}

/// A resource model that can be fetched, cached and defaulted.
pub trait Resource:
  Clone + fmt::Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
  const KIND: ResourceKind;

  /// Fixed sample served in mock mode and used when neither network nor cache has data.
  fn sample() -> Self;
}

impl Resource for Readiness {
  const KIND: ResourceKind = ResourceKind::Readiness;

  fn sample() -> Self {
    mock::readiness()
  }
}

impl Resource for Consumption {
  const KIND: ResourceKind = ResourceKind::Consumption;

  fn sample() -> Self {
    mock::consumption()
  }
}

impl Resource for WeeklyReport {
  const KIND: ResourceKind = ResourceKind::WeeklyReport;

  fn sample() -> Self {
    mock::weekly_report()
  }
}

impl Resource for Baseline {
  const KIND: ResourceKind = ResourceKind::Baseline;

  fn sample() -> Self {
    mock::baseline()
  }
}

impl Resource for PhysioAge {
  const KIND: ResourceKind = ResourceKind::PhysioAge;

  fn sample() -> Self {
    mock::physio_age()
  }
}

/// Decode a resource from raw JSON bytes.
///
/// Network responses and cache files both go through here, so a cache hit is
/// indistinguishable from a network hit. Only a top-level payload that is not
/// an object is rejected; field-level problems are absorbed by the models.
pub fn decode_resource<R: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<R> {
  let value: serde_json::Value = serde_json::from_slice(bytes)?;
  if !value.is_object() {
    return Err(serde_json::Error::custom(format!(
      "expected a JSON object, found {}",
      json_type_name(&value)
    )));
  }
  serde_json::from_value(value)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
  match value {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "a boolean",
    serde_json::Value::Number(_) => "a number",
    serde_json::Value::String(_) => "a string",
    serde_json::Value::Array(_) => "an array",
    serde_json::Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kind_from_str() {
    assert_eq!("weekly-report".parse::<ResourceKind>(), Ok(ResourceKind::WeeklyReport));
    assert_eq!("physio_age".parse::<ResourceKind>(), Ok(ResourceKind::PhysioAge));
    assert_eq!(" Baseline ".parse::<ResourceKind>(), Ok(ResourceKind::Baseline));
    assert!("sleep".parse::<ResourceKind>().is_err());
  }

  #[test]
  fn test_methods() {
    assert_eq!(ResourceKind::Readiness.method(), Method::GET);
    assert_eq!(ResourceKind::Baseline.method(), Method::GET);
    assert_eq!(ResourceKind::Consumption.method(), Method::POST);
    assert_eq!(ResourceKind::WeeklyReport.method(), Method::POST);
    assert_eq!(ResourceKind::PhysioAge.method(), Method::POST);
  }

  #[test]
  fn test_decode_rejects_non_object() {
    assert!(decode_resource::<Baseline>(b"[1, 2]").is_err());
    assert!(decode_resource::<Baseline>(b"\"baseline\"").is_err());
    assert!(decode_resource::<Baseline>(b"null").is_err());
    assert!(decode_resource::<Baseline>(b"{\"user_id\": ").is_err());
  }

  #[test]
  fn test_decode_empty_object_is_all_absent() {
    let baseline: Baseline = decode_resource(b"{}").unwrap();
    assert_eq!(baseline, Baseline::default());
  }
}
