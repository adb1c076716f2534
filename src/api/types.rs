//! Decode targets for the five backend resources.
//!
//! Every field is optional: the service omits values it has not computed yet,
//! and a field of the wrong JSON type is dropped to `None` instead of failing
//! the whole resource. Wire names are the backend's snake_case keys; where the
//! Rust name differs, the mapping is spelled out with `rename`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::json::JsonValue;

/// Decode a field, treating a type mismatch the same as an absent field.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let value = serde_json::Value::deserialize(deserializer)?;
  Ok(serde_json::from_value(value).ok())
}

/// Integer fields also accept whole-number floats such as `85.0`. Fractional
/// or out-of-range values drop to `None` like any other mismatch.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
  D: Deserializer<'de>,
{
  const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53

  let value = serde_json::Value::deserialize(deserializer)?;
  Ok(value.as_i64().or_else(|| {
    value
      .as_f64()
      .filter(|f| f.fract() == 0.0 && f.abs() <= MAX_EXACT)
      .map(|f| f as i64)
  }))
}

// ============================================================================
// Shared nested types
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub hrv_z_score: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub sleep_efficiency: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub restorative_ratio: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub acwr_7d: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub acwr_28d: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub sleep_baseline_hours: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub hrv_baseline_mu: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub summary: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub actions: Option<Vec<String>>,
}

// ============================================================================
// Readiness
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub date: Option<String>,
  #[serde(
    rename = "final_readiness_score",
    default,
    deserialize_with = "lenient_int",
    skip_serializing_if = "Option::is_none"
  )]
  pub final_score: Option<i64>,
  #[serde(
    rename = "current_readiness_score",
    default,
    deserialize_with = "lenient_int",
    skip_serializing_if = "Option::is_none"
  )]
  pub current_score: Option<i64>,
  #[serde(
    rename = "final_diagnosis",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub diagnosis: Option<String>,
  /// Posterior state probabilities (state name -> probability)
  #[serde(
    rename = "final_posterior_probs",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub posterior_probs: Option<BTreeMap<String, f64>>,
  #[serde(
    rename = "next_previous_state_probs",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub prior_probs: Option<BTreeMap<String, f64>>,
  /// Acute:chronic workload ratio
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub acwr: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub hrv_rmssd_today: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub sleep_duration_hours: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub metrics: Option<Metrics>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub insights: Option<Vec<Insight>>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub objective: Option<JsonValue>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub journal: Option<JsonValue>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub hooper: Option<JsonValue>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub update_history: Option<JsonValue>,
}

// ============================================================================
// Training consumption
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Consumption {
  #[serde(
    rename = "consumption_score",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub load_score: Option<f64>,
  /// Readiness after subtracting today's training load
  #[serde(
    rename = "display_readiness",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub readiness_after_training: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub breakdown: Option<Vec<SessionBreakdown>>,
  #[serde(
    rename = "base_readiness_score",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub base_readiness: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionBreakdown {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub session_id: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  /// Arbitrary units of training load
  #[serde(
    rename = "au",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub load_units: Option<f64>,
  #[serde(
    rename = "consumption",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub consumed_load: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

// ============================================================================
// Weekly report
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
  #[serde(
    rename = "phase3_state",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub state: Option<WeeklyState>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub package: Option<ReportPackage>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub final_report: Option<FinalReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyState {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub metrics: Option<Metrics>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub insights: Option<Vec<Insight>>,
  // Older report builds emitted this one key in camelCase
  #[serde(
    alias = "nextWeekPlan",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub next_week_plan: Option<NextWeekPlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextWeekPlan {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub summary: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub goals: Option<Vec<String>>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub thresholds: Option<JsonValue>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub daily: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportPackage {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub charts: Option<Vec<ChartSpec>>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub analyst: Option<JsonValue>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub communicator: Option<JsonValue>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub critique: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
  #[serde(
    rename = "chart_id",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub id: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(
    rename = "chart_type",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub kind: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub data: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
  #[serde(
    rename = "markdown_report",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub markdown: Option<String>,
  #[serde(
    rename = "html_report",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub html: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub chart_ids: Option<Vec<String>>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub call_to_action: Option<Vec<String>>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub persisted: Option<bool>,
}

// ============================================================================
// Baseline
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub sleep_baseline_hours: Option<f64>,
  #[serde(
    rename = "sleep_baseline_eff",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub sleep_baseline_efficiency: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub rest_baseline_ratio: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub hrv_baseline_mu: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub hrv_baseline_sd: Option<f64>,
}

// ============================================================================
// Physiological age
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysioAge {
  #[serde(
    rename = "physiological_age",
    default,
    deserialize_with = "lenient_int",
    skip_serializing_if = "Option::is_none"
  )]
  pub age: Option<i64>,
  #[serde(
    rename = "physiological_age_weighted",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub age_weighted: Option<f64>,
  #[serde(
    rename = "best_age_zscores",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub zscores: Option<BTreeMap<String, f64>>,
  /// Composite sleep score breakdown
  #[serde(
    rename = "css_details",
    default,
    deserialize_with = "lenient",
    skip_serializing_if = "Option::is_none"
  )]
  pub sleep_scores: Option<SleepScores>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, deserialize_with = "lenient_int", skip_serializing_if = "Option::is_none")]
  pub window_days_used: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepScores {
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub duration_score: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub efficiency_score: Option<f64>,
  #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
  pub restorative_score: Option<f64>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::mock;
  use crate::api::resource::decode_resource;

  fn round_trip<T>(value: &T) -> T
  where
    T: Serialize + DeserializeOwned,
  {
    let bytes = serde_json::to_vec(value).unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[test]
  fn test_round_trip_samples() {
    let readiness = mock::readiness();
    assert_eq!(round_trip(&readiness), readiness);

    let consumption = mock::consumption();
    assert_eq!(round_trip(&consumption), consumption);

    let report = mock::weekly_report();
    assert_eq!(round_trip(&report), report);

    let baseline = mock::baseline();
    assert_eq!(round_trip(&baseline), baseline);

    let physio = mock::physio_age();
    assert_eq!(round_trip(&physio), physio);
  }

  #[test]
  fn test_round_trip_with_fields_absent() {
    let readiness = Readiness {
      user_id: Some("athlete_001".to_string()),
      metrics: Some(Metrics::default()),
      objective: Some(JsonValue::Null),
      ..Default::default()
    };
    assert_eq!(round_trip(&readiness), readiness);

    let empty = WeeklyReport::default();
    assert_eq!(round_trip(&empty), empty);
    assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");
  }

  #[test]
  fn test_wire_names() {
    let json = serde_json::to_value(mock::consumption()).unwrap();
    assert!(json.get("consumption_score").is_some());
    assert!(json.get("display_readiness").is_some());
    assert!(json.get("base_readiness_score").is_some());

    let first = &json["breakdown"][0];
    assert_eq!(first["session_id"], "s1");
    assert_eq!(first["au"], 500.0);
    assert_eq!(first["consumption"], 15.0);
  }

  #[test]
  fn test_mistyped_field_drops_to_none() {
    let body = br#"{
      "user_id": "athlete_001",
      "final_readiness_score": "eighty",
      "metrics": "not an object",
      "acwr": 1.1,
      "insights": [{"title": "ok", "actions": 3}]
    }"#;

    let readiness: Readiness = decode_resource(body).unwrap();
    assert_eq!(readiness.user_id.as_deref(), Some("athlete_001"));
    assert_eq!(readiness.final_score, None);
    assert_eq!(readiness.metrics, None);
    assert_eq!(readiness.acwr, Some(1.1));

    let insights = readiness.insights.unwrap();
    assert_eq!(insights[0].title.as_deref(), Some("ok"));
    assert_eq!(insights[0].actions, None);
  }

  #[test]
  fn test_integer_fields_accept_whole_floats() {
    let readiness: Readiness = decode_resource(
      br#"{"final_readiness_score": 85.0, "current_readiness_score": 72}"#,
    )
    .unwrap();
    assert_eq!(readiness.final_score, Some(85));
    assert_eq!(readiness.current_score, Some(72));

    let physio: PhysioAge =
      decode_resource(br#"{"physiological_age": 31.0, "window_days_used": 29.5}"#).unwrap();
    assert_eq!(physio.age, Some(31));
    assert_eq!(physio.window_days_used, None);

    let physio: PhysioAge = decode_resource(br#"{"physiological_age": "31"}"#).unwrap();
    assert_eq!(physio.age, None);
  }

  #[test]
  fn test_weekly_state_accepts_camel_case_plan() {
    let body = br#"{"phase3_state": {"nextWeekPlan": {"summary": "Deload"}}}"#;
    let report: WeeklyReport = decode_resource(body).unwrap();

    let plan = report.state.and_then(|s| s.next_week_plan).unwrap();
    assert_eq!(plan.summary.as_deref(), Some("Deload"));
  }

  #[test]
  fn test_chart_data_kept_as_json_value() {
    let body = br#"{"package": {"charts": [
      {"chart_id": "readiness_trend", "chart_type": "line", "data": {"x": [1, 2], "y": [80, 82]}}
    ]}}"#;
    let report: WeeklyReport = decode_resource(body).unwrap();

    let charts = report.package.and_then(|p| p.charts).unwrap();
    assert_eq!(charts[0].id.as_deref(), Some("readiness_trend"));
    assert_eq!(charts[0].kind.as_deref(), Some("line"));
    let data = charts[0].data.as_ref().unwrap();
    assert_eq!(data.get("y").and_then(JsonValue::as_array).map(|a| a.len()), Some(2));
  }
}
