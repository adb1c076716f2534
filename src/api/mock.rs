//! Static sample data for offline development.
//!
//! The samples double as the built-in defaults a slot falls back to when the
//! network is off and nothing has been cached yet.

use std::collections::BTreeMap;

use super::types::{
  Baseline, Consumption, FinalReport, Insight, Metrics, NextWeekPlan, PhysioAge, Readiness,
  ReportPackage, SessionBreakdown, SleepScores, WeeklyReport, WeeklyState,
};
use crate::json::JsonValue;

pub const SAMPLE_USER_ID: &str = "athlete_001";

fn probs(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
  entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

pub fn readiness() -> Readiness {
  Readiness {
    user_id: Some(SAMPLE_USER_ID.to_string()),
    date: Some("2025-09-15".to_string()),
    final_score: Some(85),
    current_score: Some(80),
    diagnosis: Some("Well-adapted".to_string()),
    posterior_probs: Some(probs(&[
      ("Peak", 0.1),
      ("Well-adapted", 0.55),
      ("FOR", 0.25),
      ("Acute Fatigue", 0.08),
      ("NFOR", 0.02),
      ("OTS", 0.0),
    ])),
    prior_probs: Some(probs(&[
      ("Peak", 0.12),
      ("Well-adapted", 0.5),
      ("FOR", 0.25),
      ("Acute Fatigue", 0.1),
      ("NFOR", 0.03),
      ("OTS", 0.0),
    ])),
    acwr: Some(1.05),
    hrv_rmssd_today: Some(63.0),
    sleep_duration_hours: Some(7.6),
    metrics: Some(Metrics {
      hrv_z_score: Some(0.2),
      sleep_efficiency: Some(0.9),
      restorative_ratio: Some(0.42),
      acwr_7d: Some(1.0),
      acwr_28d: Some(0.92),
      sleep_baseline_hours: Some(7.6),
      hrv_baseline_mu: Some(63.0),
    }),
    insights: Some(vec![Insight {
      title: Some("HRV rebounding".to_string()),
      summary: Some("Recovery looks good; moderate intensity is fine today.".to_string()),
      actions: Some(strings(&[
        "Keep sleep timing consistent",
        "Limit high-load days",
      ])),
    }]),
    objective: None,
    journal: None,
    hooper: None,
    update_history: None,
  }
}

pub fn consumption() -> Consumption {
  Consumption {
    load_score: Some(18.5),
    readiness_after_training: Some(66.0),
    breakdown: Some(vec![
      SessionBreakdown {
        session_id: Some("s1".to_string()),
        label: Some("Legs".to_string()),
        load_units: Some(500.0),
        consumed_load: Some(15.0),
        notes: Some("RPE 8 x 70m".to_string()),
      },
      SessionBreakdown {
        session_id: Some("s2".to_string()),
        label: Some("Tennis".to_string()),
        load_units: Some(200.0),
        consumed_load: Some(3.5),
        notes: None,
      },
    ]),
    base_readiness: Some(85.0),
  }
}

pub fn weekly_report() -> WeeklyReport {
  WeeklyReport {
    state: Some(WeeklyState {
      metrics: Some(Metrics {
        hrv_z_score: Some(0.1),
        sleep_efficiency: Some(0.88),
        restorative_ratio: Some(0.4),
        acwr_7d: Some(1.05),
        acwr_28d: Some(0.95),
        sleep_baseline_hours: Some(7.6),
        hrv_baseline_mu: Some(63.0),
      }),
      insights: Some(Vec::new()),
      next_week_plan: Some(NextWeekPlan {
        summary: Some("Deload & maintenance".to_string()),
        goals: Some(strings(&["Keep high-load days to 2 or fewer"])),
        thresholds: None,
        daily: None,
      }),
    }),
    package: Some(ReportPackage {
      charts: Some(Vec::new()),
      analyst: None,
      communicator: None,
      critique: None,
    }),
    final_report: Some(FinalReport {
      markdown: Some(
        "## Weekly Overview\n- 7 training days, peak load 500 AU\n- Average readiness 80.3, recovering into the weekend\n[[chart:readiness_trend]]"
          .to_string(),
      ),
      html: None,
      chart_ids: Some(strings(&["readiness_trend", "training_load"])),
      call_to_action: Some(strings(&[
        "Keep high-intensity days to 2 or fewer",
        "Sleep more than 7.6h",
      ])),
      persisted: Some(false),
    }),
  }
}

pub fn baseline() -> Baseline {
  Baseline {
    user_id: Some(SAMPLE_USER_ID.to_string()),
    sleep_baseline_hours: Some(7.6),
    sleep_baseline_efficiency: Some(0.87),
    rest_baseline_ratio: Some(0.37),
    hrv_baseline_mu: Some(63.0),
    hrv_baseline_sd: Some(5.8),
  }
}

pub fn physio_age() -> PhysioAge {
  PhysioAge {
    age: Some(24),
    age_weighted: Some(24.5),
    zscores: Some(probs(&[("sdnn", -0.6), ("rhr", -0.4), ("css", -0.3)])),
    sleep_scores: Some(SleepScores {
      duration_score: Some(78.0),
      efficiency_score: Some(82.0),
      restorative_score: Some(75.0),
    }),
    status: Some("ok".to_string()),
    window_days_used: Some(30),
  }
}

// ============================================================================
// Sample request bodies for the POST endpoints
// ============================================================================

pub fn consumption_payload() -> JsonValue {
  serde_json::json!({
    "user_id": SAMPLE_USER_ID,
    "date": "2025-09-18",
    "sessions": [
      { "label": "Legs", "rpe": 8, "duration_minutes": 70 },
      { "label": "Tennis", "au": 200 }
    ]
  })
  .into()
}

pub fn weekly_report_payload() -> JsonValue {
  serde_json::json!({
    "payload": {
      "user_id": SAMPLE_USER_ID,
      "date": "2025-09-18",
      "history": []
    },
    "use_llm": false,
    "persist": false
  })
  .into()
}

pub fn physio_age_payload() -> JsonValue {
  serde_json::json!({
    "user_id": SAMPLE_USER_ID,
    "user_gender": "male",
    "sdnn_series": vec![50; 30],
    "rhr_series": vec![55; 30],
    "total_sleep_minutes": 420,
    "in_bed_minutes": 470,
    "deep_sleep_minutes": 90,
    "rem_sleep_minutes": 95
  })
  .into()
}
