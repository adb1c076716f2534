use serde::Serialize;

use crate::api::{ApiError, FetchMode, ResourceKind};

/// Change notifications published by the store, one per resource outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
  /// The slot for this kind now holds a new live value
  Updated(ResourceKind),
  /// A refresh failed; the slot is unchanged
  Failed { kind: ResourceKind, error: String },
}

impl SyncEvent {
  pub fn kind(&self) -> ResourceKind {
    match self {
      SyncEvent::Updated(kind) => *kind,
      SyncEvent::Failed { kind, .. } => *kind,
    }
  }
}

/// Result of refreshing one resource kind.
#[derive(Debug)]
pub enum RefreshOutcome {
  Updated,
  Unchanged(ApiError),
}

impl RefreshOutcome {
  pub fn is_updated(&self) -> bool {
    matches!(self, RefreshOutcome::Updated)
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      RefreshOutcome::Updated => None,
      RefreshOutcome::Unchanged(e) => Some(e),
    }
  }
}

/// Per-kind outcomes of one `refresh_all` call.
#[derive(Debug)]
pub struct RefreshReport {
  /// The mode every fetch in this call ran under
  pub mode: FetchMode,
  pub outcomes: Vec<(ResourceKind, RefreshOutcome)>,
}

impl RefreshReport {
  pub fn outcome(&self, kind: ResourceKind) -> Option<&RefreshOutcome> {
    self
      .outcomes
      .iter()
      .find(|(k, _)| *k == kind)
      .map(|(_, outcome)| outcome)
  }

  pub fn updated(&self) -> Vec<ResourceKind> {
    self
      .outcomes
      .iter()
      .filter(|(_, o)| o.is_updated())
      .map(|(k, _)| *k)
      .collect()
  }

  pub fn failed(&self) -> Vec<ResourceKind> {
    self
      .outcomes
      .iter()
      .filter(|(_, o)| !o.is_updated())
      .map(|(k, _)| *k)
      .collect()
  }

  pub fn all_updated(&self) -> bool {
    self.outcomes.iter().all(|(_, o)| o.is_updated())
  }

  /// Flattened form for printing.
  pub fn summary(&self) -> Vec<OutcomeSummary> {
    self
      .outcomes
      .iter()
      .map(|(kind, outcome)| OutcomeSummary {
        kind: *kind,
        updated: outcome.is_updated(),
        error: outcome.error().map(|e| e.to_string()),
      })
      .collect()
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
  pub kind: ResourceKind,
  pub updated: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}
