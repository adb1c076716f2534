//! The sync orchestrator: five observable slots kept fresh from the backend.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::api::mock;
use crate::api::types::{Baseline, Consumption, PhysioAge, Readiness, WeeklyReport};
use crate::api::{ApiClient, ApiError, FetchMode, Resource, ResourceKind};
use crate::cache::LocalCache;
use crate::config::ApiConfig;
use crate::json::JsonValue;

use super::event::{RefreshOutcome, RefreshReport, SyncEvent};
use super::slot::{Provenance, Slot, Snapshot};

const EVENT_CAPACITY: usize = 64;

/// Inputs for the endpoints that need them. Bodies are opaque to this layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPayloads {
  /// Baseline path segment, also written into each body
  pub user_id: String,
  pub consumption: Option<JsonValue>,
  pub weekly_report: Option<JsonValue>,
  pub physio_age: Option<JsonValue>,
}

impl RequestPayloads {
  /// Sample bodies for development against a local backend.
  pub fn sample() -> Self {
    Self {
      user_id: mock::SAMPLE_USER_ID.to_string(),
      consumption: Some(mock::consumption_payload()),
      weekly_report: Some(mock::weekly_report_payload()),
      physio_age: Some(mock::physio_age_payload()),
    }
  }

  /// Request data for `config`: body files where configured, samples
  /// otherwise, all addressed to `config.user_id`.
  pub fn from_config(config: &ApiConfig) -> Result<Self> {
    let mut requests = Self::sample();
    let files = &config.requests;
    if let Some(path) = &files.consumption {
      requests.consumption = Some(read_body(path)?);
    }
    if let Some(path) = &files.weekly_report {
      requests.weekly_report = Some(read_body(path)?);
    }
    if let Some(path) = &files.physio_age {
      requests.physio_age = Some(read_body(path)?);
    }
    Ok(requests.with_user_id(config.user_id.clone()))
  }

  /// Address every request to `user_id`: the baseline path, the top-level
  /// `user_id` of the consumption and physio-age bodies, and the weekly
  /// report's inner `payload.user_id`.
  pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
    self.user_id = user_id.into();
    let id = self.user_id.as_str();

    for body in [&mut self.consumption, &mut self.physio_age].into_iter().flatten() {
      body.insert("user_id", id);
    }
    if let Some(inner) = self
      .weekly_report
      .as_mut()
      .and_then(|body| body.get_mut("payload"))
    {
      inner.insert("user_id", id);
    }
    self
  }
}

fn read_body(path: &Path) -> Result<JsonValue> {
  let bytes = std::fs::read(path)
    .map_err(|e| eyre!("Failed to read request body {}: {}", path.display(), e))?;
  let body: JsonValue = serde_json::from_slice(&bytes)
    .map_err(|e| eyre!("Failed to parse request body {}: {}", path.display(), e))?;
  if body.as_object().is_none() {
    return Err(eyre!("Request body {} must be a JSON object", path.display()));
  }
  Ok(body)
}

impl Default for RequestPayloads {
  fn default() -> Self {
    Self::sample()
  }
}

/// Provenance and age of one slot, without its payload.
#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
  pub kind: ResourceKind,
  pub provenance: Provenance,
  pub refreshed_at: Option<DateTime<Utc>>,
  pub stale: bool,
}

/// Owns the current snapshot of every resource and keeps them fresh.
///
/// Each slot moves independently: seeded from cache (or the built-in sample)
/// at construction, replaced on a successful fetch, and left exactly as it was
/// when a fetch fails. Consumers read snapshots, subscribe to a slot's watch
/// channel, or listen to the [`SyncEvent`] feed.
pub struct SyncStore {
  client: ApiClient,
  cache: LocalCache,
  readiness: Slot<Readiness>,
  consumption: Slot<Consumption>,
  weekly_report: Slot<WeeklyReport>,
  baseline: Slot<Baseline>,
  physio_age: Slot<PhysioAge>,
  requests: RwLock<RequestPayloads>,
  events: broadcast::Sender<SyncEvent>,
}

impl SyncStore {
  pub fn new(client: ApiClient, cache: LocalCache) -> Self {
    let store = Self {
      readiness: Slot::seed(&cache),
      consumption: Slot::seed(&cache),
      weekly_report: Slot::seed(&cache),
      baseline: Slot::seed(&cache),
      physio_age: Slot::seed(&cache),
      client,
      cache,
      requests: RwLock::new(RequestPayloads::default()),
      events: broadcast::channel(EVENT_CAPACITY).0,
    };

    for status in store.status(Duration::zero()) {
      debug!(kind = %status.kind, provenance = ?status.provenance, "slot seeded");
    }

    store
  }

  pub fn with_requests(self, requests: RequestPayloads) -> Self {
    self.set_requests(requests);
    self
  }

  // ==========================================================================
  // Consumer-facing reads
  // ==========================================================================

  pub fn readiness(&self) -> Snapshot<Readiness> {
    self.readiness.current()
  }

  pub fn consumption(&self) -> Snapshot<Consumption> {
    self.consumption.current()
  }

  pub fn weekly_report(&self) -> Snapshot<WeeklyReport> {
    self.weekly_report.current()
  }

  pub fn baseline(&self) -> Snapshot<Baseline> {
    self.baseline.current()
  }

  pub fn physio_age(&self) -> Snapshot<PhysioAge> {
    self.physio_age.current()
  }

  pub fn subscribe_readiness(&self) -> watch::Receiver<Snapshot<Readiness>> {
    self.readiness.subscribe()
  }

  pub fn subscribe_consumption(&self) -> watch::Receiver<Snapshot<Consumption>> {
    self.consumption.subscribe()
  }

  pub fn subscribe_weekly_report(&self) -> watch::Receiver<Snapshot<WeeklyReport>> {
    self.weekly_report.subscribe()
  }

  pub fn subscribe_baseline(&self) -> watch::Receiver<Snapshot<Baseline>> {
    self.baseline.subscribe()
  }

  pub fn subscribe_physio_age(&self) -> watch::Receiver<Snapshot<PhysioAge>> {
    self.physio_age.subscribe()
  }

  /// Feed of per-kind updates and failures across all slots.
  pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
    self.events.subscribe()
  }

  /// Current value of one slot as wire-format JSON.
  pub fn value_json(&self, kind: ResourceKind) -> serde_json::Result<serde_json::Value> {
    match kind {
      ResourceKind::Readiness => serde_json::to_value(&*self.readiness().value),
      ResourceKind::Consumption => serde_json::to_value(&*self.consumption().value),
      ResourceKind::WeeklyReport => serde_json::to_value(&*self.weekly_report().value),
      ResourceKind::Baseline => serde_json::to_value(&*self.baseline().value),
      ResourceKind::PhysioAge => serde_json::to_value(&*self.physio_age().value),
    }
  }

  pub fn status(&self, stale_after: Duration) -> Vec<SlotStatus> {
    let now = Utc::now();
    vec![
      slot_status(ResourceKind::Readiness, &self.readiness(), now, stale_after),
      slot_status(ResourceKind::Consumption, &self.consumption(), now, stale_after),
      slot_status(ResourceKind::WeeklyReport, &self.weekly_report(), now, stale_after),
      slot_status(ResourceKind::Baseline, &self.baseline(), now, stale_after),
      slot_status(ResourceKind::PhysioAge, &self.physio_age(), now, stale_after),
    ]
  }

  // ==========================================================================
  // Controls
  // ==========================================================================

  pub fn use_mock(&self) -> bool {
    self.client.use_mock()
  }

  /// Switch between sample data and the live backend. Takes effect from the
  /// next refresh call; refreshes already running keep their mode.
  pub fn set_use_mock(&self, use_mock: bool) {
    info!(use_mock, "fetch mode changed");
    self.client.set_use_mock(use_mock);
  }

  pub fn requests(&self) -> RequestPayloads {
    match self.requests.read() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  pub fn set_requests(&self, requests: RequestPayloads) {
    match self.requests.write() {
      Ok(mut guard) => *guard = requests,
      Err(poisoned) => *poisoned.into_inner() = requests,
    }
  }

  // ==========================================================================
  // Refresh
  // ==========================================================================

  /// Refresh all five resources concurrently.
  ///
  /// The mode flag is read once, here, so every fetch in this call uses the
  /// same source. Completes when all five outcomes are in; a failure in one
  /// kind never stops or delays the others from committing.
  pub async fn refresh_all(&self) -> RefreshReport {
    let mode = self.client.mode();
    self.refresh_all_with(mode).await
  }

  /// Refresh all five resources under an explicit mode.
  pub async fn refresh_all_with(&self, mode: FetchMode) -> RefreshReport {
    info!(?mode, "refreshing all resources");

    let (readiness, consumption, weekly_report, baseline, physio_age) = tokio::join!(
      self.refresh_kind(ResourceKind::Readiness, mode),
      self.refresh_kind(ResourceKind::Consumption, mode),
      self.refresh_kind(ResourceKind::WeeklyReport, mode),
      self.refresh_kind(ResourceKind::Baseline, mode),
      self.refresh_kind(ResourceKind::PhysioAge, mode),
    );

    let report = RefreshReport {
      mode,
      outcomes: vec![
        (ResourceKind::Readiness, readiness),
        (ResourceKind::Consumption, consumption),
        (ResourceKind::WeeklyReport, weekly_report),
        (ResourceKind::Baseline, baseline),
        (ResourceKind::PhysioAge, physio_age),
      ],
    };

    info!(
      updated = report.updated().len(),
      failed = report.failed().len(),
      "refresh complete"
    );
    report
  }

  /// Refresh a single resource without touching the others.
  pub async fn refresh_one(&self, kind: ResourceKind) -> RefreshOutcome {
    let mode = self.client.mode();
    self.refresh_kind(kind, mode).await
  }

  async fn refresh_kind(&self, kind: ResourceKind, mode: FetchMode) -> RefreshOutcome {
    // Copy out what this fetch needs; the lock is never held across an await
    let requests = self.requests();
    let client = &self.client;

    match kind {
      ResourceKind::Readiness => {
        self
          .refresh_slot(&self.readiness, mode, client.fetch_readiness(mode))
          .await
      }
      ResourceKind::Consumption => {
        let payload = requests.consumption;
        self
          .refresh_slot(
            &self.consumption,
            mode,
            client.post_consumption(mode, payload.as_ref()),
          )
          .await
      }
      ResourceKind::WeeklyReport => {
        let payload = requests.weekly_report;
        self
          .refresh_slot(
            &self.weekly_report,
            mode,
            client.run_weekly_report(mode, payload.as_ref()),
          )
          .await
      }
      ResourceKind::Baseline => {
        let user_id = requests.user_id;
        self
          .refresh_slot(&self.baseline, mode, client.fetch_baseline(mode, &user_id))
          .await
      }
      ResourceKind::PhysioAge => {
        let payload = requests.physio_age;
        self
          .refresh_slot(
            &self.physio_age,
            mode,
            client.fetch_physio_age(mode, payload.as_ref()),
          )
          .await
      }
    }
  }

  async fn refresh_slot<R, F>(
    &self,
    slot: &Slot<R>,
    mode: FetchMode,
    fetch: F,
  ) -> RefreshOutcome
  where
    R: Resource,
    F: Future<Output = Result<R, ApiError>>,
  {
    let kind = R::KIND;

    match fetch.await {
      Ok(value) => {
        let value = Arc::new(value);
        // Overlapping refreshes of one kind commit one at a time, so the slot
        // and the cache always end up holding the same value.
        let _commit = slot.lock_commit().await;
        match mode {
          FetchMode::Live => {
            slot.replace(Arc::clone(&value), Provenance::Live, Utc::now());
            self.persist(value).await;
          }
          // Samples never reach the cache; it only holds backend data
          FetchMode::Mock => slot.replace(value, Provenance::Mock, Utc::now()),
        }

        info!(kind = %kind, ?mode, "resource updated");
        // No receivers is fine
        let _ = self.events.send(SyncEvent::Updated(kind));
        RefreshOutcome::Updated
      }
      Err(e) => {
        warn!(
          kind = %kind,
          error_kind = e.kind_label(),
          error = %e,
          "refresh failed, keeping previous snapshot"
        );
        let _ = self.events.send(SyncEvent::Failed {
          kind,
          error: e.to_string(),
        });
        RefreshOutcome::Unchanged(e)
      }
    }
  }

  /// Write-through to the cache, off the async threads. Best-effort: the
  /// cache logs its own failures and a panicked write task is only logged.
  async fn persist<R: Resource>(&self, value: Arc<R>) {
    let cache = self.cache.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || cache.save(value.as_ref())).await {
      warn!(kind = %R::KIND, error = %e, "cache write task failed");
    }
  }
}

fn slot_status<T>(
  kind: ResourceKind,
  snapshot: &Snapshot<T>,
  now: DateTime<Utc>,
  stale_after: Duration,
) -> SlotStatus {
  SlotStatus {
    kind,
    provenance: snapshot.provenance,
    refreshed_at: snapshot.refreshed_at,
    stale: snapshot.is_stale_at(now, stale_after),
  }
}
