use chrono::Duration;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use motivue_sync::api::{ApiClient, ResourceKind};
use motivue_sync::cache::{FileStorage, LocalCache};
use motivue_sync::config::Config;
use motivue_sync::logging;
use motivue_sync::sync::{OutcomeSummary, Provenance, RequestPayloads, SyncStore};

#[derive(Parser, Debug)]
#[command(name = "motivue-sync")]
#[command(about = "Fetch, cache and inspect Motivue readiness data")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./motivue.yaml, then $XDG_CONFIG_HOME/motivue/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Serve built-in sample data instead of calling the backend
  #[arg(long, global = true, conflicts_with = "live")]
  mock: bool,

  /// Call the backend even if the config asks for mock data
  #[arg(long, global = true)]
  live: bool,

  /// Neither read nor write the local cache
  #[arg(long, global = true)]
  no_cache: bool,

  /// Also log to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Refresh resources from the backend and print the outcome per kind
  Refresh {
    /// Only refresh these kinds (comma separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    only: Vec<ResourceKind>,
  },
  /// Print the current value of one resource
  Show {
    #[arg(value_enum)]
    kind: ResourceKind,
  },
  /// Print provenance and age of every resource
  Status,
  /// Manage the local cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Remove cached entries (all kinds if none given)
  Clear {
    #[arg(value_enum)]
    kind: Option<ResourceKind>,
  },
}

#[derive(Serialize)]
struct ShowOutput {
  kind: ResourceKind,
  provenance: Provenance,
  refreshed_at: Option<chrono::DateTime<chrono::Utc>>,
  stale: bool,
  value: serde_json::Value,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = Config::load(args.config.as_deref())?;
  if args.mock {
    config.api.use_mock = true;
  } else if args.live {
    config.api.use_mock = false;
  }
  if args.no_cache {
    config.cache.enabled = false;
  }

  let log_guard = logging::init(&config, args.verbose)?;
  info!(
    log_dir = %log_guard.log_dir().display(),
    base_url = %config.api.base_url,
    use_mock = config.api.use_mock,
    cache = config.cache.enabled,
    "starting"
  );

  if let Command::Cache {
    action: CacheAction::Clear { kind },
  } = &args.command
  {
    return clear_cache(&config, *kind);
  }

  let client = ApiClient::new(&config.api)?;
  let store = SyncStore::new(client, open_cache(&config))
    .with_requests(RequestPayloads::from_config(&config.api)?);
  let stale_after = Duration::minutes(config.cache.stale_after_minutes);

  match args.command {
    Command::Refresh { only } => {
      let summary: Vec<OutcomeSummary> = if only.is_empty() {
        store.refresh_all().await.summary()
      } else {
        let outcomes = join_all(only.iter().map(|kind| store.refresh_one(*kind))).await;
        only
          .iter()
          .zip(outcomes)
          .map(|(kind, outcome)| OutcomeSummary {
            kind: *kind,
            updated: outcome.is_updated(),
            error: outcome.error().map(|e| e.to_string()),
          })
          .collect()
      };
      print_json(&summary)?;
    }
    Command::Show { kind } => {
      let status = store
        .status(stale_after)
        .into_iter()
        .find(|s| s.kind == kind)
        .ok_or_else(|| eyre!("No slot for {}", kind))?;
      let output = ShowOutput {
        kind,
        provenance: status.provenance,
        refreshed_at: status.refreshed_at,
        stale: status.stale,
        value: store.value_json(kind)?,
      };
      print_json(&output)?;
    }
    Command::Status => print_json(&store.status(stale_after))?,
    Command::Cache { .. } => {}
  }

  Ok(())
}

/// A cache that cannot be opened only costs us persistence.
fn open_cache(config: &Config) -> LocalCache {
  if !config.cache.enabled {
    return LocalCache::disabled();
  }

  match config.cache_dir().and_then(FileStorage::open) {
    Ok(storage) => {
      info!(dir = %storage.dir().display(), "using file cache");
      LocalCache::new(storage)
    }
    Err(e) => {
      warn!(error = %e, "cache unavailable, continuing without it");
      LocalCache::disabled()
    }
  }
}

fn clear_cache(config: &Config, kind: Option<ResourceKind>) -> Result<()> {
  let cache = LocalCache::new(FileStorage::open(config.cache_dir()?)?);
  let kinds = match kind {
    Some(kind) => vec![kind],
    None => ResourceKind::ALL.to_vec(),
  };

  for kind in kinds {
    cache.clear(kind)?;
    info!(kind = %kind, "cache entry removed");
    println!("cleared {}", kind);
  }
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let out = serde_json::to_string_pretty(value)?;
  println!("{}", out);
  Ok(())
}
