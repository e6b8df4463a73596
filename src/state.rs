//! Central application state.
//!
//! Everything request handlers and the refresh job share lives here,
//! explicitly owned and dependency-injected; no module-level mutable
//! state. Constructed once at startup; read and written only through its
//! methods, which keeps test setup trivial.

use moka::sync::Cache;
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::models::Snapshot;

/// Thumbnail cache TTL. Entries are treated as stale past this age and
/// replaced on the next miss.
const THUMBNAIL_TTL: Duration = Duration::from_secs(30 * 60);

/// Thumbnail cache capacity bound. The key space (arbitrary id-list
/// strings) is client-controlled, so the cache must not grow without limit.
const THUMBNAIL_CAPACITY: u64 = 1024;

pub type SharedState = Arc<AppState>;

/// Shared state for the refresh job and the HTTP handlers.
pub struct AppState {
    /// Short-timeout client for platform API calls.
    pub http: Client,
    /// Directory holding dated snapshots and `latest.json`.
    pub snapshots_dir: PathBuf,
    /// Worker-pool size for per-game favorites lookups.
    pub fav_concurrency: usize,
    latest: RwLock<Option<Arc<Snapshot>>>,
    last_refresh_error: RwLock<Option<String>>,
    thumbnails: Cache<String, Arc<Value>>,
    refresh_gate: Mutex<()>,
}

impl AppState {
    /// Construct the state wrapped in an [`Arc`] so it can be cloned into
    /// handlers and scheduler jobs cheaply.
    pub fn new(http: Client, snapshots_dir: PathBuf, fav_concurrency: usize) -> SharedState {
        Arc::new(Self::with_thumbnail_cache(
            http,
            snapshots_dir,
            fav_concurrency,
            THUMBNAIL_TTL,
            THUMBNAIL_CAPACITY,
        ))
    }

    /// Like [`AppState::new`] but with an explicit thumbnail cache shape.
    /// Exists so tests can use a short TTL.
    pub fn with_thumbnail_cache(
        http: Client,
        snapshots_dir: PathBuf,
        fav_concurrency: usize,
        thumbnail_ttl: Duration,
        thumbnail_capacity: u64,
    ) -> Self {
        Self {
            http,
            snapshots_dir,
            fav_concurrency,
            latest: RwLock::new(None),
            last_refresh_error: RwLock::new(None),
            thumbnails: Cache::builder()
                .max_capacity(thumbnail_capacity)
                .time_to_live(thumbnail_ttl)
                .build(),
            refresh_gate: Mutex::new(()),
        }
    }

    /// The most recent snapshot, if one has been generated or loaded.
    pub async fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.read().await.clone()
    }

    /// Install a new latest snapshot.
    ///
    /// Used both by a completed refresh and by cold reads off disk; neither
    /// touches the refresh-error slot.
    pub async fn install_latest(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.latest.write().await = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Record why the most recent refresh failed, for `/healthz`.
    pub async fn record_refresh_error(&self, message: &str) {
        *self.last_refresh_error.write().await = Some(message.to_string());
    }

    /// Clear the refresh-error slot after a successful refresh.
    pub async fn clear_refresh_error(&self) {
        *self.last_refresh_error.write().await = None;
    }

    pub async fn last_refresh_error(&self) -> Option<String> {
        self.last_refresh_error.read().await.clone()
    }

    /// Cached thumbnail payload for an exact id-list string, if fresh.
    pub fn cached_thumbnails(&self, key: &str) -> Option<Arc<Value>> {
        self.thumbnails.get(key)
    }

    /// Store a thumbnail payload under the exact id-list string.
    pub fn store_thumbnails(&self, key: String, payload: Arc<Value>) {
        self.thumbnails.insert(key, payload);
    }

    /// Claim the single-flight refresh slot.
    ///
    /// Returns `None` when a refresh is already in flight; the caller skips
    /// its trigger. The guard releases the slot when dropped.
    pub fn try_begin_refresh(&self) -> Option<MutexGuard<'_, ()>> {
        self.refresh_gate.try_lock().ok()
    }
}
