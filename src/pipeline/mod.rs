//! The snapshot generation pipeline.
//!
//! One `refresh` invocation runs the full pipeline in dependency order:
//!
//! 1. **Sort discovery** ([`discovery`]): find a ranking sort that actually
//!    yields games, trying candidates in priority order
//! 2. **Candidate extraction** (`roblox::explore`): turn raw listing entries
//!    into uniform candidates
//! 3. **Enrichment** ([`enrich`]): merge detail, vote, and favorite lookups
//!    into one record per candidate
//! 4. **AI augmentation** (`ai` + [`articles`]): generate articles for the
//!    top 5 and validate the result field by field
//! 5. **Fallback assembly** ([`articles`]): deterministic articles when the
//!    AI bundle is rejected or absent
//! 6. **Persistence** (`outputs::json`): dated snapshot file plus the
//!    `latest.json` pointer
//!
//! Upstream-fetch and persistence errors abort the run and leave the
//! previous snapshot authoritative. AI problems never abort; they resolve to
//! fallback articles. A refresh triggered while another is in flight is
//! skipped via the state's single-flight guard.

pub mod articles;
pub mod discovery;
pub mod enrich;

use chrono::{SecondsFormat, Utc};
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::ai::{ArticleGenerator, ArticleRequest};
use crate::models::Snapshot;
use crate::outputs;
use crate::roblox::explore;
use crate::state::AppState;
use crate::utils::BoxError;

/// How many games receive AI-generated articles.
pub const TOP5: usize = 5;

/// How many games the wide listing carries.
pub const TOP100: usize = 100;

/// Run one full refresh cycle and install the result as the latest snapshot.
///
/// Skips silently (with a warning) when another refresh is already in
/// flight. On failure the in-memory snapshot and the files on disk keep
/// their last-known-good state.
#[instrument(level = "info", skip_all)]
pub async fn refresh<G: ArticleGenerator>(state: &AppState, generator: &G) -> Result<(), BoxError> {
    let Some(_guard) = state.try_begin_refresh() else {
        warn!("Refresh already in flight; skipping this trigger");
        return Ok(());
    };

    let t0 = Instant::now();
    info!("Snapshot refresh starting");

    match build_snapshot(state, generator).await {
        Ok(snapshot) => {
            let generated_at = snapshot.generatedAt.clone();
            state.install_latest(snapshot).await;
            state.clear_refresh_error().await;
            info!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                generated_at = %generated_at,
                "Snapshot refresh complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                error = %e,
                "Snapshot refresh failed; previous snapshot remains authoritative"
            );
            state.record_refresh_error(&e.to_string()).await;
            Err(e)
        }
    }
}

/// Build and persist one snapshot.
async fn build_snapshot<G: ArticleGenerator>(
    state: &AppState,
    generator: &G,
) -> Result<Snapshot, BoxError> {
    let session_id = Uuid::new_v4().to_string();

    let discovered = discovery::discover_sort(&state.http, &session_id).await?;
    info!(sort = %discovered.meta.sortName, "Using ranking sort");

    let mut candidates = explore::extract_candidates(&discovered.items);
    candidates.truncate(TOP100);
    if candidates.is_empty() {
        return Err("sort content yielded no usable candidates".into());
    }
    info!(count = candidates.len(), "Extracted candidates");

    let top5_slice = &candidates[..candidates.len().min(TOP5)];
    let top5 = enrich::enrich_games(&state.http, top5_slice, state.fav_concurrency).await?;
    let top100 = enrich::enrich_games(&state.http, &candidates, state.fav_concurrency).await?;

    let request = ArticleRequest::new(&discovered.meta, &top5);
    let bundle = match generator.generate(&request).await {
        Ok(bundle) => bundle,
        Err(e) => {
            warn!(error = %e, "Article generation errored; using fallback articles");
            None
        }
    };
    let (headlines, articles) = articles::resolve_articles(bundle, &top5);

    let snapshot = Snapshot {
        generatedAt: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        meta: discovered.meta,
        headlines,
        articles,
        top5,
        top100,
    };

    outputs::json::write_snapshot(&snapshot, &state.snapshots_dir).await?;
    Ok(snapshot)
}
