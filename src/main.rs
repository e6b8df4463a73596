//! # Roblox Top-5 News
//!
//! A weekly "newspaper" of the top five trending Roblox games. A background
//! pipeline polls the platform's public discovery and statistics endpoints,
//! enriches the listing with per-title metadata (votes, favorites, like
//! ratio), asks an OpenAI-compatible LLM endpoint for headlines and per-game
//! articles, and persists the result as a dated snapshot plus a `latest.json`
//! pointer. The same process serves the snapshot (delta-annotated against
//! the previous edition) and a thumbnail proxy to the browser frontend.
//!
//! ## Usage
//!
//! ```sh
//! AI_API_KEY=sk-... roblox_top5_news --snapshots-dir ./snapshots
//! ```
//!
//! ## Architecture
//!
//! One refresh runs the pipeline stages in order:
//! 1. **Sort discovery**: find a ranking sort that actually yields games
//! 2. **Candidate extraction**: normalize the loosely-typed listing payload
//! 3. **Enrichment**: merge detail/vote/favorite lookups per game
//! 4. **AI augmentation**: one generation request, validated field by field
//! 5. **Fallback assembly**: deterministic articles when the AI output is
//!    rejected (all-or-nothing, never a mix of voices)
//! 6. **Persistence**: dated snapshot file + `latest.json`, same bytes
//!
//! Refreshes run once at startup and every Monday 00:05 KST; the HTTP API
//! serves whatever the last successful refresh produced.

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod ai;
mod cli;
mod delta;
mod models;
mod outputs;
mod pipeline;
mod roblox;
mod server;
mod state;
mod utils;

use ai::ChatCompletionsGenerator;
use cli::Cli;
use state::AppState;
use utils::ensure_writable_dir;

/// Weekly refresh tick: Monday 00:05 KST, expressed in UTC (Sunday 15:05).
const REFRESH_SCHEDULE: &str = "0 5 15 * * Sun";

/// Timeout for platform API calls. Generation has its own, longer timeout.
const PLATFORM_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("roblox_top5_news starting up");

    let args = Cli::parse();

    // Early check: ensure the snapshots dir is writable
    if let Err(e) = ensure_writable_dir(&args.snapshots_dir).await {
        error!(
            path = %args.snapshots_dir,
            error = %e,
            "Snapshots directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let http = reqwest::Client::builder()
        .timeout(PLATFORM_TIMEOUT)
        .user_agent(concat!("roblox_top5_news/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let generator = Arc::new(ChatCompletionsGenerator::new(
        &args.ai_base_url,
        args.ai_api_key.clone(),
        &args.ai_model,
    )?);
    info!(base_url = %args.ai_base_url, model = %args.ai_model, "Article generator configured");

    let state = AppState::new(
        http,
        PathBuf::from(&args.snapshots_dir),
        args.fav_concurrency,
    );

    // Reload the last edition from disk so the API serves immediately after
    // a restart, before the first refresh completes.
    match outputs::json::read_latest(&state.snapshots_dir).await {
        Ok(Some(snapshot)) => {
            info!(generated_at = %snapshot.generatedAt, "Loaded previous edition from disk");
            state.install_latest(snapshot).await;
        }
        Ok(None) => info!("No previous edition on disk yet"),
        Err(e) => warn!(error = %e, "Could not load previous edition; continuing without it"),
    }

    // --- Eager refresh at startup ---
    if args.skip_initial_refresh {
        info!("Skipping initial refresh (--skip-initial-refresh)");
    } else {
        let state = Arc::clone(&state);
        let generator = Arc::clone(&generator);
        tokio::spawn(async move {
            let _ = pipeline::refresh(&state, generator.as_ref()).await;
        });
    }

    // --- Weekly schedule ---
    let scheduler = JobScheduler::new().await?;
    {
        let state = Arc::clone(&state);
        let generator = Arc::clone(&generator);
        scheduler
            .add(Job::new_async(REFRESH_SCHEDULE, move |_uuid, _lock| {
                let state = Arc::clone(&state);
                let generator = Arc::clone(&generator);
                Box::pin(async move {
                    let _ = pipeline::refresh(&state, generator.as_ref()).await;
                })
            })?)
            .await?;
    }
    scheduler.start().await?;
    info!(schedule = REFRESH_SCHEDULE, "Weekly refresh scheduled (Monday 00:05 KST)");

    // --- Serve the API ---
    let app = server::router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!(bind = %args.bind, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
