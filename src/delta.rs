//! Week-over-week delta computation (read path).
//!
//! Deltas are a derived overlay computed when the latest snapshot is served,
//! never persisted. Games are matched across editions by universe id. Absent
//! prior data yields all-null deltas; "no prior data" must stay
//! distinguishable from "no change".

use crate::models::{DeltaGame, DeltaSnapshot, EnrichedGame, GameDelta, Snapshot};
use crate::utils::round6;

/// Annotate the latest snapshot's top-5 with deltas against the previous
/// edition, when one exists.
pub fn annotate(latest: &Snapshot, previous: Option<&Snapshot>) -> DeltaSnapshot {
    let top5 = latest
        .top5
        .iter()
        .map(|game| {
            let prior = previous.and_then(|p| {
                p.top5.iter().find(|prev| prev.universeId == game.universeId)
            });
            DeltaGame {
                game: game.clone(),
                delta: compute_delta(game, prior),
            }
        })
        .collect();

    DeltaSnapshot {
        generatedAt: latest.generatedAt.clone(),
        meta: latest.meta.clone(),
        headlines: latest.headlines.clone(),
        articles: latest.articles.clone(),
        top5,
        top100: latest.top100.clone(),
    }
}

/// Compute absolute and percentage deltas for one game.
pub fn compute_delta(current: &EnrichedGame, previous: Option<&EnrichedGame>) -> GameDelta {
    let Some(prev) = previous else {
        return GameDelta::default();
    };

    GameDelta {
        playing: diff(current.playing, prev.playing),
        visits: diff(current.visits, prev.visits),
        favorites: diff(current.favorites, prev.favorites),
        likeRatio: diff_ratio(current.likeRatio, prev.likeRatio),
        playingPct: pct(current.playing, prev.playing),
        favoritesPct: pct(current.favorites, prev.favorites),
        prevUpdated: prev.updated.clone(),
    }
}

fn diff(current: Option<i64>, previous: Option<i64>) -> Option<i64> {
    Some(current? - previous?)
}

fn diff_ratio(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    Some(round6(current? - previous?))
}

fn pct(current: Option<i64>, previous: Option<i64>) -> Option<f64> {
    let current = current?;
    let previous = previous?;
    if previous == 0 {
        return None;
    }
    Some(round6((current - previous) as f64 / previous as f64))
}
