//! Enrichment: merge detail, vote, and favorite data into one record per
//! candidate.
//!
//! Detail and vote lookups are batched and run concurrently with each other.
//! Favorites have no batch endpoint, so they run through a small worker pool
//! with a shared index counter, so at most `fav_concurrency` favorites calls
//! are ever in flight, which keeps the platform's rate limiter happy. A
//! failed favorites lookup degrades that one field to `null`; a failed
//! detail or vote batch aborts the run.
//!
//! The same entry point serves both the top-5 list and the top-100 listing,
//! parameterized by candidate slice and concurrency.

use futures::future::join_all;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, instrument, warn};

use crate::models::{Candidate, EnrichedGame, like_ratio};
use crate::roblox::games::{self, GameDetail, GameVotes};
use crate::utils::{BoxError, compact_count};

/// Enrich an ordered candidate slice, preserving input order.
#[instrument(level = "info", skip_all, fields(count = candidates.len(), fav_concurrency))]
pub async fn enrich_games(
    client: &Client,
    candidates: &[Candidate],
    fav_concurrency: usize,
) -> Result<Vec<EnrichedGame>, BoxError> {
    let ids: Vec<i64> = candidates.iter().map(|c| c.universeId).collect();

    let (details, votes) = tokio::join!(
        games::fetch_details(client, &ids),
        games::fetch_votes(client, &ids),
    );
    let details = details?;
    let votes = votes?;

    let favorites = favorites_pool(client, &ids, fav_concurrency).await;

    let enriched = merge_enriched(candidates, &details, &votes, &favorites);
    info!(count = enriched.len(), "Enrichment complete");
    Ok(enriched)
}

/// Fetch favorites counts through a bounded worker pool.
///
/// Workers pull the next index from a shared atomic counter until the id
/// list is exhausted, so at most `concurrency` requests are in flight at
/// once. Failures degrade to `None` for that id only.
pub async fn favorites_pool(client: &Client, ids: &[i64], concurrency: usize) -> Vec<Option<i64>> {
    let ids: Arc<Vec<i64>> = Arc::new(ids.to_vec());
    let next = Arc::new(AtomicUsize::new(0));

    let workers = (0..concurrency.max(1)).map(|_| {
        let client = client.clone();
        let ids = Arc::clone(&ids);
        let next = Arc::clone(&next);
        async move {
            let mut fetched = Vec::new();
            loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                if index >= ids.len() {
                    break;
                }
                let universe_id = ids[index];
                match games::fetch_favorites_count(&client, universe_id).await {
                    Ok(count) => fetched.push((index, Some(count))),
                    Err(e) => {
                        warn!(universe_id, error = %e, "Favorites lookup failed; degrading to null");
                        fetched.push((index, None));
                    }
                }
            }
            fetched
        }
    });

    let mut results = vec![None; ids.len()];
    for fetched in join_all(workers).await {
        for (index, value) in fetched {
            results[index] = value;
        }
    }
    results
}

/// Merge lookups into enriched records, one per candidate, in input order.
///
/// Missing detail or vote rows degrade the dependent fields to `null`;
/// `playing`/`visits` fall back to the values observed at discovery time.
pub fn merge_enriched(
    candidates: &[Candidate],
    details: &HashMap<i64, GameDetail>,
    votes: &HashMap<i64, GameVotes>,
    favorites: &[Option<i64>],
) -> Vec<EnrichedGame> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let detail = details.get(&candidate.universeId);
            let vote = votes.get(&candidate.universeId);

            let name = detail
                .and_then(|d| d.name.clone())
                .or_else(|| candidate.exploreName.clone())
                .unwrap_or_else(|| format!("Universe {}", candidate.universeId));
            let playing = detail
                .and_then(|d| d.playing)
                .or(candidate.explorePlaying);
            let visits = detail.and_then(|d| d.visits).or(candidate.exploreVisits);
            let favorites = favorites.get(index).copied().flatten();
            let up_votes = vote.and_then(|v| v.upVotes);
            let down_votes = vote.and_then(|v| v.downVotes);

            EnrichedGame {
                universeId: candidate.universeId,
                placeId: detail.and_then(|d| d.rootPlaceId),
                name,
                description: detail.and_then(|d| d.description.clone()),
                creator: detail.and_then(|d| d.creator.clone()),
                playing,
                visits,
                favorites,
                upVotes: up_votes,
                downVotes: down_votes,
                likeRatio: like_ratio(up_votes, down_votes),
                created: detail.and_then(|d| d.created.clone()),
                updated: detail.and_then(|d| d.updated.clone()),
                maxPlayers: detail.and_then(|d| d.maxPlayers),
                genre: detail.and_then(|d| d.genre.clone()),
                playing_compact: playing.map(compact_count),
                visits_compact: visits.map(compact_count),
                favorites_compact: favorites.map(compact_count),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(universe_id: i64) -> Candidate {
        Candidate {
            universeId: universe_id,
            exploreName: Some(format!("Explore {universe_id}")),
            explorePlaying: Some(10),
            exploreVisits: Some(1000),
        }
    }

    fn detail(universe_id: i64) -> GameDetail {
        serde_json::from_value(serde_json::json!({
            "id": universe_id,
            "rootPlaceId": universe_id * 10,
            "name": format!("Detail {universe_id}"),
            "description": "desc",
            "playing": 500,
            "visits": 2_000_000,
            "maxPlayers": 40,
            "genre": "Adventure",
        }))
        .unwrap()
    }

    fn vote(universe_id: i64) -> GameVotes {
        serde_json::from_value(serde_json::json!({
            "id": universe_id,
            "upVotes": 80,
            "downVotes": 20,
        }))
        .unwrap()
    }

    #[test]
    fn test_merge_preserves_input_order() {
        let candidates = vec![candidate(3), candidate(1), candidate(2)];
        let details: HashMap<i64, GameDetail> =
            [(1, detail(1)), (2, detail(2)), (3, detail(3))].into();
        let votes: HashMap<i64, GameVotes> = [(1, vote(1)), (2, vote(2)), (3, vote(3))].into();

        let enriched = merge_enriched(&candidates, &details, &votes, &[None, None, None]);
        let ids: Vec<_> = enriched.iter().map(|g| g.universeId).collect();
        assert_eq!(ids, [3, 1, 2]);
    }

    #[test]
    fn test_merge_missing_detail_degrades_to_explore_values() {
        let candidates = vec![candidate(7)];
        let enriched = merge_enriched(&candidates, &HashMap::new(), &HashMap::new(), &[None]);

        let game = &enriched[0];
        assert_eq!(game.name, "Explore 7");
        assert_eq!(game.playing, Some(10));
        assert_eq!(game.visits, Some(1000));
        assert_eq!(game.description, None);
        assert_eq!(game.upVotes, None);
        assert_eq!(game.likeRatio, None);
        assert_eq!(game.favorites, None);
    }

    #[test]
    fn test_merge_nameless_candidate_gets_placeholder_name() {
        let candidates = vec![Candidate {
            universeId: 9,
            exploreName: None,
            explorePlaying: None,
            exploreVisits: None,
        }];
        let enriched = merge_enriched(&candidates, &HashMap::new(), &HashMap::new(), &[None]);
        assert_eq!(enriched[0].name, "Universe 9");
        assert_eq!(enriched[0].playing, None);
    }

    #[test]
    fn test_merge_detail_values_win_over_explore_values() {
        let candidates = vec![candidate(1)];
        let details: HashMap<i64, GameDetail> = [(1, detail(1))].into();
        let votes: HashMap<i64, GameVotes> = [(1, vote(1))].into();

        let enriched = merge_enriched(&candidates, &details, &votes, &[Some(777)]);
        let game = &enriched[0];
        assert_eq!(game.name, "Detail 1");
        assert_eq!(game.playing, Some(500));
        assert_eq!(game.visits, Some(2_000_000));
        assert_eq!(game.favorites, Some(777));
        assert_eq!(game.likeRatio, Some(0.8));
        assert_eq!(game.playing_compact.as_deref(), Some("500"));
        assert_eq!(game.visits_compact.as_deref(), Some("2M"));
    }

    #[test]
    fn test_merge_favorites_follow_input_positions() {
        let candidates = vec![candidate(1), candidate(2)];
        let enriched = merge_enriched(
            &candidates,
            &HashMap::new(),
            &HashMap::new(),
            &[Some(11), None],
        );
        assert_eq!(enriched[0].favorites, Some(11));
        assert_eq!(enriched[1].favorites, None);
    }
}
