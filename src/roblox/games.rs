//! Games API client: batched detail and vote lookups, per-id favorites.
//!
//! Detail and vote lookups accept up to [`MAX_IDS_PER_CALL`] universe ids per
//! request; larger id sets are chunked and the chunks fetched concurrently.
//! Results come back keyed by universe id so enrichment can merge them
//! without caring about upstream ordering.

use futures::future::try_join_all;
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, instrument};

use super::MAX_IDS_PER_CALL;
use crate::models::Creator;
use crate::utils::BoxError;

const GAMES_URL: &str = "https://games.roblox.com/v1/games";
const VOTES_URL: &str = "https://games.roblox.com/v1/games/votes";

/// One row of the batched game-details response.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Deserialize)]
pub struct GameDetail {
    pub id: i64,
    pub rootPlaceId: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub creator: Option<Creator>,
    pub playing: Option<i64>,
    pub visits: Option<i64>,
    pub maxPlayers: Option<i64>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub genre: Option<String>,
}

/// One row of the batched vote-counts response.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Deserialize)]
pub struct GameVotes {
    pub id: i64,
    pub upVotes: Option<i64>,
    pub downVotes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DataPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Fetch game details for a set of universe ids, keyed by id.
///
/// Ids are chunked to the per-call limit; chunks are requested concurrently.
/// A non-2xx response or malformed JSON from any chunk fails the whole
/// lookup.
#[instrument(level = "info", skip_all, fields(ids = ids.len()))]
pub async fn fetch_details(
    client: &Client,
    ids: &[i64],
) -> Result<HashMap<i64, GameDetail>, BoxError> {
    let pages = try_join_all(
        ids.chunks(MAX_IDS_PER_CALL)
            .map(|chunk| fetch_page::<GameDetail>(client, GAMES_URL, chunk)),
    )
    .await?;

    let details: HashMap<i64, GameDetail> = pages
        .into_iter()
        .flat_map(|page| page.data)
        .map(|detail| (detail.id, detail))
        .collect();

    info!(count = details.len(), "Fetched game details");
    Ok(details)
}

/// Fetch vote counts for a set of universe ids, keyed by id.
#[instrument(level = "info", skip_all, fields(ids = ids.len()))]
pub async fn fetch_votes(client: &Client, ids: &[i64]) -> Result<HashMap<i64, GameVotes>, BoxError> {
    let pages = try_join_all(
        ids.chunks(MAX_IDS_PER_CALL)
            .map(|chunk| fetch_page::<GameVotes>(client, VOTES_URL, chunk)),
    )
    .await?;

    let votes: HashMap<i64, GameVotes> = pages
        .into_iter()
        .flat_map(|page| page.data)
        .map(|row| (row.id, row))
        .collect();

    info!(count = votes.len(), "Fetched vote counts");
    Ok(votes)
}

async fn fetch_page<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    chunk: &[i64],
) -> Result<DataPage<T>, BoxError> {
    let csv = chunk.iter().join(",");
    let page = client
        .get(url)
        .query(&[("universeIds", csv.as_str())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(page)
}

/// Fetch the favorites count for a single universe id.
///
/// Callers treat a failure here as a degraded field, not a fatal error.
#[instrument(level = "debug", skip(client))]
pub async fn fetch_favorites_count(client: &Client, universe_id: i64) -> Result<i64, BoxError> {
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct FavoritesCount {
        favoritesCount: i64,
    }

    let url = format!("https://games.roblox.com/v1/games/{universe_id}/favorites/count");
    let payload: FavoritesCount = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(payload.favoritesCount)
}
