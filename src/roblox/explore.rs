//! Explore API client: sort discovery and sort content listings.
//!
//! The explore API is the loosest surface the pipeline touches. Sort objects
//! and content payloads are parsed as raw [`serde_json::Value`]s and read
//! through small probing helpers, because the platform has renamed these
//! fields more than once. The probes are ordered; the first matching shape
//! wins.

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::models::Candidate;
use crate::utils::BoxError;

const GET_SORTS_URL: &str = "https://apis.roblox.com/explore-api/v1/get-sorts";
const GET_SORT_CONTENT_URL: &str = "https://apis.roblox.com/explore-api/v1/get-sort-content";

/// Field names under which a content payload may carry its item array,
/// in probe order.
const ITEM_SHAPES: [&str; 4] = ["games", "items", "data", "entries"];

/// Fetch the list of ranking sorts for a session.
///
/// Returns the raw sort objects; use [`sort_name`] and [`sort_id`] to read
/// them.
#[instrument(level = "info", skip(client))]
pub async fn fetch_sorts(client: &Client, session_id: &str) -> Result<Vec<Value>, BoxError> {
    let payload: Value = client
        .get(GET_SORTS_URL)
        .query(&[("sessionId", session_id)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let sorts = payload
        .get("sorts")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    info!(count = sorts.len(), "Fetched explore sorts");
    Ok(sorts)
}

/// Fetch the content listing for a single sort.
#[instrument(level = "info", skip(client), fields(%sort_id))]
pub async fn fetch_sort_content(
    client: &Client,
    session_id: &str,
    sort_id: &str,
) -> Result<Value, BoxError> {
    let payload: Value = client
        .get(GET_SORT_CONTENT_URL)
        .query(&[("sessionId", session_id), ("sortId", sort_id)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(payload)
}

/// Read a sort object's display name, probing the known field spellings.
pub fn sort_name(sort: &Value) -> Option<&str> {
    ["sortDisplayName", "topic", "name"]
        .iter()
        .find_map(|key| sort.get(key).and_then(Value::as_str))
}

/// Read a sort object's identifier, probing the known field spellings.
///
/// Ids have shipped both as strings and as numbers; either is normalized to
/// a string.
pub fn sort_id(sort: &Value) -> Option<String> {
    ["sortId", "topicId", "id"].iter().find_map(|key| {
        let v = sort.get(key)?;
        match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}

/// Probe a content payload for its item array.
///
/// Tries the known shapes in priority order and returns the matched field
/// name plus the items of the first non-empty array. A payload whose
/// `contentType` is `"Filters"` carries filter chips rather than games and
/// never matches.
pub fn probe_items(payload: &Value) -> Option<(&'static str, Vec<Value>)> {
    if let Some(kind) = payload.get("contentType").and_then(Value::as_str) {
        if kind.eq_ignore_ascii_case("filters") {
            return None;
        }
    }

    for shape in ITEM_SHAPES {
        if let Some(items) = payload.get(shape).and_then(Value::as_array) {
            if !items.is_empty() {
                debug!(shape, count = items.len(), "Matched content item shape");
                return Some((shape, items.clone()));
            }
        }
    }
    None
}

/// Turn raw listing items into uniform candidates.
///
/// Items without a resolvable universe id are dropped. Listing-side metrics
/// are carried along so enrichment can fall back on them.
pub fn extract_candidates(items: &[Value]) -> Vec<Candidate> {
    items
        .iter()
        .filter_map(|item| {
            let universe_id = item_universe_id(item)?;
            Some(Candidate {
                universeId: universe_id,
                exploreName: item_str(item, &["name", "title", "displayName"]),
                explorePlaying: item_count(item, &["playerCount", "playing"]),
                exploreVisits: item_count(item, &["totalVisits", "visitCount", "visits"]),
            })
        })
        .collect()
}

fn item_universe_id(item: &Value) -> Option<i64> {
    ["universeId", "id"].iter().find_map(|key| {
        let v = item.get(key)?;
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
    })
}

fn item_str(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| item.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn item_count(item: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| item.get(key).and_then(Value::as_i64))
}
