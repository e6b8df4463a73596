//! Sort discovery: find a ranking sort that actually yields games.
//!
//! Sorts are ranked by how promising their name is (anything "popular"
//! first, then "trending", then "top", then the rest) and probed in that
//! order. The first sort whose content listing returns a non-empty,
//! non-filters item list wins. Probing is capped to bound worst-case
//! latency; a sort whose content call errors is skipped, not fatal. No
//! usable sort at all fails the whole pipeline run.

use reqwest::Client;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::models::SnapshotMeta;
use crate::roblox::explore;
use crate::utils::BoxError;

/// Upper bound on how many sorts one discovery pass will probe.
const MAX_SORTS_TRIED: usize = 30;

/// A usable sort together with the listing items its content call returned.
#[derive(Debug)]
pub struct DiscoveredSort {
    pub meta: SnapshotMeta,
    pub items: Vec<Value>,
}

/// Priority tier for a sort name; lower probes earlier.
pub fn priority(name: &str) -> u8 {
    let lower = name.to_lowercase();
    if lower.contains("popular") {
        0
    } else if lower.contains("trending") {
        1
    } else if lower.contains("top") {
        2
    } else {
        3
    }
}

/// Order sorts by name priority, keeping the platform's order within a tier.
pub fn rank_sorts(mut sorts: Vec<Value>) -> Vec<Value> {
    sorts.sort_by_key(|sort| explore::sort_name(sort).map_or(u8::MAX, priority));
    sorts
}

/// Find the first sort whose content listing yields games.
///
/// # Errors
///
/// Fails when the sorts call itself fails, or when none of the probed sorts
/// yields items. In either case no snapshot is produced this cycle.
#[instrument(level = "info", skip(client))]
pub async fn discover_sort(client: &Client, session_id: &str) -> Result<DiscoveredSort, BoxError> {
    let sorts = explore::fetch_sorts(client, session_id).await?;
    let ranked = rank_sorts(sorts);

    for sort in ranked.iter().take(MAX_SORTS_TRIED) {
        let Some(id) = explore::sort_id(sort) else {
            continue;
        };
        let name = explore::sort_name(sort).unwrap_or(id.as_str()).to_string();

        let content = match explore::fetch_sort_content(client, session_id, &id).await {
            Ok(content) => content,
            Err(e) => {
                warn!(sort = %name, error = %e, "Sort content call failed; skipping sort");
                continue;
            }
        };

        if let Some((shape, items)) = explore::probe_items(&content) {
            info!(sort = %name, shape, count = items.len(), "Discovered usable sort");
            return Ok(DiscoveredSort {
                meta: SnapshotMeta {
                    sortName: name,
                    sortId: id,
                },
                items,
            });
        }
    }

    Err("no usable sort: none of the probed sorts yielded items".into())
}
