//! Thumbnails API client: batched game icon lookups.
//!
//! The response body is passed through to the browser untouched, so this
//! client returns a raw [`serde_json::Value`] rather than a typed shape.

use reqwest::Client;
use serde_json::Value;
use tracing::instrument;

use crate::utils::BoxError;

const GAME_ICONS_URL: &str = "https://thumbnails.roblox.com/v1/games/icons";

/// Fetch game icons for a comma-separated universe id list.
///
/// Size and format are fixed; the frontend relies on the exact upstream JSON
/// shape coming back unchanged.
#[instrument(level = "debug", skip(client))]
pub async fn fetch_game_icons(client: &Client, universe_ids_csv: &str) -> Result<Value, BoxError> {
    let payload = client
        .get(GAME_ICONS_URL)
        .query(&[
            ("universeIds", universe_ids_csv),
            ("size", "256x256"),
            ("format", "Png"),
            ("defaults", "true"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(payload)
}
