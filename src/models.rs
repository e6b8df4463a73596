//! Data models for the weekly top-5 snapshot and its building blocks.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Candidate`]: A raw listing entry from the explore API, pre-enrichment
//! - [`EnrichedGame`]: One game with detail, vote, and favorite data merged in
//! - [`Article`]: A validated newspaper article, AI-written or fallback
//! - [`Snapshot`]: The persisted unit; one dated edition of the newspaper
//! - [`GameDelta`]: Read-time week-over-week metric deltas (never persisted)
//!
//! Most models use camelCase field names to match the JSON schema shared with
//! the LLM and the browser frontend, hence the `#[allow(non_snake_case)]`
//! attributes. The `*_compact` display fields are the exception; they stay
//! snake_case in the persisted JSON as well.

use serde::{Deserialize, Serialize};

use crate::utils::round6;

/// A raw candidate produced from the explore listing.
///
/// Candidates are transient: produced by candidate extraction, consumed by
/// enrichment, never persisted. The `explore*` fields carry whatever metrics
/// the listing itself exposed so enrichment can fall back on them when the
/// detail lookup omits a value.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The platform's stable identifier for the game/experience.
    pub universeId: i64,
    /// Display name as seen in the listing, if any.
    pub exploreName: Option<String>,
    /// Concurrent player count as seen in the listing, if any.
    pub explorePlaying: Option<i64>,
    /// Total visit count as seen in the listing, if any.
    pub exploreVisits: Option<i64>,
}

/// The creator of a game as reported by the games detail API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Creator {
    pub id: Option<i64>,
    pub name: Option<String>,
    /// "User" or "Group".
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// One game with detail, vote, and favorite data merged into a single record.
///
/// Every metric field is nullable: a failed or missing upstream lookup
/// degrades the affected field to `null` rather than failing the batch.
/// `likeRatio` is derived as `upVotes / (upVotes + downVotes)` rounded to six
/// decimal places, `null` when the denominator is zero; when present it is
/// always within `[0, 1]`. Records are created fresh each pipeline run and
/// never mutated afterwards.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedGame {
    pub universeId: i64,
    pub placeId: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub creator: Option<Creator>,
    pub playing: Option<i64>,
    pub visits: Option<i64>,
    pub favorites: Option<i64>,
    pub upVotes: Option<i64>,
    pub downVotes: Option<i64>,
    pub likeRatio: Option<f64>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub maxPlayers: Option<i64>,
    pub genre: Option<String>,
    pub playing_compact: Option<String>,
    pub visits_compact: Option<String>,
    pub favorites_compact: Option<String>,
}

/// Derive the like ratio from vote counts.
///
/// Returns `None` when either count is missing or the total is zero, so a
/// game with no votes reads as "no sentiment data" rather than 0%.
pub fn like_ratio(up_votes: Option<i64>, down_votes: Option<i64>) -> Option<f64> {
    let up = up_votes?;
    let down = down_votes?;
    let total = up + down;
    if total == 0 {
        return None;
    }
    Some(round6(up as f64 / total as f64))
}

/// A single section of an article body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleSection {
    pub heading: String,
    pub text: String,
}

/// A validated newspaper article for one game.
///
/// The shape is identical whether the article came from the LLM or from the
/// deterministic fallback writer; readers cannot tell the difference
/// structurally. `sections` always holds three or four entries.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub universeId: i64,
    pub gameName: String,
    pub title: String,
    pub deck: String,
    pub lede: String,
    pub sections: Vec<ArticleSection>,
    pub whyNow: String,
    pub numbers: Vec<String>,
    pub whatToDo: String,
}

/// Which ranking sort this edition was generated from.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotMeta {
    pub sortName: String,
    pub sortId: String,
}

/// One immutable, dated capture of the rankings plus generated articles.
///
/// Snapshots are written once under their dated key and never touched again;
/// `latest.json` is a mutable pointer rewritten with the same bytes each run.
/// The backend process exclusively owns snapshot files.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// ISO-8601 UTC timestamp of generation.
    pub generatedAt: String,
    pub meta: SnapshotMeta,
    /// Front-page headlines, at most three.
    pub headlines: Vec<String>,
    pub articles: Vec<Article>,
    pub top5: Vec<EnrichedGame>,
    pub top100: Vec<EnrichedGame>,
}

/// Week-over-week metric deltas for one top-5 game.
///
/// All fields are `null` when there is no prior edition or the game was not
/// ranked last week; "no prior data" is deliberately distinct from a zero
/// delta. `playingPct`/`favoritesPct` are `(cur - prev) / prev`, `null` when
/// the previous value is `null` or zero.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GameDelta {
    pub playing: Option<i64>,
    pub visits: Option<i64>,
    pub favorites: Option<i64>,
    pub likeRatio: Option<f64>,
    pub playingPct: Option<f64>,
    pub favoritesPct: Option<f64>,
    pub prevUpdated: Option<String>,
}

/// A top-5 game with its delta overlay attached, as served to the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct DeltaGame {
    #[serde(flatten)]
    pub game: EnrichedGame,
    pub delta: GameDelta,
}

/// The latest snapshot annotated with read-time deltas. Never persisted.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize)]
pub struct DeltaSnapshot {
    pub generatedAt: String,
    pub meta: SnapshotMeta,
    pub headlines: Vec<String>,
    pub articles: Vec<Article>,
    pub top5: Vec<DeltaGame>,
    pub top100: Vec<EnrichedGame>,
}


#[cfg(test)]
mod tests {
    use super::test_support::sample_game;
    use super::*;

    #[test]
    fn test_like_ratio_basic() {
        assert_eq!(like_ratio(Some(900), Some(100)), Some(0.9));
        assert_eq!(like_ratio(Some(1), Some(2)), Some(0.333333));
    }

    #[test]
    fn test_like_ratio_zero_denominator() {
        assert_eq!(like_ratio(Some(0), Some(0)), None);
    }

    #[test]
    fn test_like_ratio_missing_counts() {
        assert_eq!(like_ratio(None, Some(10)), None);
        assert_eq!(like_ratio(Some(10), None), None);
    }

    #[test]
    fn test_like_ratio_bounds() {
        for (up, down) in [(0, 1), (1, 0), (123, 456), (1_000_000, 1)] {
            let ratio = like_ratio(Some(up), Some(down)).unwrap();
            assert!((0.0..=1.0).contains(&ratio), "ratio {ratio} out of bounds");
        }
    }

    #[test]
    fn test_enriched_game_serializes_camel_case() {
        let json = serde_json::to_value(sample_game(42)).unwrap();
        assert_eq!(json["universeId"], 42);
        assert_eq!(json["placeId"], 420);
        assert_eq!(json["likeRatio"], 0.9);
        assert_eq!(json["playing_compact"], "1.2K");
        assert_eq!(json["creator"]["type"], "Group");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snapshot = Snapshot {
            generatedAt: "2024-01-01T16:00:00.000Z".to_string(),
            meta: SnapshotMeta {
                sortName: "Popular".to_string(),
                sortId: "popular-worldwide".to_string(),
            },
            headlines: vec!["Headline".to_string()],
            articles: vec![],
            top5: vec![sample_game(1)],
            top100: vec![sample_game(1), sample_game(2)],
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_delta_game_flattens_into_game_object() {
        let annotated = DeltaGame {
            game: sample_game(7),
            delta: GameDelta {
                playing: Some(20),
                playingPct: Some(0.2),
                ..GameDelta::default()
            },
        };

        let json = serde_json::to_value(&annotated).unwrap();
        assert_eq!(json["universeId"], 7);
        assert_eq!(json["delta"]["playing"], 20);
        assert_eq!(json["delta"]["visits"], serde_json::Value::Null);
    }
}
