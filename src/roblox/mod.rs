//! Roblox web API clients used to build the weekly snapshot.
//!
//! This module contains submodules for the public platform endpoints the
//! pipeline consumes. Each client takes a shared [`reqwest::Client`], returns
//! typed data where the upstream shape is stable, and falls back to
//! `serde_json::Value` plus shape probing where it is not.
//!
//! # Endpoints
//!
//! | Concern | Module | Endpoint | Notes |
//! |---------|--------|----------|-------|
//! | Sort discovery | [`explore`] | `apis.roblox.com/explore-api/v1/get-sorts` | Session-scoped |
//! | Sort content | [`explore`] | `apis.roblox.com/explore-api/v1/get-sort-content` | Loosely-typed payload |
//! | Game details | [`games`] | `games.roblox.com/v1/games` | Batched, ≤25 ids per call |
//! | Vote counts | [`games`] | `games.roblox.com/v1/games/votes` | Batched, ≤25 ids per call |
//! | Favorites count | [`games`] | `games.roblox.com/v1/games/{id}/favorites/count` | Per id |
//! | Game icons | [`thumbnails`] | `thumbnails.roblox.com/v1/games/icons` | Fixed size/format |
//!
//! # Common patterns
//!
//! - Non-2xx responses and malformed JSON surface as errors; callers decide
//!   whether that aborts the run (details, votes) or degrades a single field
//!   (favorites).
//! - The explore content payload has shipped its item array under several
//!   differently-named fields over time; [`explore::probe_items`] tries the
//!   known shapes in priority order and returns the first non-empty match.

pub mod explore;
pub mod games;
pub mod thumbnails;

/// Maximum number of universe ids a single batched call may carry.
pub const MAX_IDS_PER_CALL: usize = 25;
