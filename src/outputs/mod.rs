//! Snapshot persistence.
//!
//! # Submodules
//!
//! - [`json`]: Writes each edition to a dated, immutable snapshot file and
//!   maintains the mutable `latest.json` pointer; also reads snapshots back
//!   for the API and for delta computation
//!
//! # File layout
//!
//! ```text
//! snapshots_dir/
//! ├── roblox_top5_2024-01-02.json   # one per generation day (UTC+9 calendar date)
//! ├── roblox_top5_2024-01-09.json
//! └── latest.json                   # always the most recent content
//! ```

pub mod json;
