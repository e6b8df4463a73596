//! Command-line interface definitions for the weekly top-5 service.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets and endpoint configuration can be provided via environment
//! variables instead of flags.

use clap::Parser;

/// Command-line arguments for the weekly top-5 service.
///
/// # Examples
///
/// ```sh
/// # Basic usage with defaults
/// roblox_top5_news --snapshots-dir ./snapshots
///
/// # Self-hosted OpenAI-compatible endpoint
/// AI_BASE_URL=http://localhost:8000/v1 AI_MODEL=qwen2.5 roblox_top5_news -s ./snapshots
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory for dated snapshot files and latest.json
    #[arg(short, long, default_value = "./snapshots")]
    pub snapshots_dir: String,

    /// Address to bind the API server
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Base URL of the OpenAI-compatible chat-completions endpoint
    #[arg(long, env = "AI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub ai_base_url: String,

    /// API key for the generation endpoint (optional for self-hosted endpoints)
    #[arg(long, env = "AI_API_KEY")]
    pub ai_api_key: Option<String>,

    /// Model name for article generation
    #[arg(long, env = "AI_MODEL", default_value = "gpt-4o-mini")]
    pub ai_model: String,

    /// Worker-pool size for per-game favorites lookups
    #[arg(long, default_value_t = 4)]
    pub fav_concurrency: usize,

    /// Skip the eager snapshot refresh at startup
    #[arg(long, default_value_t = false)]
    pub skip_initial_refresh: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["roblox_top5_news"]);
        assert_eq!(cli.snapshots_dir, "./snapshots");
        assert_eq!(cli.bind, "0.0.0.0:8080");
        assert_eq!(cli.fav_concurrency, 4);
        assert!(!cli.skip_initial_refresh);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["roblox_top5_news", "-s", "/tmp/snaps", "-b", "127.0.0.1:3000"]);
        assert_eq!(cli.snapshots_dir, "/tmp/snaps");
        assert_eq!(cli.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_cli_fav_concurrency_flag() {
        let cli = Cli::parse_from(["roblox_top5_news", "--fav-concurrency", "8"]);
        assert_eq!(cli.fav_concurrency, 8);
    }
}
