//! LLM interaction for article generation.
//!
//! This module talks to an OpenAI-compatible chat-completions endpoint and
//! turns the response into a raw article bundle. It deliberately knows
//! nothing about validation or fallback; those live in the pipeline so they
//! are independent of the exact upstream model or prompt wording.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`ArticleGenerator`]: Core trait, `generate(facts) -> bundle | None`
//! - [`ChatCompletionsGenerator`]: The production implementation
//!
//! `Ok(None)` means "AI unavailable or unusable": transport failure, empty
//! response, unparseable JSON, or a response without an `articles` array. The
//! pipeline resolves every one of those through fallback articles; an AI
//! problem is never fatal to a refresh. There is deliberately no retry: a
//! failed run is simply retried at the next scheduled tick.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use url::Url;

use crate::models::{EnrichedGame, SnapshotMeta};
use crate::utils::{BoxError, truncate_chars, truncate_for_log};

/// Character budget for one game description inside the prompt.
const DESCRIPTION_CHAR_BUDGET: usize = 600;

/// How long to wait for the single generation request.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Writing and schema instructions sent as the system message.
///
/// The schema here must stay in sync with the validation rules in
/// `pipeline::articles`.
const SYSTEM_INSTRUCTIONS: &str = r#"당신은 로블록스 주간 신문의 편집장입니다. 이번 주 가장 인기 있는 게임 5개에 대한 한국어 신문 기사를 작성합니다.

Respond with a single JSON object and nothing else, with no prose and no code fences:
{
  "headlines": ["front page headline", "...", "..."],
  "articles": [
    {
      "universeId": 0,
      "gameName": "...",
      "title": "...",
      "deck": "...",
      "lede": "...",
      "sections": [{"heading": "...", "text": "..."}],
      "whyNow": "...",
      "numbers": ["..."],
      "whatToDo": "..."
    }
  ]
}

Rules:
- "articles" must contain exactly one entry per input game, in the same order, with the matching universeId.
- "headlines" holds at most 3 front-page headlines.
- "sections" must have 3 or 4 entries, each with both "heading" and "text".
- "numbers" is an array of short metric strings taken from the input data.
- Use only the facts provided in the user message. Never invent player counts, release dates, updates, or features.
- All reader-facing text is Korean, in a newspaper register."#;

/// A size-bounded projection of the top-5 games, sent to the LLM as JSON.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize)]
pub struct ArticleRequest {
    pub sortName: String,
    pub sortId: String,
    pub games: Vec<GameFacts>,
}

/// The slim per-game fact sheet inside an [`ArticleRequest`].
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize)]
pub struct GameFacts {
    pub universeId: i64,
    pub name: String,
    pub description: Option<String>,
    pub playing: Option<i64>,
    pub visits: Option<i64>,
    pub favorites: Option<i64>,
    pub upVotes: Option<i64>,
    pub downVotes: Option<i64>,
    pub likeRatio: Option<f64>,
    pub genre: Option<String>,
    pub maxPlayers: Option<i64>,
    pub updated: Option<String>,
}

impl ArticleRequest {
    /// Project the enriched top-5 into prompt facts, truncating descriptions
    /// to the character budget.
    pub fn new(meta: &SnapshotMeta, games: &[EnrichedGame]) -> Self {
        Self {
            sortName: meta.sortName.clone(),
            sortId: meta.sortId.clone(),
            games: games
                .iter()
                .map(|game| GameFacts {
                    universeId: game.universeId,
                    name: game.name.clone(),
                    description: game
                        .description
                        .as_deref()
                        .map(|d| truncate_chars(d, DESCRIPTION_CHAR_BUDGET)),
                    playing: game.playing,
                    visits: game.visits,
                    favorites: game.favorites,
                    upVotes: game.upVotes,
                    downVotes: game.downVotes,
                    likeRatio: game.likeRatio,
                    genre: game.genre.clone(),
                    maxPlayers: game.maxPlayers,
                    updated: game.updated.clone(),
                })
                .collect(),
        }
    }
}

/// A parsed-but-unvalidated article bundle returned by a generator.
///
/// Entries are raw JSON values; field-by-field validation happens in
/// `pipeline::articles`.
#[derive(Debug, Clone, Default)]
pub struct GeneratedBundle {
    pub headlines: Vec<Value>,
    pub articles: Vec<Value>,
}

/// Trait for async article generation.
///
/// Implementors send the fact sheet to a generative text service and return
/// the raw bundle, or `None` when the service produced nothing usable.
pub trait ArticleGenerator {
    async fn generate(&self, request: &ArticleRequest) -> Result<Option<GeneratedBundle>, BoxError>;
}

/// Production generator backed by an OpenAI-compatible chat-completions
/// endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsGenerator {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionsGenerator {
    /// Build a generator for `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// The generator owns its own HTTP client with a generation-sized
    /// timeout, separate from the short-timeout client used for platform
    /// calls.
    pub fn new(base_url: &str, api_key: Option<String>, model: &str) -> Result<Self, BoxError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let client = Client::builder().timeout(GENERATION_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&normalized)?,
            api_key,
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> Result<Url, BoxError> {
        Ok(self.base_url.join("chat/completions")?)
    }
}

impl ArticleGenerator for ChatCompletionsGenerator {
    /// Send one generation request. No retry; any failure resolves to
    /// `Ok(None)` and the caller falls back.
    #[instrument(level = "info", skip_all, fields(model = %self.model, games = request.games.len()))]
    async fn generate(&self, request: &ArticleRequest) -> Result<Option<GeneratedBundle>, BoxError> {
        let t0 = Instant::now();
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_INSTRUCTIONS},
                {"role": "user", "content": serde_json::to_string(request)?},
            ],
            "temperature": 0.7,
            "response_format": {"type": "json_object"},
        });

        let mut http_request = self.client.post(self.endpoint()?).json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = match http_request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, elapsed_ms = t0.elapsed().as_millis() as u64, "Generation request failed");
                return Ok(None);
            }
        };

        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Generation endpoint returned an error status");
                return Ok(None);
            }
        };

        let chat: ChatResponse = match response.json().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Generation response body was not valid JSON");
                return Ok(None);
            }
        };

        let choice = chat.choices.into_iter().next();
        let finish_reason = choice
            .as_ref()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let text = choice
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            warn!(
                status = %finish_reason,
                usage = %chat.usage.map(|u| u.to_string()).unwrap_or_else(|| "null".to_string()),
                "Generation returned empty text"
            );
            return Ok(None);
        }

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = text.len(),
            status = %finish_reason,
            "Generation completed"
        );

        match parse_bundle(&text) {
            Some(bundle) => Ok(Some(bundle)),
            None => {
                warn!(
                    response_preview = %truncate_for_log(&text, 300),
                    "Model returned non-conforming JSON"
                );
                Ok(None)
            }
        }
    }
}

/// Parse raw model text into a [`GeneratedBundle`].
///
/// Returns `None` on a parse failure or when the payload has no `articles`
/// array; both count as total AI failure.
pub fn parse_bundle(text: &str) -> Option<GeneratedBundle> {
    let payload: Value = serde_json::from_str(text.trim()).ok()?;
    let articles = payload.get("articles")?.as_array()?.clone();
    let headlines = payload
        .get("headlines")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Some(GeneratedBundle { headlines, articles })
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
