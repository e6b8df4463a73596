//! Article validation and fallback assembly.
//!
//! A generated bundle is accepted only when every article survives
//! field-by-field validation **and** the surviving set covers all five input
//! games. Partial coverage discards the whole bundle: one edition never
//! mixes the model's voice with the fallback writer's. Fallback articles are
//! built deterministically from enriched data alone and satisfy the same
//! shape rules as validated AI articles.

use serde_json::Value;
use tracing::{info, warn};

use crate::ai::GeneratedBundle;
use crate::models::{Article, ArticleSection, EnrichedGame};
use crate::utils::truncate_chars;

/// Maximum number of front-page headlines.
const MAX_HEADLINES: usize = 3;

/// Placeholder used where a game has no description.
const NO_DESCRIPTION: &str = "설명이 없습니다.";

/// Placeholder for a null metric inside the numbers list.
const NULL_METRIC: &str = "—";

/// Resolve the final headlines and articles for an edition.
///
/// Uses the AI bundle when it validates completely; otherwise falls back for
/// all five games.
pub fn resolve_articles(
    bundle: Option<GeneratedBundle>,
    top5: &[EnrichedGame],
) -> (Vec<String>, Vec<Article>) {
    let expected_ids: Vec<i64> = top5.iter().map(|g| g.universeId).collect();

    if let Some(bundle) = bundle {
        match validate_bundle(&bundle, &expected_ids) {
            Some((headlines, articles)) => {
                info!(articles = articles.len(), "Using AI-generated articles");
                let headlines = if headlines.is_empty() {
                    fallback_headlines(top5)
                } else {
                    headlines
                };
                return (headlines, articles);
            }
            None => {
                warn!("AI bundle rejected by validation; using fallback articles for all games");
            }
        }
    }

    (
        fallback_headlines(top5),
        top5.iter().map(fallback_article).collect(),
    )
}

/// Validate a generated bundle against the expected universe ids.
///
/// Returns the headlines (possibly empty) and the validated articles in
/// expected-id order, or `None` when any expected id is left uncovered.
pub fn validate_bundle(
    bundle: &GeneratedBundle,
    expected_ids: &[i64],
) -> Option<(Vec<String>, Vec<Article>)> {
    let validated: Vec<Article> = bundle
        .articles
        .iter()
        .filter_map(validate_article)
        .collect();

    let mut ordered = Vec::with_capacity(expected_ids.len());
    for id in expected_ids {
        let article = validated.iter().find(|a| a.universeId == *id)?;
        ordered.push(article.clone());
    }

    let headlines: Vec<String> = bundle
        .headlines
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .take(MAX_HEADLINES)
        .collect();

    Some((headlines, ordered))
}

/// Validate a single raw article value.
///
/// Required string fields must be present and non-empty, `sections` must
/// hold 3 or 4 entries each with `heading` and `text`, and `numbers` must be an
/// array. Any failed check drops the article.
pub fn validate_article(value: &Value) -> Option<Article> {
    let universe_id = value.get("universeId").and_then(Value::as_i64)?;
    let game_name = required_str(value, "gameName")?;
    let title = required_str(value, "title")?;
    let deck = required_str(value, "deck")?;
    let lede = required_str(value, "lede")?;
    let why_now = required_str(value, "whyNow")?;
    let what_to_do = required_str(value, "whatToDo")?;

    let sections = value.get("sections")?.as_array()?;
    if !(3..=4).contains(&sections.len()) {
        return None;
    }
    let sections: Vec<ArticleSection> = sections
        .iter()
        .map(|section| {
            Some(ArticleSection {
                heading: required_str(section, "heading")?,
                text: required_str(section, "text")?,
            })
        })
        .collect::<Option<_>>()?;

    let numbers: Vec<String> = value
        .get("numbers")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    Some(Article {
        universeId: universe_id,
        gameName: game_name,
        title,
        deck,
        lede,
        sections,
        whyNow: why_now,
        numbers,
        whatToDo: what_to_do,
    })
}

fn required_str(value: &Value, key: &str) -> Option<String> {
    let s = value.get(key)?.as_str()?;
    if s.trim().is_empty() {
        return None;
    }
    Some(s.to_string())
}

/// Build a deterministic article from enriched data alone.
///
/// Valid for any game, including one with no description at all.
pub fn fallback_article(game: &EnrichedGame) -> Article {
    let description = game
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_DESCRIPTION);

    let numbers_text = format!(
        "현재 동시 접속자는 {}명, 누적 방문은 {}회, 즐겨찾기는 {}개입니다. 좋아요 비율은 {}입니다.",
        fmt_count(game.playing),
        fmt_count(game.visits),
        fmt_count(game.favorites),
        fmt_ratio(game.likeRatio),
    );

    Article {
        universeId: game.universeId,
        gameName: game.name.clone(),
        title: game.name.clone(),
        deck: truncate_chars(description, 120),
        lede: truncate_chars(description, 200),
        sections: vec![
            ArticleSection {
                heading: "게임 소개".to_string(),
                text: truncate_chars(description, 400),
            },
            ArticleSection {
                heading: "플레이 포인트".to_string(),
                text: format!(
                    "{} 안에서 무엇이 재미있는지 직접 확인해 보세요. 친구와 함께 접속하면 더 좋습니다.",
                    game.name
                ),
            },
            ArticleSection {
                heading: "숫자로 보기".to_string(),
                text: numbers_text,
            },
        ],
        whyNow: format!("{}이(가) 이번 주 인기 순위 상위권에 올랐습니다.", game.name),
        numbers: vec![
            format!("동시 접속 {}", fmt_count(game.playing)),
            format!("누적 방문 {}", fmt_count(game.visits)),
            format!("즐겨찾기 {}", fmt_count(game.favorites)),
            format!("좋아요 {}", fmt_count(game.upVotes)),
            format!("싫어요 {}", fmt_count(game.downVotes)),
            format!("좋아요 비율 {}", fmt_ratio(game.likeRatio)),
        ],
        whatToDo: "로블록스에서 게임 이름을 검색하면 바로 플레이할 수 있습니다.".to_string(),
    }
}

/// Deterministic front-page headlines from the top game names.
pub fn fallback_headlines(top5: &[EnrichedGame]) -> Vec<String> {
    top5.iter()
        .take(MAX_HEADLINES)
        .enumerate()
        .map(|(rank, game)| format!("이번 주 {}위, {}", rank + 1, game.name))
        .collect()
}

fn fmt_count(value: Option<i64>) -> String {
    value.map_or_else(|| NULL_METRIC.to_string(), |v| v.to_string())
}

fn fmt_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| NULL_METRIC.to_string(), |v| format!("{:.1}%", v * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::sample_game;
    use serde_json::json;

    fn valid_article_value(universe_id: i64) -> Value {
        json!({
            "universeId": universe_id,
            "gameName": format!("Game {universe_id}"),
            "title": "큰 제목",
            "deck": "부제목",
            "lede": "리드 문장",
            "sections": [
                {"heading": "h1", "text": "t1"},
                {"heading": "h2", "text": "t2"},
                {"heading": "h3", "text": "t3"},
            ],
            "whyNow": "이번 주 이유",
            "numbers": ["동시 접속 1200"],
            "whatToDo": "플레이 방법",
        })
    }

    fn bundle(ids: &[i64]) -> GeneratedBundle {
        GeneratedBundle {
            headlines: vec![json!("머리기사 1"), json!("머리기사 2")],
            articles: ids.iter().map(|id| valid_article_value(*id)).collect(),
        }
    }

    #[test]
    fn test_validate_article_happy_path() {
        let article = validate_article(&valid_article_value(1)).unwrap();
        assert_eq!(article.universeId, 1);
        assert_eq!(article.sections.len(), 3);
        assert_eq!(article.numbers, ["동시 접속 1200"]);
    }

    #[test]
    fn test_validate_article_rejects_missing_fields() {
        for key in ["gameName", "title", "deck", "lede", "whyNow", "whatToDo", "numbers"] {
            let mut value = valid_article_value(1);
            value.as_object_mut().unwrap().remove(key);
            assert!(validate_article(&value).is_none(), "missing {key} accepted");
        }
    }

    #[test]
    fn test_validate_article_rejects_bad_section_counts() {
        for count in [0, 2, 5] {
            let mut value = valid_article_value(1);
            let sections: Vec<Value> = (0..count)
                .map(|i| json!({"heading": format!("h{i}"), "text": "t"}))
                .collect();
            value["sections"] = json!(sections);
            assert!(validate_article(&value).is_none(), "{count} sections accepted");
        }

        let mut value = valid_article_value(1);
        value["sections"] = json!([
            {"heading": "h1", "text": "t1"},
            {"heading": "h2", "text": "t2"},
            {"heading": "h3", "text": "t3"},
            {"heading": "h4", "text": "t4"},
        ]);
        assert!(validate_article(&value).is_some());
    }

    #[test]
    fn test_validate_article_rejects_section_without_text() {
        let mut value = valid_article_value(1);
        value["sections"][1] = json!({"heading": "only heading"});
        assert!(validate_article(&value).is_none());
    }

    #[test]
    fn test_validate_bundle_orders_by_expected_ids() {
        let (_, articles) = validate_bundle(&bundle(&[3, 1, 2]), &[1, 2, 3]).unwrap();
        let ids: Vec<_> = articles.iter().map(|a| a.universeId).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn test_validate_bundle_partial_coverage_is_rejected() {
        // 4 of 5 covered: the whole bundle must be discarded
        assert!(validate_bundle(&bundle(&[1, 2, 3, 4]), &[1, 2, 3, 4, 5]).is_none());
    }

    #[test]
    fn test_validate_bundle_caps_headlines_at_three() {
        let mut b = bundle(&[1]);
        b.headlines = vec![json!("a"), json!("b"), json!("c"), json!("d"), json!(5)];
        let (headlines, _) = validate_bundle(&b, &[1]).unwrap();
        assert_eq!(headlines, ["a", "b", "c"]);
    }

    #[test]
    fn test_resolve_articles_all_or_nothing() {
        let top5: Vec<_> = (1..=5).map(sample_game).collect();
        let partial = bundle(&[1, 2, 3, 4]);

        let (_, articles) = resolve_articles(Some(partial), &top5);
        assert_eq!(articles.len(), 5);
        // every article is a fallback article, not a mix
        for article in &articles {
            assert_eq!(article.sections[0].heading, "게임 소개");
        }
    }

    #[test]
    fn test_resolve_articles_uses_valid_bundle() {
        let top5: Vec<_> = (1..=5).map(sample_game).collect();
        let (headlines, articles) = resolve_articles(Some(bundle(&[1, 2, 3, 4, 5])), &top5);
        assert_eq!(headlines, ["머리기사 1", "머리기사 2"]);
        assert_eq!(articles[0].title, "큰 제목");
    }

    #[test]
    fn test_resolve_articles_without_bundle_falls_back() {
        let top5: Vec<_> = (1..=5).map(sample_game).collect();
        let (headlines, articles) = resolve_articles(None, &top5);
        assert_eq!(headlines.len(), 3);
        assert_eq!(articles.len(), 5);
        assert_eq!(articles[0].gameName, "Game 1");
    }

    #[test]
    fn test_fallback_article_without_description() {
        let mut game = sample_game(1);
        game.description = None;

        let article = fallback_article(&game);
        assert_eq!(article.deck, NO_DESCRIPTION);
        assert_eq!(article.lede, NO_DESCRIPTION);
        assert_eq!(article.sections[0].text, NO_DESCRIPTION);
        assert_eq!(article.sections.len(), 3);
    }

    #[test]
    fn test_fallback_article_numbers_use_placeholder_for_nulls() {
        let mut game = sample_game(1);
        game.playing = None;
        game.likeRatio = None;

        let article = fallback_article(&game);
        assert_eq!(article.numbers.len(), 6);
        assert_eq!(article.numbers[0], "동시 접속 —");
        assert_eq!(article.numbers[5], "좋아요 비율 —");
        assert_eq!(article.numbers[1], "누적 방문 3400000");
    }

    #[test]
    fn test_fallback_article_formats_like_ratio_as_percent() {
        let article = fallback_article(&sample_game(1));
        assert_eq!(article.numbers[5], "좋아요 비율 90.0%");
    }

    #[test]
    fn test_fallback_headlines_cap_and_rank() {
        let top5: Vec<_> = (1..=5).map(sample_game).collect();
        let headlines = fallback_headlines(&top5);
        assert_eq!(headlines.len(), 3);
        assert_eq!(headlines[0], "이번 주 1위, Game 1");
        assert_eq!(headlines[2], "이번 주 3위, Game 3");
    }
}
