//! Pain Analyzer (C5): prompts the LLM client with a fixed template, parses
//! its structured reply into a [`PainScore`], and repairs missing sentiment
//! fields. Fails open: any transport or parse failure yields a zero-score
//! `PainScore` carrying the error in `reasoning`, never a propagated error.
//! Also stamps the legacy `engagement_score`/`recency_score`/`composite_value`
//! fields so the orchestrator can sort by `composite_value` for backward
//! compatibility (spec.md §4.7, §5).
//!
//! Grounded on `original_source/copilot/modules/discovery.py`:
//! `analyze_pain_intensity` for the prompt/repair shape, `discover`'s
//! composite-metric block for the legacy fields.

use std::sync::Arc;

use common_types::{PainScore, Post};
use llm_orchestrator::LlmClient;
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You are an expert product researcher specializing in \
identifying high-signal founder opportunities from social signals. You output strictly \
valid JSON.";

const MAX_BODY_CHARS: usize = 2000;

/// Fixed table used to backfill `sentiment_intensity` when only a label was
/// returned. Order matches the thresholds used to go the other direction.
fn sentiment_intensity_for_label(label: &str) -> f64 {
    match label {
        "frustrated" => 0.7,
        "desperate" => 1.0,
        "curious" => 0.4,
        "neutral" => 0.2,
        "positive" => 0.1,
        _ => 0.0,
    }
}

fn sentiment_label_for_intensity(intensity: f64) -> &'static str {
    if intensity >= 0.8 {
        "desperate"
    } else if intensity >= 0.6 {
        "frustrated"
    } else if intensity >= 0.4 {
        "curious"
    } else {
        "neutral"
    }
}

#[derive(Debug, Deserialize)]
struct RawReply {
    score: f64,
    reasoning: String,
    #[serde(default)]
    detected_problems: Vec<String>,
    #[serde(default)]
    suggested_solutions: Vec<String>,
    #[serde(default)]
    validation_score: f64,
    sentiment_label: Option<String>,
    #[serde(default)]
    sentiment_intensity: f64,
}

pub struct PainAnalyzer {
    llm: Arc<LlmClient>,
}

impl PainAnalyzer {
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self { llm }
    }

    fn build_prompt(post: &Post) -> String {
        let body = post
            .body
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(MAX_BODY_CHARS)
            .collect::<String>();

        format!(
            "Analyze this post for founder-relevant pain signals.\n\n\
             Title: {title}\n\
             Body: {body}\n\n\
             Respond with a JSON object with exactly these fields:\n\
             {{\n  \
               \"score\": <0.0-1.0 pain intensity>,\n  \
               \"reasoning\": <short justification>,\n  \
               \"detected_problems\": [<string>...],\n  \
               \"suggested_solutions\": [<string>...],\n  \
               \"validation_score\": <0.0-1.0>,\n  \
               \"sentiment_label\": <one of frustrated, desperate, curious, neutral, positive, or null>,\n  \
               \"sentiment_intensity\": <0.0-1.0>\n\
             }}",
            title = post.title,
        )
    }

    /// Apply the post-parse repair rules, in order:
    /// 1. intensity known, label missing → derive label from thresholds.
    /// 2. label known, intensity zero → derive intensity from the fixed table.
    fn repair_sentiment(score: &mut PainScore) {
        if score.sentiment_intensity > 0.0 && score.sentiment_label.is_none() {
            score.sentiment_label =
                Some(sentiment_label_for_intensity(score.sentiment_intensity).to_string());
        } else if let Some(label) = score.sentiment_label.as_deref() {
            if score.sentiment_intensity == 0.0 {
                score.sentiment_intensity = sentiment_intensity_for_label(label);
            }
        }
    }

    pub async fn analyze(&self, post: &Post) -> PainScore {
        let prompt = Self::build_prompt(post);

        let reply = match self
            .llm
            .complete(&prompt, Some(SYSTEM_PROMPT), Some("json_object"), None, None)
            .await
        {
            Ok(reply) => reply,
            Err(e) => return PainScore::failed(e),
        };

        let raw: RawReply = match serde_json::from_str(&reply) {
            Ok(raw) => raw,
            Err(e) => return PainScore::failed(e),
        };

        let pain_score = raw.score.clamp(0.0, 1.0);
        let validation_score = raw.validation_score.clamp(0.0, 1.0);
        let now = chrono::Utc::now();
        let engagement_score = scoring_engine::calculate_legacy_engagement_score(post);
        let recency_score = scoring_engine::calculate_recency_score(post.created_at, now);
        let composite_value =
            scoring_engine::calculate_composite_value(post, pain_score, validation_score, now);

        let mut score = PainScore {
            score: pain_score,
            reasoning: raw.reasoning,
            detected_problems: raw.detected_problems,
            suggested_solutions: raw.suggested_solutions,
            engagement_score,
            validation_score,
            recency_score,
            composite_value,
            sentiment_label: raw.sentiment_label,
            sentiment_intensity: raw.sentiment_intensity.clamp(0.0, 1.0),
        };
        Self::repair_sentiment(&mut score);
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_post() -> Post {
        Post {
            id: "forum_1".into(),
            source: "discussion-forum".into(),
            title: "Why is there no good tool for X".into(),
            body: Some("I've tried everything".into()),
            author: "a".into(),
            url: "https://example.com".into(),
            upvotes: 10,
            comments_count: 2,
            created_at: chrono::Utc::now(),
            channel: None,
            subreddit: None,
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn backfills_label_from_intensity() {
        let llm = Arc::new(LlmClient::mock(
            r#"{"score":0.7,"reasoning":"x","validation_score":0.5,"sentiment_intensity":0.85}"#,
            Duration::from_millis(0),
        ));
        let analyzer = PainAnalyzer::new(llm);
        let score = analyzer.analyze(&sample_post()).await;
        assert_eq!(score.sentiment_label.as_deref(), Some("desperate"));
    }

    #[tokio::test]
    async fn backfills_intensity_from_label() {
        let llm = Arc::new(LlmClient::mock(
            r#"{"score":0.4,"reasoning":"x","validation_score":0.2,"sentiment_label":"curious"}"#,
            Duration::from_millis(0),
        ));
        let analyzer = PainAnalyzer::new(llm);
        let score = analyzer.analyze(&sample_post()).await;
        assert_eq!(score.sentiment_intensity, 0.4);
    }

    #[tokio::test]
    async fn stamps_legacy_composite_value() {
        let llm = Arc::new(LlmClient::mock(
            r#"{"score":0.8,"reasoning":"x","validation_score":0.6}"#,
            Duration::from_millis(0),
        ));
        let analyzer = PainAnalyzer::new(llm);
        let score = analyzer.analyze(&sample_post()).await;
        // sample_post has 10 upvotes / 2 comments -> legacy engagement = (10*0.5 + 2) / 100 = 0.07,
        // and is created "now" -> recency = 1.0.
        let expected = 0.8 * 0.4 + 0.07 * 0.25 + 0.6 * 0.25 + 1.0 * 0.10;
        assert!((score.composite_value - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn fails_open_on_malformed_reply() {
        let llm = Arc::new(LlmClient::mock("not json", Duration::from_millis(0)));
        let analyzer = PainAnalyzer::new(llm);
        let score = analyzer.analyze(&sample_post()).await;
        assert_eq!(score.score, 0.0);
        assert!(score.reasoning.starts_with("Analysis failed"));
    }
}
