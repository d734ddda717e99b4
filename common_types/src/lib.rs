use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A source-specific capability tag. Adapters declare a subset of these so the
/// registry can answer "which scrapers support SEARCH" without probing instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Search,
    SortNew,
    SortHot,
    SortTop,
    Comments,
    Reviews,
    Realtime,
    Historical,
}

/// One normalized external item: a discussion thread, comment, or review.
///
/// `id` is unique per `(source, id)`; adapters are responsible for prefixing
/// raw upstream ids with their own source name so ids never collide across
/// platforms (see invariant 8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub source: String,
    pub title: String,
    pub body: Option<String>,
    pub author: String,
    pub url: String,
    pub upvotes: u64,
    pub comments_count: u64,
    pub created_at: DateTime<Utc>,
    pub channel: Option<String>,
    pub subreddit: Option<String>,
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub sentiment_intensity: f64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Post {
    /// `title ⊕ body`, lowercased — the text window every keyword/key-term
    /// extraction in the scoring engine and pain analyzer operates on.
    pub fn combined_text(&self) -> String {
        match &self.body {
            Some(body) if !body.is_empty() => format!("{} {}", self.title, body),
            _ => self.title.clone(),
        }
    }
}

/// LLM-derived classification of a [`Post`]: pain intensity, sentiment, and
/// the legacy composite fields kept for backward-compatible sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PainScore {
    pub score: f64,
    pub reasoning: String,
    #[serde(default)]
    pub detected_problems: Vec<String>,
    #[serde(default)]
    pub suggested_solutions: Vec<String>,
    #[serde(default)]
    pub engagement_score: f64,
    #[serde(default)]
    pub validation_score: f64,
    #[serde(default)]
    pub recency_score: f64,
    #[serde(default)]
    pub composite_value: f64,
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub sentiment_intensity: f64,
}

impl PainScore {
    /// The fail-open result returned whenever analysis cannot complete —
    /// a transport failure, a non-JSON reply, or anything in between.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        PainScore {
            score: 0.0,
            reasoning: format!("Analysis failed: {reason}"),
            detected_problems: Vec::new(),
            suggested_solutions: Vec::new(),
            engagement_score: 0.0,
            validation_score: 0.0,
            recency_score: 0.0,
            composite_value: 0.0,
            sentiment_label: None,
            sentiment_intensity: 0.0,
        }
    }
}

/// Composite ranking score for a [`Post`], derived from its [`PainScore`] and
/// cross-corpus history (trend momentum, cross-source corroboration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityScore {
    pub post_id: String,
    pub source: String,
    pub final_score: f64,
    pub pain_intensity: f64,
    pub engagement_norm: f64,
    pub validation_evidence: f64,
    pub sentiment_intensity: f64,
    pub recency: f64,
    pub trend_momentum: f64,
    pub market_signal: f64,
    pub cross_source_bonus: f64,
    pub dimensions: HashMap<String, f64>,
    pub weights: HashMap<String, f64>,
    pub computed_at: DateTime<Utc>,
}

/// A high-intent contact surfaced from a post. Construction is out of scope
/// for this crate; the type exists so the Store can persist and list leads
/// produced by an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Option<i64>,
    pub post_id: String,
    pub author: String,
    pub content_snippet: String,
    pub intent_score: f64,
    pub contact_url: Option<String>,
    pub status: String,
    #[serde(default)]
    pub verified_profiles: HashMap<String, String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub name: String,
    pub url: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SwotAnalysis {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub threats: Vec<String>,
}

/// A market-validation writeup for a post. Construction (deep research,
/// competitor landscape) is out of scope; the Store persists whatever an
/// external collaborator produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub post_id: String,
    pub source: String,
    pub idea_summary: String,
    pub market_size_estimate: Option<String>,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
    #[serde(default)]
    pub swot_analysis: SwotAnalysis,
    pub validation_verdict: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// A synthetic buyer persona associated with a post's opportunity. Generation
/// is out of scope; the Store persists whatever an external collaborator
/// produces against the `personas` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub post_id: String,
    pub name: String,
    pub role: String,
    pub company: Option<String>,
    pub industry: Option<String>,
    #[serde(default)]
    pub pain_points: Vec<String>,
    pub personality: Option<String>,
    pub budget_range: Option<String>,
    pub preferred_communication: Option<String>,
    #[serde(default)]
    pub buying_triggers: Vec<String>,
    pub decision_maker: bool,
    pub opportunity_fit_score: f64,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_text_skips_empty_body() {
        let post = Post {
            id: "forum_1".into(),
            source: "discussion-forum".into(),
            title: "Looking for a tool".into(),
            body: Some(String::new()),
            author: "a".into(),
            url: "https://example.com".into(),
            upvotes: 1,
            comments_count: 0,
            created_at: Utc::now(),
            channel: None,
            subreddit: None,
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata: HashMap::new(),
        };
        assert_eq!(post.combined_text(), "Looking for a tool");
    }

    #[test]
    fn failed_pain_score_carries_reason() {
        let score = PainScore::failed("timeout");
        assert_eq!(score.score, 0.0);
        assert!(score.reasoning.starts_with("Analysis failed"));
    }
}
