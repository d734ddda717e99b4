//! Scoring Engine (C6): combines seven dimensions into a bounded
//! `OpportunityScore`. `trend_momentum` and `cross_source_bonus` query
//! history through [`HistorySource`] so this crate never depends on a
//! concrete storage backend.
//!
//! Grounded verbatim on `original_source/copilot/modules/scoring.py`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use common_types::{OpportunityScore, PainScore, Post};
use error_types::StoreError;

/// Default weights (sum to 1.0); callers may override.
pub const DEFAULT_WEIGHTS: &[(&str, f64)] = &[
    ("pain_intensity", 0.25),
    ("engagement_norm", 0.15),
    ("validation_evidence", 0.15),
    ("sentiment_intensity", 0.15),
    ("recency", 0.08),
    ("trend_momentum", 0.12),
    ("market_signal", 0.10),
];

pub fn default_weights() -> HashMap<String, f64> {
    DEFAULT_WEIGHTS
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}

struct EngagementNormalizer {
    upvote_cap: f64,
    upvote_weight: f64,
    comment_cap: f64,
    comment_weight: f64,
    star_weight: Option<f64>,
}

fn engagement_normalizer(source: &str) -> EngagementNormalizer {
    match source {
        "discussion-forum" => EngagementNormalizer {
            upvote_cap: 200.0,
            upvote_weight: 0.5,
            comment_cap: 50.0,
            comment_weight: 0.5,
            star_weight: None,
        },
        "news-aggregator" => EngagementNormalizer {
            upvote_cap: 300.0,
            upvote_weight: 0.6,
            comment_cap: 150.0,
            comment_weight: 0.4,
            star_weight: None,
        },
        "review-platform-a" => EngagementNormalizer {
            upvote_cap: 20.0,
            upvote_weight: 0.3,
            comment_cap: 1.0,
            comment_weight: 0.0,
            star_weight: Some(0.7),
        },
        "review-platform-b" => EngagementNormalizer {
            upvote_cap: 15.0,
            upvote_weight: 0.2,
            comment_cap: 1.0,
            comment_weight: 0.0,
            star_weight: Some(0.8),
        },
        _ => EngagementNormalizer {
            upvote_cap: 100.0,
            upvote_weight: 0.5,
            comment_cap: 50.0,
            comment_weight: 0.5,
            star_weight: None,
        },
    }
}

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "could", "should", "may",
    "might", "must", "can", "this", "that", "these", "those", "i", "you", "he", "she", "it",
    "we", "they", "my", "your", "his", "her", "its", "our", "their", "to", "of", "in", "on",
    "for", "with", "at", "by", "from", "as", "into", "about", "like", "through", "after",
    "over", "between", "out", "against", "during", "without", "before", "under", "around",
    "among", "not", "no", "so", "than", "too", "very", "just", "if", "then", "there", "here",
    "what", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "only", "own", "same", "now", "also", "get", "got",
];

/// Extract up to five key terms from lowercased, punctuation-stripped text,
/// with a minimum length of 3 and a built-in stop-word list. Counts ties by
/// first occurrence order for determinism (invariant 4).
pub fn extract_key_terms(text: &str) -> Vec<String> {
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for raw in text.to_lowercase().split_whitespace() {
        let cleaned: String = raw.chars().filter(|c| c.is_alphanumeric()).collect();
        if cleaned.len() < 3 || stop.contains(cleaned.as_str()) {
            continue;
        }
        if !counts.contains_key(&cleaned) {
            order.push(cleaned.clone());
        }
        *counts.entry(cleaned).or_insert(0) += 1;
    }

    let mut terms = order;
    terms.sort_by(|a, b| counts[b].cmp(&counts[a]));
    terms.truncate(5);
    terms
}

/// `min(1, upvotes/U)·wu + min(1, comments/C)·wc`, plus an inverse star-rating
/// term for platforms that declare a `star_weight`.
pub fn calculate_engagement_norm(post: &Post) -> f64 {
    let norm = engagement_normalizer(&post.source);
    let mut score = (post.upvotes as f64 / norm.upvote_cap).min(1.0) * norm.upvote_weight
        + (post.comments_count as f64 / norm.comment_cap).min(1.0) * norm.comment_weight;

    if let Some(star_weight) = norm.star_weight {
        if let Some(rating) = post.metadata.get("star_rating").and_then(|v| v.as_f64()) {
            score += ((5.0 - rating) / 4.0).max(0.0) * star_weight;
        }
    }

    score.clamp(0.0, 1.0)
}

/// Piecewise recency by age from `now`.
pub fn calculate_recency_score(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age = now.signed_duration_since(created_at);
    if age < Duration::days(1) {
        1.0
    } else if age < Duration::days(7) {
        0.8
    } else if age < Duration::days(30) {
        0.5
    } else if age < Duration::days(90) {
        0.2
    } else {
        0.0
    }
}

const HIGH_SIGNAL: &[&str] = &[
    "paying for",
    "subscription",
    "monthly fee",
    "enterprise",
    "api",
    "b2b",
    "saas",
    "willing to pay",
    "shut up and take my money",
];
const MEDIUM_SIGNAL: &[&str] = &[
    "alternative to",
    "looking for",
    "better tool",
    "recommend",
    "comparison",
    "vs",
    "switch from",
    "migrate",
];
const LOW_SIGNAL: &[&str] = &[
    "how do i",
    "tutorial",
    "help with",
    "frustrated with",
    "wish there was",
    "why doesn't",
];

/// Keyword scan against three weighted bins, clamped to 1.
pub fn calculate_market_signal(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score = 0.0;
    for term in HIGH_SIGNAL {
        if lower.contains(term) {
            score += 0.3;
        }
    }
    for term in MEDIUM_SIGNAL {
        if lower.contains(term) {
            score += 0.15;
        }
    }
    for term in LOW_SIGNAL {
        if lower.contains(term) {
            score += 0.05;
        }
    }
    score.min(1.0)
}

/// Legacy engagement heuristic kept only for [`calculate_composite_value`]'s
/// backward-compat formula — 100 upvotes + 50 comments = 1.0. Distinct from
/// [`calculate_engagement_norm`]'s per-source normalization, which is what
/// `OpportunityScore.engagement_norm` actually uses.
pub fn calculate_legacy_engagement_score(post: &Post) -> f64 {
    let score = (post.upvotes as f64 * 0.5 + post.comments_count as f64) / 100.0;
    score.min(1.0)
}

/// `composite_value`: the legacy four-term formula kept on `PainScore` for
/// backward compatibility (spec.md §3, §4.7, §5 — the orchestrator's sort
/// key). `pain*0.4 + engagement*0.25 + validation*0.25 + recency*0.10`.
pub fn calculate_composite_value(
    post: &Post,
    pain_score: f64,
    validation_score: f64,
    now: DateTime<Utc>,
) -> f64 {
    let engagement = calculate_legacy_engagement_score(post);
    let recency = calculate_recency_score(post.created_at, now);
    pain_score * 0.4 + engagement * 0.25 + validation_score * 0.25 + recency * 0.10
}

/// Queries the persisted corpus for trend-momentum and cross-source-bonus.
/// `opportunity_store` implements this; `scoring_engine` stays storage-agnostic.
pub trait HistorySource: Send + Sync {
    /// Posts most-recently-created first, optionally restricted to one
    /// source, up to `limit`.
    fn get_posts(&self, limit: usize, source: Option<&str>) -> Result<Vec<Post>, StoreError>;
}

fn matches_any_term(post: &Post, terms: &[String]) -> bool {
    let text = post.combined_text().to_lowercase();
    terms.iter().any(|term| text.contains(term.as_str()))
}

/// Historical comparison against the same source: ratio of matches in the
/// last 30 days versus the preceding 30, squashed to [0,1] by a sigmoid. If
/// there were no older matches at all, defaults to 0.5 (no signal either way).
pub fn calculate_trend_momentum(
    post: &Post,
    key_terms: &[String],
    history: &dyn HistorySource,
    now: DateTime<Utc>,
) -> Result<f64, StoreError> {
    if key_terms.is_empty() {
        return Ok(0.5);
    }

    let candidates = history.get_posts(1000, Some(&post.source))?;
    let recent_cutoff = now - Duration::days(30);
    let older_cutoff = now - Duration::days(60);

    let mut recent_count = 0u32;
    let mut older_count = 0u32;
    for candidate in &candidates {
        if candidate.id == post.id {
            continue;
        }
        if !matches_any_term(candidate, key_terms) {
            continue;
        }
        if candidate.created_at > recent_cutoff && candidate.created_at <= now {
            recent_count += 1;
        } else if candidate.created_at > older_cutoff && candidate.created_at <= recent_cutoff {
            older_count += 1;
        }
    }

    if older_count == 0 {
        return Ok(0.5);
    }
    let ratio = recent_count as f64 / older_count as f64;
    Ok(1.0 / (1.0 + (-2.0 * (ratio - 1.0)).exp()))
}

/// Additive bonus for the same pain topic appearing on other platforms
/// within 90 days: `0.05 · (distinct other sources matched)`. Not capped
/// before the final clamp — the source lets it grow unboundedly (§9 open
/// question, preserved as specified).
pub fn calculate_cross_source_bonus(
    post: &Post,
    key_terms: &[String],
    history: &dyn HistorySource,
    now: DateTime<Utc>,
) -> Result<f64, StoreError> {
    if key_terms.is_empty() {
        return Ok(0.0);
    }

    let candidates = history.get_posts(1000, None)?;
    let cutoff = now - Duration::days(90);

    let mut other_sources: HashSet<String> = HashSet::new();
    for candidate in &candidates {
        if candidate.source == post.source {
            continue;
        }
        if candidate.created_at <= cutoff || candidate.created_at > now {
            continue;
        }
        if matches_any_term(candidate, key_terms) {
            other_sources.insert(candidate.source.clone());
        }
    }

    Ok(other_sources.len() as f64 * 0.05)
}

/// Combine all seven dimensions and the cross-source bonus into a bounded
/// `OpportunityScore`. `pain_intensity`, `validation_evidence`, and
/// `sentiment_intensity` come directly from the `PainScore`.
pub fn compute_opportunity_score(
    post: &Post,
    pain: &PainScore,
    history: &dyn HistorySource,
    weights: &HashMap<String, f64>,
    now: DateTime<Utc>,
) -> Result<OpportunityScore, StoreError> {
    let key_terms = extract_key_terms(&post.combined_text());

    let pain_intensity = pain.score.clamp(0.0, 1.0);
    let engagement_norm = calculate_engagement_norm(post);
    let validation_evidence = pain.validation_score.clamp(0.0, 1.0);
    let sentiment_intensity = pain.sentiment_intensity.clamp(0.0, 1.0);
    let recency = calculate_recency_score(post.created_at, now);
    let trend_momentum = calculate_trend_momentum(post, &key_terms, history, now)?;
    let market_signal = calculate_market_signal(&post.combined_text());
    let cross_source_bonus = calculate_cross_source_bonus(post, &key_terms, history, now)?;

    let mut dimensions = HashMap::new();
    dimensions.insert("pain_intensity".to_string(), pain_intensity);
    dimensions.insert("engagement_norm".to_string(), engagement_norm);
    dimensions.insert("validation_evidence".to_string(), validation_evidence);
    dimensions.insert("sentiment_intensity".to_string(), sentiment_intensity);
    dimensions.insert("recency".to_string(), recency);
    dimensions.insert("trend_momentum".to_string(), trend_momentum);
    dimensions.insert("market_signal".to_string(), market_signal);

    // Summed in `DEFAULT_WEIGHTS`'s fixed order rather than over the
    // HashMap directly: HashMap iteration order is randomly seeded per
    // process, and float addition isn't associative, so iterating the map
    // would make the bit pattern of `base_score` non-reproducible (invariant 4).
    let base_score: f64 = DEFAULT_WEIGHTS
        .iter()
        .map(|(name, _)| {
            let value = dimensions.get(*name).copied().unwrap_or(0.0);
            value * weights.get(*name).copied().unwrap_or(0.0)
        })
        .sum();
    let final_score = (base_score + cross_source_bonus).clamp(0.0, 1.0);

    Ok(OpportunityScore {
        post_id: post.id.clone(),
        source: post.source.clone(),
        final_score,
        pain_intensity,
        engagement_norm,
        validation_evidence,
        sentiment_intensity,
        recency,
        trend_momentum,
        market_signal,
        cross_source_bonus,
        dimensions,
        weights: weights.clone(),
        computed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(source: &str, upvotes: u64, comments: u64) -> Post {
        Post {
            id: format!("{source}_1"),
            source: source.to_string(),
            title: "title".into(),
            body: None,
            author: "a".into(),
            url: "https://example.com".into(),
            upvotes,
            comments_count: comments,
            created_at: Utc::now(),
            channel: None,
            subreddit: None,
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata: HashMap::new(),
        }
    }

    struct EmptyHistory;
    impl HistorySource for EmptyHistory {
        fn get_posts(&self, _limit: usize, _source: Option<&str>) -> Result<Vec<Post>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let sum: f64 = DEFAULT_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((sum - 1.0).abs() < 0.01);
    }

    #[test]
    fn s1_engagement_forum() {
        let p = post("discussion-forum", 100, 25);
        assert!((calculate_engagement_norm(&p) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn s2_engagement_one_star_review() {
        let mut p = post("review-platform-a", 0, 0);
        p.metadata.insert("star_rating".to_string(), serde_json::json!(1));
        assert!((calculate_engagement_norm(&p) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn s3_recency_buckets() {
        let now = Utc::now();
        let ages_days = [0i64, 3, 20, 45, 100];
        let expected = [1.0, 0.8, 0.5, 0.2, 0.0];
        for (age, exp) in ages_days.iter().zip(expected.iter()) {
            let created = now - Duration::days(*age);
            assert_eq!(calculate_recency_score(created, now), *exp);
        }
    }

    #[test]
    fn s4_market_signal_clamped() {
        let text = "willing to pay for a B2B SaaS alternative to Jira";
        assert_eq!(calculate_market_signal(text), 1.0);
    }

    #[test]
    fn recency_monotone_for_identical_posts() {
        let now = Utc::now();
        let older = post("discussion-forum", 1, 1);
        let mut newer = older.clone();
        newer.created_at = now;
        let mut older = older;
        older.created_at = now - Duration::days(10);
        assert!(calculate_recency_score(newer.created_at, now) >= calculate_recency_score(older.created_at, now));
    }

    #[test]
    fn s6_cross_source_bonus_two_other_sources() {
        let now = Utc::now();
        let target = post("discussion-forum", 5, 5);
        struct TwoSourceHistory {
            now: DateTime<Utc>,
        }
        impl HistorySource for TwoSourceHistory {
            fn get_posts(&self, _limit: usize, source: Option<&str>) -> Result<Vec<Post>, StoreError> {
                if source.is_some() {
                    return Ok(Vec::new());
                }
                let mut a = super::super_post("news-aggregator", "title word");
                a.created_at = self.now - Duration::days(10);
                let mut b = super::super_post("review-platform-a", "title word");
                b.created_at = self.now - Duration::days(20);
                Ok(vec![a, b])
            }
        }
        let key_terms = vec!["title".to_string(), "word".to_string()];
        let bonus = calculate_cross_source_bonus(
            &target,
            &key_terms,
            &TwoSourceHistory { now },
            now,
        )
        .unwrap();
        assert!((bonus - 0.10).abs() < 1e-9);
    }

    #[test]
    fn legacy_engagement_score_caps_at_one() {
        let p = post("discussion-forum", 300, 100);
        assert_eq!(calculate_legacy_engagement_score(&p), 1.0);
    }

    #[test]
    fn composite_value_matches_legacy_formula() {
        let now = Utc::now();
        let mut p = post("discussion-forum", 100, 50);
        p.created_at = now;
        let composite = calculate_composite_value(&p, 0.8, 0.6, now);
        // engagement = min(1, (100*0.5 + 50) / 100) = 1.0, recency = 1.0
        let expected = 0.8 * 0.4 + 1.0 * 0.25 + 0.6 * 0.25 + 1.0 * 0.10;
        assert!((composite - expected).abs() < 1e-9);
    }

    #[test]
    fn trend_momentum_defaults_to_half_with_no_older_matches() {
        let now = Utc::now();
        let p = post("discussion-forum", 1, 1);
        let key_terms = vec!["widget".to_string()];
        let momentum = calculate_trend_momentum(&p, &key_terms, &EmptyHistory, now).unwrap();
        assert_eq!(momentum, 0.5);
    }
}

#[cfg(test)]
fn super_post(source: &str, title: &str) -> Post {
    Post {
        id: format!("{source}_x"),
        source: source.to_string(),
        title: title.to_string(),
        body: None,
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
    }
}
