//! Prefilter (§4.5): a platform-aware minimum-engagement gate applied before
//! spending an LLM call on a post. Grounded on
//! `original_source/copilot/modules/discovery.py::DiscoveryModule._passes_prefilter`.

use common_types::Post;

pub fn passes_prefilter(post: &Post) -> bool {
    match post.source.as_str() {
        "discussion-forum" => post.upvotes >= 5 || post.comments_count >= 2,
        "news-aggregator" => post.upvotes >= 3 || post.comments_count >= 1,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn post(source: &str, upvotes: u64, comments: u64) -> Post {
        Post {
            id: "x".into(),
            source: source.into(),
            title: "t".into(),
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

    #[test]
    fn discussion_forum_needs_upvotes_or_comments() {
        assert!(!passes_prefilter(&post("discussion-forum", 1, 0)));
        assert!(passes_prefilter(&post("discussion-forum", 5, 0)));
        assert!(passes_prefilter(&post("discussion-forum", 0, 2)));
    }

    #[test]
    fn news_aggregator_has_lower_bar() {
        assert!(!passes_prefilter(&post("news-aggregator", 2, 0)));
        assert!(passes_prefilter(&post("news-aggregator", 3, 0)));
        assert!(passes_prefilter(&post("news-aggregator", 0, 1)));
    }

    #[test]
    fn review_platforms_pass_unconditionally() {
        assert!(passes_prefilter(&post("review-platform-a", 0, 0)));
        assert!(passes_prefilter(&post("review-platform-b", 0, 0)));
    }
}
