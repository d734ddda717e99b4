//! Hacker-News-shaped news-aggregator adapter.
//!
//! Grounded on `original_source/copilot/providers/scrapers/hackernews.py`:
//! unauthenticated Firebase-style REST for feed ids + items, and an
//! Algolia-style search endpoint for queries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common_types::{Capability, Post};
use error_types::AdapterError;
use serde_json::Value;

use crate::{is_droppable, retry_get, SourceAdapter};

const HN_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const HN_ALGOLIA: &str = "https://hn.algolia.com/api/v1";

pub struct NewsAggregatorAdapter {
    name: String,
    client: reqwest::Client,
}

impl Default for NewsAggregatorAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NewsAggregatorAdapter {
    pub fn new() -> Self {
        Self {
            name: "news-aggregator".to_string(),
            client: crate::http_client(),
        }
    }

    fn feed_endpoint(feed: &str) -> &'static str {
        match feed {
            "new" => "newstories",
            "ask" => "askstories",
            "show" => "showstories",
            "jobs" => "jobstories",
            _ => "topstories",
        }
    }

    fn channel_for(feed: &str, item_type: Option<&str>) -> String {
        match feed {
            "ask" => "hn/ask".to_string(),
            "show" => "hn/show".to_string(),
            _ => format!("hn/{}", item_type.unwrap_or("story")),
        }
    }

    async fn fetch_stories(&self, feed: &str, limit: usize) -> Result<Vec<Post>, AdapterError> {
        let ids_url = format!("{HN_BASE}/{}.json", Self::feed_endpoint(feed));
        let ids_resp = retry_get(|| self.client.get(&ids_url).send()).await?;
        let ids: Vec<u64> = ids_resp.json().await?;

        let mut posts = Vec::new();
        for id in ids.into_iter().take(limit * 2) {
            if posts.len() >= limit {
                break;
            }
            let item_url = format!("{HN_BASE}/item/{id}.json");
            let item_resp = retry_get(|| self.client.get(&item_url).send()).await?;
            let item: Value = item_resp.json().await?;
            if item.is_null() {
                continue;
            }
            let item_type = item.get("type").and_then(Value::as_str);
            if !matches!(item_type, Some("story") | Some("job")) {
                continue;
            }
            if item.get("deleted").and_then(Value::as_bool).unwrap_or(false)
                || item.get("dead").and_then(Value::as_bool).unwrap_or(false)
            {
                continue;
            }
            if let Some(post) = self.map_item(&item, feed) {
                posts.push(post);
            }
        }
        Ok(posts)
    }

    async fn search(&self, query: &str, sort: &str, limit: usize) -> Result<Vec<Post>, AdapterError> {
        let endpoint = if sort == "new" { "search_by_date" } else { "search" };
        let url = format!(
            "{HN_ALGOLIA}/{endpoint}?query={}&tags=story&hitsPerPage={limit}",
            urlencode(query)
        );
        let resp = retry_get(|| self.client.get(&url).send()).await?;
        let body: Value = resp.json().await?;
        let hits = body["hits"].as_array().cloned().unwrap_or_default();

        Ok(hits
            .iter()
            .filter_map(|hit| self.map_algolia_hit(hit))
            .take(limit)
            .collect())
    }

    fn map_item(&self, item: &Value, feed: &str) -> Option<Post> {
        let id = item.get("id")?.as_u64()?;
        let title = item.get("title").and_then(Value::as_str).unwrap_or("");
        let body = item.get("text").and_then(Value::as_str);
        if is_droppable(title, body) {
            return None;
        }

        let created_at = item
            .get("time")
            .and_then(Value::as_i64)
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
            .unwrap_or_else(Utc::now);

        let item_type = item.get("type").and_then(Value::as_str);
        let url = item
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={id}"));

        let mut metadata = HashMap::new();
        metadata.insert("hn_type".to_string(), Value::String(item_type.unwrap_or("story").to_string()));

        Some(Post {
            id: format!("{}_{}", self.name, id),
            source: self.name.clone(),
            title: title.to_string(),
            body: body.map(str::to_string),
            author: item.get("by").and_then(Value::as_str).unwrap_or("unknown").to_string(),
            url,
            upvotes: item.get("score").and_then(Value::as_u64).unwrap_or(0),
            comments_count: item
                .get("descendants")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            created_at,
            channel: Some(Self::channel_for(feed, item_type)),
            subreddit: None,
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata,
        })
    }

    fn map_algolia_hit(&self, hit: &Value) -> Option<Post> {
        let id = hit.get("objectID")?.as_str()?;
        let title = hit.get("title").and_then(Value::as_str).unwrap_or("");
        let body = hit.get("story_text").and_then(Value::as_str);
        if is_droppable(title, body) {
            return None;
        }

        let created_at = hit
            .get("created_at_i")
            .and_then(Value::as_i64)
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
            .unwrap_or_else(Utc::now);

        let tags: Vec<&str> = hit["_tags"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let channel = if tags.contains(&"ask_hn") {
            "hn/ask".to_string()
        } else if tags.contains(&"show_hn") {
            "hn/show".to_string()
        } else {
            "hn/story".to_string()
        };

        Some(Post {
            id: format!("{}_{}", self.name, id),
            source: self.name.clone(),
            title: title.to_string(),
            body: body.map(str::to_string),
            author: hit.get("author").and_then(Value::as_str).unwrap_or("unknown").to_string(),
            url: hit
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={id}")),
            upvotes: hit.get("points").and_then(Value::as_u64).unwrap_or(0),
            comments_count: hit.get("num_comments").and_then(Value::as_u64).unwrap_or(0),
            created_at,
            channel: Some(channel),
            subreddit: None,
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata: HashMap::new(),
        })
    }
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            ' ' => "+".to_string(),
            other => format!("%{:02X}", other as u32),
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for NewsAggregatorAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &str {
        "news-aggregator"
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Search,
            Capability::SortNew,
            Capability::SortTop,
            Capability::Comments,
            Capability::Historical,
        ]
    }

    /// `target` is a feed tag (`top | new | ask | show | jobs`) or, prefixed
    /// with `search:`, a query against the Algolia-style search endpoint
    /// (optionally `search:new:<query>` to sort by date).
    async fn scrape(&self, target: &str, limit: usize) -> Result<Vec<Post>, AdapterError> {
        if let Some(rest) = target.strip_prefix("search:") {
            if let Some(query) = rest.strip_prefix("new:") {
                return self.search(query, "new", limit).await;
            }
            return self.search(rest, "relevance", limit).await;
        }
        self.fetch_stories(target, limit).await
    }

    async fn health_check(&self) -> bool {
        let url = format!("{HN_BASE}/topstories.json");
        self.client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_endpoint_maps_known_feeds() {
        assert_eq!(NewsAggregatorAdapter::feed_endpoint("new"), "newstories");
        assert_eq!(NewsAggregatorAdapter::feed_endpoint("ask"), "askstories");
        assert_eq!(NewsAggregatorAdapter::feed_endpoint("unknown"), "topstories");
    }

    #[test]
    fn channel_for_ask_and_show() {
        assert_eq!(NewsAggregatorAdapter::channel_for("ask", Some("story")), "hn/ask");
        assert_eq!(NewsAggregatorAdapter::channel_for("show", Some("story")), "hn/show");
        assert_eq!(NewsAggregatorAdapter::channel_for("top", Some("job")), "hn/job");
    }
}
