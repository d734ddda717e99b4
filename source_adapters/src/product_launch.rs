//! Product-Hunt-shaped product-launch adapter.
//!
//! Grounded on `original_source/copilot/providers/scrapers/producthunt.py`:
//! an authenticated GraphQL endpoint, cursor pagination via
//! `pageInfo.{hasNextPage,endCursor}`, and `RANKING | VOTES` ordering.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_types::{Capability, Post};
use error_types::AdapterError;
use serde_json::{json, Value};

use crate::{is_droppable, retry_get, SourceAdapter};

const GRAPHQL_URL: &str = "https://api.producthunt.com/v2/api/graphql";

pub struct ProductLaunchAdapter {
    name: String,
    client: reqwest::Client,
    api_token: String,
}

impl ProductLaunchAdapter {
    pub fn new(api_token: String) -> Self {
        Self {
            name: "product-launch".to_string(),
            client: crate::http_client(),
            api_token,
        }
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, AdapterError> {
        let payload = json!({ "query": query, "variables": variables });
        let resp = retry_get(|| {
            self.client
                .post(GRAPHQL_URL)
                .bearer_auth(&self.api_token)
                .json(&payload)
                .send()
        })
        .await?;

        if !resp.status().is_success() {
            return Err(AdapterError::PlatformError(format!(
                "graphql request failed: {}",
                resp.status()
            )));
        }
        let body: Value = resp.json().await?;
        if let Some(errors) = body.get("errors") {
            return Err(AdapterError::PlatformError(format!("graphql errors: {errors}")));
        }
        Ok(body)
    }

    /// `target` selects the listing mode: `latest`, `top`, `days_ago:N`, or a
    /// specific `YYYY-MM-DD` date.
    async fn posted_window(target: &str) -> (Option<String>, Option<String>, &'static str) {
        let now = Utc::now();
        match target {
            "latest" => {
                let start = now.date_naive().and_hms_opt(0, 0, 0).unwrap();
                (
                    Some(format!("{}Z", start.format("%Y-%m-%dT%H:%M:%S"))),
                    None,
                    "RANKING",
                )
            }
            "top" => (None, None, "VOTES"),
            other if other.starts_with("days_ago:") => {
                let n: i64 = other[9..].parse().unwrap_or(0);
                let start = now - chrono::Duration::days(n + 1);
                let end = now - chrono::Duration::days(n);
                (
                    Some(start.to_rfc3339()),
                    Some(end.to_rfc3339()),
                    "RANKING",
                )
            }
            date => {
                if let Ok(day) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                    let start = day.and_hms_opt(0, 0, 0).unwrap();
                    let end = start + chrono::Duration::days(1);
                    (
                        Some(format!("{start}Z")),
                        Some(format!("{end}Z")),
                        "RANKING",
                    )
                } else {
                    (None, None, "RANKING")
                }
            }
        }
    }

    fn map_node(&self, node: &Value) -> Option<Post> {
        let id = node.get("id")?.as_str()?;
        let name = node.get("name").and_then(Value::as_str).unwrap_or("");
        let tagline = node.get("tagline").and_then(Value::as_str).unwrap_or("");
        let title = if tagline.is_empty() {
            name.to_string()
        } else {
            format!("{name} - {tagline}")
        };
        let description = node.get("description").and_then(Value::as_str);
        if is_droppable(&title, description) {
            return None;
        }

        let created_at = node
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let topics: Vec<String> = node["topics"]["edges"]
            .as_array()
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|e| e["node"]["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let channel = topics
            .first()
            .map(|t| format!("topic:{t}"))
            .unwrap_or_else(|| "featured".to_string());

        let mut metadata = HashMap::new();
        if let Some(website) = node.get("website") {
            metadata.insert("website".to_string(), website.clone());
        }
        metadata.insert("tagline".to_string(), Value::String(tagline.to_string()));
        metadata.insert("topics".to_string(), json!(topics));
        if let Some(state) = node.get("productState") {
            metadata.insert("product_state".to_string(), state.clone());
        }

        Some(Post {
            id: format!("{}_{}", self.name, id),
            source: self.name.clone(),
            title,
            body: description.map(str::to_string),
            author: node["user"]["username"]
                .as_str()
                .unwrap_or("unknown")
                .to_string(),
            url: node
                .get("website")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            upvotes: node.get("votesCount").and_then(Value::as_u64).unwrap_or(0),
            comments_count: node.get("commentsCount").and_then(Value::as_u64).unwrap_or(0),
            created_at,
            channel: Some(channel),
            subreddit: None,
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata,
        })
    }
}

const POSTS_QUERY: &str = r#"
query Posts($after: String, $order: PostsOrder, $postedAfter: DateTime, $postedBefore: DateTime) {
  posts(first: 20, after: $after, order: $order, postedAfter: $postedAfter, postedBefore: $postedBefore) {
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        id name tagline description votesCount commentsCount createdAt productState
        website
        user { username }
        topics(first: 3) { edges { node { name } } }
      }
    }
  }
}
"#;

#[async_trait]
impl SourceAdapter for ProductLaunchAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &str {
        "product-launch"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Realtime, Capability::Comments, Capability::SortNew, Capability::SortTop]
    }

    async fn scrape(&self, target: &str, limit: usize) -> Result<Vec<Post>, AdapterError> {
        let (posted_after, posted_before, order) = Self::posted_window(target).await;

        let mut posts = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let variables = json!({
                "after": cursor,
                "order": order,
                "postedAfter": posted_after,
                "postedBefore": posted_before,
            });
            let body = self.graphql(POSTS_QUERY, variables).await?;
            let edges = body["data"]["posts"]["edges"].as_array().cloned().unwrap_or_default();
            for edge in &edges {
                if posts.len() >= limit {
                    break;
                }
                if let Some(post) = self.map_node(&edge["node"]) {
                    posts.push(post);
                }
            }
            if posts.len() >= limit {
                break;
            }
            let page_info = &body["data"]["posts"]["pageInfo"];
            if !page_info["hasNextPage"].as_bool().unwrap_or(false) {
                break;
            }
            cursor = page_info["endCursor"].as_str().map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        Ok(posts)
    }

    async fn health_check(&self) -> bool {
        self.graphql("query { viewer { user { id } } }", json!({})).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn top_orders_by_votes() {
        let (after, before, order) = ProductLaunchAdapter::posted_window("top").await;
        assert!(after.is_none());
        assert!(before.is_none());
        assert_eq!(order, "VOTES");
    }

    #[tokio::test]
    async fn specific_date_sets_a_day_window() {
        let (after, before, order) = ProductLaunchAdapter::posted_window("2026-01-15").await;
        assert!(after.unwrap().starts_with("2026-01-15"));
        assert!(before.unwrap().starts_with("2026-01-16"));
        assert_eq!(order, "RANKING");
    }
}
