//! Reddit-shaped discussion-forum adapter.
//!
//! Grounded on `original_source/copilot/providers/scrapers/reddit.py`: OAuth2
//! app-only token exchange, `new | hot | top(time_window)` listings, and the
//! same item-skip rules (removed/deleted selftext).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common_types::{Capability, Post};
use error_types::AdapterError;
use serde::Deserialize;
use serde_json::Value;

use crate::{is_droppable, retry_get, SourceAdapter};

const REDDIT_OAUTH_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

pub struct DiscussionForumAdapter {
    name: String,
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    token: Arc<Mutex<Option<String>>>,
}

impl DiscussionForumAdapter {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            name: "discussion-forum".to_string(),
            client: crate::http_client(),
            client_id,
            client_secret,
            user_agent,
            token: Arc::new(Mutex::new(None)),
        }
    }

    async fn access_token(&self) -> Result<String, AdapterError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        let resp = self
            .client
            .post(REDDIT_OAUTH_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("User-Agent", &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AdapterError::PlatformError(format!(
                "reddit token exchange failed: {}",
                resp.status()
            )));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }
        let parsed: TokenResponse = resp.json().await?;
        *guard = Some(parsed.access_token.clone());
        Ok(parsed.access_token)
    }

    fn listing_url(&self, target: &str, sort: &str, limit: usize, time_window: &str) -> String {
        match sort {
            "top" => format!(
                "{REDDIT_API_BASE}/r/{target}/top?limit={limit}&t={time_window}&raw_json=1"
            ),
            other => format!("{REDDIT_API_BASE}/r/{target}/{other}?limit={limit}&raw_json=1"),
        }
    }

    fn map_child(&self, child: &Value) -> Option<Post> {
        let data = child.get("data")?;
        let id = data.get("id")?.as_str()?;
        let title = data.get("title").and_then(Value::as_str).unwrap_or("");
        let body = data.get("selftext").and_then(Value::as_str);
        if is_droppable(title, body) {
            return None;
        }
        if data
            .get("removed_by_category")
            .map(|v| !v.is_null())
            .unwrap_or(false)
        {
            return None;
        }

        let created_utc = data.get("created_utc").and_then(Value::as_f64).unwrap_or(0.0);
        let created_at = Utc
            .timestamp_opt(created_utc as i64, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let subreddit = data.get("subreddit").and_then(Value::as_str).unwrap_or("");
        let mut metadata = HashMap::new();
        if let Some(ratio) = data.get("upvote_ratio") {
            metadata.insert("upvote_ratio".to_string(), ratio.clone());
        }
        metadata.insert(
            "is_self".to_string(),
            data.get("is_self").cloned().unwrap_or(Value::Bool(false)),
        );

        Some(Post {
            id: format!("{}_{}", self.name, id),
            source: self.name.clone(),
            title: title.to_string(),
            body: body.map(str::to_string),
            author: data
                .get("author")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            url: format!("https://reddit.com{}", data.get("permalink").and_then(Value::as_str).unwrap_or("")),
            upvotes: data.get("score").and_then(Value::as_i64).unwrap_or(0).max(0) as u64,
            comments_count: data.get("num_comments").and_then(Value::as_u64).unwrap_or(0),
            created_at,
            channel: Some(format!("r/{subreddit}")),
            subreddit: Some(subreddit.to_string()),
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata,
        })
    }
}

#[async_trait]
impl SourceAdapter for DiscussionForumAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &str {
        "discussion-forum"
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Search,
            Capability::SortNew,
            Capability::SortHot,
            Capability::SortTop,
            Capability::Comments,
            Capability::Historical,
        ]
    }

    /// `target` is `"<subreddit>:<sort>[:<time_window>]"`, e.g. `"SaaS:top:week"`,
    /// defaulting to `hot` and `day` when unspecified.
    async fn scrape(&self, target: &str, limit: usize) -> Result<Vec<Post>, AdapterError> {
        let mut parts = target.splitn(3, ':');
        let subreddit = parts.next().unwrap_or(target);
        let sort = parts.next().unwrap_or("hot");
        let time_window = parts.next().unwrap_or("day");

        let token = self.access_token().await?;
        let url = self.listing_url(subreddit, sort, limit, time_window);

        let response = retry_get(|| {
            self.client
                .get(&url)
                .header("Authorization", format!("Bearer {token}"))
                .header("User-Agent", &self.user_agent)
                .send()
        })
        .await?;

        if !response.status().is_success() {
            return Err(AdapterError::PlatformError(format!(
                "reddit listing failed: {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let children = body["data"]["children"].as_array().cloned().unwrap_or_default();

        let posts = children
            .iter()
            .filter_map(|child| self.map_child(child))
            .take(limit)
            .collect();
        Ok(posts)
    }

    async fn health_check(&self) -> bool {
        self.access_token().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_removed_selftext() {
        assert!(is_droppable("title", Some("[removed]")));
        assert!(is_droppable("title", Some("[deleted]")));
        assert!(!is_droppable("title", Some("normal body")));
        assert!(!is_droppable("title", None));
    }

    #[test]
    fn listing_url_uses_time_window_for_top() {
        let adapter = DiscussionForumAdapter::new("id".into(), "secret".into(), "ua".into());
        let url = adapter.listing_url("SaaS", "top", 25, "week");
        assert_eq!(
            url,
            "https://oauth.reddit.com/r/SaaS/top?limit=25&t=week&raw_json=1"
        );
    }
}
