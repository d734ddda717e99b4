//! Apify-actor-backed review-platform adapters (G2- and Capterra-shaped).
//!
//! Grounded on `original_source/copilot/providers/scrapers/apify_g2.py`: run
//! an Apify actor, poll until it finishes, then iterate the resulting
//! dataset. Both review platforms share the same runner shape and differ
//! only in actor id and field names, so one generic adapter parameterizes
//! over both.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_types::{Capability, Post};
use error_types::AdapterError;
use serde_json::Value;

use crate::{is_droppable, retry_get, SourceAdapter};

const APIFY_BASE: &str = "https://api.apify.com/v2";

/// Which review platform this adapter instance speaks for; only the actor
/// id and helpful-count field name differ between the two.
pub struct ReviewPlatformConfig {
    pub source_name: &'static str,
    pub actor_id: &'static str,
}

pub const REVIEW_PLATFORM_A: ReviewPlatformConfig = ReviewPlatformConfig {
    source_name: "review-platform-a",
    actor_id: "misceres/g2-product-scraper",
};

pub const REVIEW_PLATFORM_B: ReviewPlatformConfig = ReviewPlatformConfig {
    source_name: "review-platform-b",
    actor_id: "misceres/capterra-scraper",
};

pub struct ReviewPlatformAdapter {
    name: String,
    actor_id: String,
    client: reqwest::Client,
    api_token: String,
}

impl ReviewPlatformAdapter {
    pub fn new(config: &ReviewPlatformConfig, api_token: String) -> Self {
        Self {
            name: config.source_name.to_string(),
            actor_id: config.actor_id.to_string(),
            client: crate::http_client(),
            api_token,
        }
    }

    async fn run_actor(&self, product_slug: &str, limit: usize) -> Result<String, AdapterError> {
        let url = format!(
            "{APIFY_BASE}/acts/{}/runs?token={}",
            self.actor_id.replace('/', "~"),
            self.api_token
        );
        let input = serde_json::json!({
            "productUrl": product_slug,
            "maxReviews": limit,
            "sort": "newest",
        });

        let resp = retry_get(|| self.client.post(&url).json(&input).send()).await?;
        if !resp.status().is_success() {
            return Err(AdapterError::PlatformError(format!(
                "actor run failed to start: {}",
                resp.status()
            )));
        }
        let body: Value = resp.json().await?;
        body["data"]["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AdapterError::PlatformError("actor run had no id".to_string()))
    }

    async fn wait_for_run(&self, run_id: &str) -> Result<String, AdapterError> {
        let url = format!("{APIFY_BASE}/actor-runs/{run_id}?token={}", self.api_token);
        for _ in 0..30 {
            let resp = retry_get(|| self.client.get(&url).send()).await?;
            let body: Value = resp.json().await?;
            let status = body["data"]["status"].as_str().unwrap_or("");
            match status {
                "SUCCEEDED" => {
                    return body["data"]["defaultDatasetId"]
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| {
                            AdapterError::PlatformError("run had no dataset id".to_string())
                        })
                }
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(AdapterError::PlatformError(format!(
                        "actor run ended in status {status}"
                    )))
                }
                _ => tokio::time::sleep(Duration::from_secs(2)).await,
            }
        }
        Err(AdapterError::PlatformError(
            "actor run did not finish in time".to_string(),
        ))
    }

    async fn iterate_dataset(&self, dataset_id: &str, limit: usize) -> Result<Vec<Value>, AdapterError> {
        let url = format!(
            "{APIFY_BASE}/datasets/{dataset_id}/items?token={}&limit={limit}",
            self.api_token
        );
        let resp = retry_get(|| self.client.get(&url).send()).await?;
        let items: Vec<Value> = resp.json().await?;
        Ok(items)
    }

    fn combine_review_text(item: &Value) -> String {
        let mut parts = Vec::new();
        if let Some(pros) = item.get("pros").and_then(Value::as_str) {
            if !pros.is_empty() {
                parts.push(format!("PROS: {pros}"));
            }
        }
        if let Some(cons) = item.get("cons").and_then(Value::as_str) {
            if !cons.is_empty() {
                parts.push(format!("CONS: {cons}"));
            }
        }
        if let Some(body) = item.get("reviewBody").and_then(Value::as_str) {
            if !body.is_empty() {
                parts.push(body.to_string());
            }
        }
        parts.join("\n\n")
    }

    fn parse_date(item: &Value) -> DateTime<Utc> {
        item.get("date")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now)
    }

    fn map_item(&self, item: &Value, product_slug: &str) -> Option<Post> {
        let review_id = item.get("reviewId").and_then(Value::as_str)?;
        let title = item
            .get("reviewTitle")
            .and_then(Value::as_str)
            .unwrap_or("Review");
        let body = Self::combine_review_text(item);
        if is_droppable(title, Some(body.as_str())) {
            return None;
        }

        let mut metadata = HashMap::new();
        if let Some(rating) = item.get("rating") {
            metadata.insert("star_rating".to_string(), rating.clone());
        }
        for key in ["reviewerRole", "companySize", "industry"] {
            if let Some(v) = item.get(key) {
                metadata.insert(key.to_string(), v.clone());
            }
        }
        metadata.insert("review_source".to_string(), Value::String(self.name.clone()));
        metadata.insert(
            "product_slug".to_string(),
            Value::String(product_slug.to_string()),
        );

        Some(Post {
            id: format!("{}_{}_{}", self.name, product_slug, review_id),
            source: self.name.clone(),
            title: title.to_string(),
            body: Some(body),
            author: item
                .get("reviewerName")
                .and_then(Value::as_str)
                .unwrap_or("anonymous")
                .to_string(),
            url: item
                .get("reviewUrl")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            upvotes: item.get("helpfulCount").and_then(Value::as_u64).unwrap_or(0),
            comments_count: 0,
            created_at: Self::parse_date(item),
            channel: Some(format!("{}/{}", self.name, product_slug)),
            subreddit: None,
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata,
        })
    }
}

#[async_trait]
impl SourceAdapter for ReviewPlatformAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &str {
        "review-platform"
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Reviews,
            Capability::Search,
            Capability::SortNew,
            Capability::Historical,
        ]
    }

    /// `target` is a product slug/URL understood by the underlying actor.
    async fn scrape(&self, target: &str, limit: usize) -> Result<Vec<Post>, AdapterError> {
        let run_id = self.run_actor(target, limit).await?;
        let dataset_id = self.wait_for_run(&run_id).await?;
        let items = self.iterate_dataset(&dataset_id, limit).await?;

        Ok(items
            .iter()
            .filter_map(|item| self.map_item(item, target))
            .take(limit)
            .collect())
    }

    async fn health_check(&self) -> bool {
        !self.api_token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_pros_cons_and_body() {
        let item = serde_json::json!({
            "pros": "fast",
            "cons": "pricey",
            "reviewBody": "overall good",
        });
        let combined = ReviewPlatformAdapter::combine_review_text(&item);
        assert!(combined.contains("PROS: fast"));
        assert!(combined.contains("CONS: pricey"));
        assert!(combined.contains("overall good"));
    }

    #[test]
    fn parse_date_falls_back_to_now_on_bad_input() {
        let item = serde_json::json!({ "date": "not-a-date" });
        let before = Utc::now();
        let parsed = ReviewPlatformAdapter::parse_date(&item);
        assert!(parsed >= before);
    }
}
