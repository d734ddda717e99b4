//! Discovery Orchestrator (C7): fans out adapter scrapes, prefilters,
//! analyzes, scores, and persists. Grounded on
//! `original_source/copilot/modules/discovery.py::DiscoveryModule.discover`
//! for the pipeline shape, and on `service-orchestrator-rs`'s
//! `tokio_cron_scheduler` usage for the optional periodic-run helper.

pub mod prefilter;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common_types::{OpportunityScore, PainScore, Post};
use pain_analyzer::PainAnalyzer;
use opportunity_store::Store;
use provider_registry::Registry;
use scoring_engine::compute_opportunity_score;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub use prefilter::passes_prefilter;

/// One post that cleared the `min_score` bar, with every intermediate value
/// kept around for callers that want the breakdown.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    pub post: Post,
    pub pain: PainScore,
    pub score: OpportunityScore,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("scheduler error: {0}")]
    Scheduler(String),
    #[error("job error: {0}")]
    Job(String),
}

/// Targets to fetch, keyed by registered adapter name.
pub type TargetMap = HashMap<String, Vec<String>>;

pub struct DiscoveryOrchestrator {
    registry: Arc<Registry>,
    analyzer: Arc<PainAnalyzer>,
    store: Arc<Store>,
    weights: HashMap<String, f64>,
}

impl DiscoveryOrchestrator {
    pub fn new(registry: Arc<Registry>, analyzer: Arc<PainAnalyzer>, store: Arc<Store>) -> Self {
        Self {
            registry,
            analyzer,
            store,
            weights: scoring_engine::default_weights(),
        }
    }

    pub fn with_weights(mut self, weights: HashMap<String, f64>) -> Self {
        self.weights = weights;
        self
    }

    /// Scrape every (adapter, target) pair concurrently, then run the
    /// prefilter → analyzer → scoring → persistence chain sequentially over
    /// the merged post list. The analyzer's own pacing mutex is what actually
    /// serializes LLM calls across targets (§5) — no extra lock needed here.
    pub async fn run_discovery(
        &self,
        targets: TargetMap,
        limit_per_target: usize,
        min_score: f64,
    ) -> Vec<DiscoveryResult> {
        let posts = self.fetch_all(targets, limit_per_target).await;

        let mut results = Vec::new();
        for post in posts {
            if !passes_prefilter(&post) {
                continue;
            }

            let pain = self.analyzer.analyze(&post).await;
            let score =
                match compute_opportunity_score(&post, &pain, self.store.as_ref(), &self.weights, Utc::now()) {
                    Ok(score) => score,
                    Err(e) => {
                        error!(post_id = %post.id, error = %e, "scoring failed");
                        continue;
                    }
                };

            if score.final_score < min_score {
                continue;
            }

            if let Err(e) = self.store.save_post(&post) {
                error!(post_id = %post.id, error = %e, "failed to persist post");
            }
            if let Err(e) = self.store.save_signal(&post.id, &pain) {
                error!(post_id = %post.id, error = %e, "failed to persist signal");
            }
            if let Err(e) = self.store.save_opportunity_score(&score) {
                error!(post_id = %post.id, error = %e, "failed to persist score");
            }

            results.push(DiscoveryResult { post, pain, score });
        }

        // Sorted by `composite_value` descending for backward compatibility
        // (spec.md §4.7, §5), not by `final_score` — `final_score` is still
        // what `min_score` thresholds against above.
        results.sort_by(|a, b| {
            b.pain
                .composite_value
                .partial_cmp(&a.pain.composite_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    async fn fetch_all(&self, targets: TargetMap, limit_per_target: usize) -> Vec<Post> {
        let mut joins = JoinSet::new();

        for (adapter_name, adapter_targets) in targets {
            let adapter = match self.registry.get_scraper(&adapter_name) {
                Ok(adapter) => adapter,
                Err(e) => {
                    error!(adapter = %adapter_name, error = %e, "unknown adapter, skipping");
                    continue;
                }
            };

            for target in adapter_targets {
                let adapter = adapter.clone();
                let adapter_name = adapter_name.clone();
                joins.spawn(async move {
                    let result = adapter.scrape(&target, limit_per_target).await;
                    (adapter_name, target, result)
                });
            }
        }

        let mut posts = Vec::new();
        while let Some(joined) = joins.join_next().await {
            match joined {
                Ok((adapter_name, target, Ok(batch))) => {
                    info!(adapter = %adapter_name, target = %target, count = batch.len(), "scrape complete");
                    posts.extend(batch);
                }
                Ok((adapter_name, target, Err(e))) => {
                    error!(adapter = %adapter_name, target = %target, error = %e, "scrape failed");
                }
                Err(e) => warn!(error = %e, "scrape task panicked or was cancelled"),
            }
        }
        posts
    }

    /// Re-invoke `run_discovery` on a cron schedule. No dedup between runs —
    /// every invocation is a fresh pass (open question in spec.md §9,
    /// resolved against periodic deduplication to match `monitor.py`).
    pub async fn schedule(
        self: Arc<Self>,
        cron: &str,
        targets: TargetMap,
        limit_per_target: usize,
        min_score: f64,
    ) -> Result<tokio_cron_scheduler::JobScheduler, ScheduleError> {
        use tokio_cron_scheduler::{Job, JobScheduler};

        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| ScheduleError::Scheduler(e.to_string()))?;

        let orchestrator = self.clone();
        let job = Job::new_async(cron, move |_uuid, _locked| {
            let orchestrator = orchestrator.clone();
            let targets = targets.clone();
            Box::pin(async move {
                let results = orchestrator
                    .run_discovery(targets, limit_per_target, min_score)
                    .await;
                info!(count = results.len(), "periodic discovery run complete");
            })
        })
        .map_err(|e| ScheduleError::Job(e.to_string()))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| ScheduleError::Scheduler(e.to_string()))?;

        scheduler
            .start()
            .await
            .map_err(|e| ScheduleError::Scheduler(e.to_string()))?;

        Ok(scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common_types::Capability;
    use error_types::AdapterError;
    use llm_orchestrator::LlmClient;
    use std::time::Duration;

    struct StaticAdapter {
        posts: Vec<Post>,
    }

    #[async_trait]
    impl source_adapters::SourceAdapter for StaticAdapter {
        fn name(&self) -> &str {
            "discussion-forum"
        }

        fn platform(&self) -> &str {
            "stub"
        }

        fn capabilities(&self) -> &[Capability] {
            &[]
        }

        async fn scrape(&self, _target: &str, _limit: usize) -> Result<Vec<Post>, AdapterError> {
            Ok(self.posts.clone())
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn sample_post(id: &str, upvotes: u64) -> Post {
        Post {
            id: id.to_string(),
            source: "discussion-forum".to_string(),
            title: "Why is there no good tool for X".into(),
            body: Some("I've tried everything, willing to pay for a SaaS alternative".into()),
            author: "a".into(),
            url: "https://example.com".into(),
            upvotes,
            comments_count: 10,
            created_at: Utc::now(),
            channel: Some("r/test".into()),
            subreddit: Some("test".into()),
            sentiment_label: None,
            sentiment_intensity: 0.0,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn filters_low_engagement_and_persists_survivors() {
        let mut registry = Registry::new();
        registry.register_scraper(Arc::new(StaticAdapter {
            posts: vec![sample_post("forum_low", 1), sample_post("forum_high", 50)],
        }));

        let llm = Arc::new(LlmClient::mock(
            r#"{"score":0.9,"reasoning":"strong","validation_score":0.8,"sentiment_label":"desperate","sentiment_intensity":0.9}"#,
            Duration::from_millis(0),
        ));
        let analyzer = Arc::new(PainAnalyzer::new(llm));
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.initialize().unwrap();

        let orchestrator = DiscoveryOrchestrator::new(Arc::new(registry), analyzer, store.clone());

        let mut targets = TargetMap::new();
        targets.insert("discussion-forum".to_string(), vec!["test".to_string()]);

        let results = orchestrator.run_discovery(targets, 50, 0.1).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].post.id, "forum_high");
        assert!(store.get_post("forum_high").unwrap().is_some());
        assert!(store.get_post("forum_low").unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_adapter_is_skipped_not_fatal() {
        let registry = Registry::new();
        let llm = Arc::new(LlmClient::mock("{}", Duration::from_millis(0)));
        let analyzer = Arc::new(PainAnalyzer::new(llm));
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.initialize().unwrap();

        let orchestrator = DiscoveryOrchestrator::new(Arc::new(registry), analyzer, store);
        let mut targets = TargetMap::new();
        targets.insert("missing-adapter".to_string(), vec!["x".to_string()]);

        let results = orchestrator.run_discovery(targets, 10, 0.1).await;
        assert!(results.is_empty());
    }
}
