//! Registry (C8): an in-memory, read-mostly service locator. Grounded on
//! `original_source/copilot/providers/registry.py`'s `ProviderRegistry`
//! (name-keyed maps, unknown-name errors naming the available set) and the
//! `HashMap`-of-handles idiom from `ecosystem_manager`.

use std::collections::HashMap;
use std::sync::Arc;

use common_types::Capability;
use error_types::ConfigError;
use llm_orchestrator::LlmClient;
use opportunity_store::Store;
use source_adapters::SourceAdapter;

#[derive(Default)]
pub struct Registry {
    scrapers: HashMap<String, Arc<dyn SourceAdapter>>,
    llms: HashMap<String, Arc<LlmClient>>,
    stores: HashMap<String, Arc<Store>>,
}

fn unknown(kind: &str, name: &str, available: impl Iterator<Item = String>) -> ConfigError {
    let available: Vec<String> = available.collect();
    let available = if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    };
    ConfigError::UnknownAdapter(format!("{kind} '{name}' not registered. Available: {available}"))
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_scraper(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.scrapers.insert(adapter.name().to_string(), adapter);
    }

    pub fn register_llm(&mut self, name: impl Into<String>, llm: Arc<LlmClient>) {
        self.llms.insert(name.into(), llm);
    }

    pub fn register_store(&mut self, name: impl Into<String>, store: Arc<Store>) {
        self.stores.insert(name.into(), store);
    }

    pub fn get_scraper(&self, name: &str) -> Result<Arc<dyn SourceAdapter>, ConfigError> {
        self.scrapers
            .get(name)
            .cloned()
            .ok_or_else(|| unknown("scraper", name, self.scrapers.keys().cloned()))
    }

    pub fn get_llm(&self, name: &str) -> Result<Arc<LlmClient>, ConfigError> {
        self.llms
            .get(name)
            .cloned()
            .ok_or_else(|| unknown("llm", name, self.llms.keys().cloned()))
    }

    pub fn get_store(&self, name: &str) -> Result<Arc<Store>, ConfigError> {
        self.stores
            .get(name)
            .cloned()
            .ok_or_else(|| unknown("store", name, self.stores.keys().cloned()))
    }

    pub fn list_scraper_names(&self) -> Vec<String> {
        self.scrapers.keys().cloned().collect()
    }

    pub fn get_all_scrapers(&self) -> Vec<Arc<dyn SourceAdapter>> {
        self.scrapers.values().cloned().collect()
    }

    pub fn get_scrapers_with_capability(&self, cap: Capability) -> Vec<Arc<dyn SourceAdapter>> {
        self.scrapers
            .values()
            .filter(|s| s.capabilities().contains(&cap))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common_types::Post;
    use error_types::AdapterError;

    struct StubAdapter {
        name: String,
        caps: Vec<Capability>,
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        fn platform(&self) -> &str {
            "stub"
        }

        fn capabilities(&self) -> &[Capability] {
            &self.caps
        }

        async fn scrape(&self, _target: &str, _limit: usize) -> Result<Vec<Post>, AdapterError> {
            Ok(vec![])
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    #[test]
    fn unknown_scraper_lists_available_names() {
        let mut registry = Registry::new();
        registry.register_scraper(Arc::new(StubAdapter {
            name: "discussion-forum".into(),
            caps: vec![],
        }));

        let err = registry.get_scraper("missing").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("discussion-forum"));
        assert!(message.contains("missing"));
    }

    #[test]
    fn filters_by_capability() {
        let mut registry = Registry::new();
        registry.register_scraper(Arc::new(StubAdapter {
            name: "discussion-forum".into(),
            caps: vec![Capability::SortHot],
        }));
        registry.register_scraper(Arc::new(StubAdapter {
            name: "product-launch".into(),
            caps: vec![Capability::Realtime],
        }));

        let hot = registry.get_scrapers_with_capability(Capability::SortHot);
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].name(), "discussion-forum");
    }
}
