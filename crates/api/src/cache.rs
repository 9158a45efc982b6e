use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// LLM extraction responses keyed by model + input text.
pub struct Cache {
    llm_responses: Arc<DashMap<String, String>>,
    max_entries: usize,
}

impl Cache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            llm_responses: Arc::new(DashMap::new()),
            max_entries,
        }
    }

    pub fn set_llm_response(&self, model: &str, text: &str, response: String) {
        if self.max_entries == 0 {
            return;
        }
        if self.llm_responses.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self.llm_responses.iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.llm_responses.remove(&key);
            }
        }
        self.llm_responses.insert(hash_key(model, text), response);
    }

    pub fn get_llm_response(&self, model: &str, text: &str) -> Option<String> {
        self.llm_responses
            .get(&hash_key(model, text))
            .map(|r| r.value().clone())
    }

    pub fn remove_llm_response(&self, model: &str, text: &str) {
        self.llm_responses.remove(&hash_key(model, text));
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            llm_responses_cached: self.llm_responses.len(),
            max_entries: self.max_entries,
        }
    }
}

fn hash_key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, serde::Serialize)]
pub struct CacheStats {
    pub llm_responses_cached: usize,
    pub max_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_scoped_by_model() {
        let cache = Cache::new(10);
        cache.set_llm_response("llama3", "Einstein was born in Ulm.", "{}".to_string());

        assert_eq!(cache.get_llm_response("llama3", "Einstein was born in Ulm.").as_deref(), Some("{}"));
        assert!(cache.get_llm_response("mistral", "Einstein was born in Ulm.").is_none());
    }

    #[test]
    fn test_eviction_bounds_size() {
        let cache = Cache::new(4);
        for i in 0..20 {
            cache.set_llm_response("m", &format!("text {}", i), i.to_string());
        }
        assert!(cache.stats().llm_responses_cached <= 4);
        assert!(cache.get_llm_response("m", "text 19").is_some());
    }

    #[test]
    fn test_remove_entry() {
        let cache = Cache::new(10);
        cache.set_llm_response("llama3", "text", "{}".to_string());
        cache.remove_llm_response("llama3", "text");
        assert!(cache.get_llm_response("llama3", "text").is_none());
        assert_eq!(cache.stats().llm_responses_cached, 0);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = Cache::new(0);
        cache.set_llm_response("m", "t", "r".to_string());
        assert!(cache.get_llm_response("m", "t").is_none());
    }
}
