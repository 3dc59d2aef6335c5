use std::sync::Arc;

use dashmap::DashMap;

use crate::models::config::IndicatorConfig;
use crate::utils::codegen::generate_pinescript;

/// Memoizes generated scripts by configuration.
///
/// Keyed on [`IndicatorConfig::cache_key`], which covers exactly what the
/// generator prints, so a hit returns the text a fresh generation would.
#[derive(Debug, Default)]
pub struct ScriptCache {
    scripts: DashMap<String, Arc<str>>,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached script for `config`, generating it on a miss.
    pub fn get_or_generate(&self, config: &IndicatorConfig) -> Arc<str> {
        let key = config.cache_key();
        if let Some(hit) = self.scripts.get(&key) {
            return Arc::clone(hit.value());
        }

        let script: Arc<str> = Arc::from(generate_pinescript(config));
        Arc::clone(self.scripts.entry(key).or_insert(script).value())
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn clear(&self) {
        self.scripts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ModelType;

    #[test]
    fn test_hit_matches_fresh_generation() {
        let cache = ScriptCache::new();
        let config = IndicatorConfig::default();

        let first = cache.get_or_generate(&config);
        let second = cache.get_or_generate(&config);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&*first, generate_pinescript(&config));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_configs_get_distinct_entries() {
        let cache = ScriptCache::new();
        let logistic = IndicatorConfig::default();
        let mut svm = logistic.clone();
        svm.model = ModelType::SvmLinearKernel;

        let a = cache.get_or_generate(&logistic);
        let b = cache.get_or_generate(&svm);
        assert_ne!(a, b);
        assert_eq!(&*b, generate_pinescript(&svm));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_equivalent_precision_shares_entry() {
        let cache = ScriptCache::new();
        let a = IndicatorConfig::default();
        let mut b = a.clone();
        b.bias = 0.100004;

        assert_eq!(cache.get_or_generate(&a), cache.get_or_generate(&b));
        assert_eq!(cache.len(), 1);
        assert_eq!(generate_pinescript(&a), generate_pinescript(&b));
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(ScriptCache::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let mut config = IndicatorConfig::default();
                    config.lookback = 100 + (i % 2);
                    cache.get_or_generate(&config)
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 2);
    }
}
