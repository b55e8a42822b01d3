//! Completion statistics for the overview screen.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::TranslationStore;
use crate::error::GridResult;

/// Completion of one locale within one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocaleStats {
    /// Number of trans units in the domain
    pub keys: i64,

    /// Number of those units with non-empty content in this locale
    pub translated: i64,

    /// Completion as a percentage (0-100), rounded to one decimal
    pub completed: f64,
}

impl LocaleStats {
    fn new(keys: i64, translated: i64) -> Self {
        let completed = if keys > 0 {
            ((translated as f64 / keys as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            keys,
            translated,
            completed,
        }
    }
}

/// Stats keyed by domain, then locale.
pub type DomainStats = BTreeMap<String, BTreeMap<String, LocaleStats>>;

/// Computes per-domain, per-locale completion from the store.
pub struct StatsAggregator {
    store: TranslationStore,
    locales: Vec<String>,
}

impl StatsAggregator {
    pub fn new(store: TranslationStore, locales: Vec<String>) -> Self {
        Self { store, locales }
    }

    /// Completion for every domain and every managed locale.
    pub async fn stats(&self) -> GridResult<DomainStats> {
        let keys_by_domain = self.store.count_by_domain().await?;

        let mut translated: BTreeMap<(String, String), i64> = BTreeMap::new();
        for (domain, locale, count) in self.store.count_translated().await? {
            translated.insert((domain, locale), count);
        }

        let mut stats = DomainStats::new();
        for (domain, keys) in keys_by_domain {
            let per_locale = self
                .locales
                .iter()
                .map(|locale| {
                    let done = translated
                        .get(&(domain.clone(), locale.clone()))
                        .copied()
                        .unwrap_or(0);
                    (locale.clone(), LocaleStats::new(keys, done))
                })
                .collect();
            stats.insert(domain, per_locale);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{locales, seed};

    #[test]
    fn test_completed_percentage() {
        assert_eq!(LocaleStats::new(3, 1).completed, 33.3);
        assert_eq!(LocaleStats::new(3, 2).completed, 66.7);
        assert_eq!(LocaleStats::new(4, 4).completed, 100.0);
        assert_eq!(LocaleStats::new(0, 0).completed, 0.0);
    }

    #[tokio::test]
    async fn test_empty_store_has_no_domains() {
        let store = TranslationStore::in_memory().await.unwrap();
        let aggregator = StatsAggregator::new(store, locales(&["en"]));
        assert!(aggregator.stats().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_per_domain_and_locale() {
        let store = TranslationStore::in_memory().await.unwrap();
        seed(&store, "messages", "hello", &[("en", "Hello"), ("fr", "Bonjour")]).await;
        seed(&store, "messages", "bye", &[("en", "Bye")]).await;
        seed(&store, "validators", "required", &[("de", "Pflicht")]).await;

        let aggregator = StatsAggregator::new(store, locales(&["en", "fr"]));
        let stats = aggregator.stats().await.unwrap();

        let messages = &stats["messages"];
        assert_eq!(messages["en"], LocaleStats::new(2, 2));
        assert_eq!(messages["fr"].translated, 1);
        assert_eq!(messages["fr"].completed, 50.0);

        // Unmanaged locales are ignored, managed ones always present
        let validators = &stats["validators"];
        assert_eq!(validators.len(), 2);
        assert_eq!(validators["en"].translated, 0);
        assert!(!validators.contains_key("de"));
    }
}
