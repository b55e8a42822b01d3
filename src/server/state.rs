use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::cache::CacheInvalidator;
use crate::config::{Config, ViewConfig};
use crate::db::TranslationStore;
use crate::grid::{GridOptions, GridService};
use crate::locales::LocaleRegistry;
use crate::profiler::TokenFinder;
use crate::stats::StatsAggregator;

/// Everything the handlers need, shared across requests.
pub struct AppState {
    pub grid: GridService,
    pub stats: StatsAggregator,
    pub view: ViewConfig,
    pub csrf_token: Option<String>,
    /// Present only with dev tools enabled
    pub token_finder: Option<Arc<TokenFinder>>,
}

impl AppState {
    /// Connect the store and wire the services described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let locales = LocaleRegistry::new(config.managed_locales.clone())
            .context("Invalid MANAGED_LOCALES")?;

        let store = TranslationStore::connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database_url))?;

        info!("Managing locales: {}", locales.locales().join(", "));

        Ok(Self::new(store, locales, config))
    }

    /// Wire the services around an already opened store.
    pub fn new(store: TranslationStore, locales: LocaleRegistry, config: &Config) -> Self {
        let stats = StatsAggregator::new(store.clone(), locales.locales().to_vec());
        let grid = GridService::new(
            store,
            locales,
            CacheInvalidator::new(&config.cache_dir),
            GridOptions {
                page_size: config.grid_page_size,
                auto_cache_clean: config.auto_cache_clean,
                legacy_delete_on_any_column: config.legacy_delete_on_any_column,
            },
        );

        let token_finder = config
            .dev_tools_enabled
            .then(|| Arc::new(TokenFinder::new(config.dev_tools_token_limit)));

        Self {
            grid,
            stats,
            view: config.view.clone(),
            csrf_token: config.csrf_token.clone(),
            token_finder,
        }
    }

    pub fn locales(&self) -> &[String] {
        self.grid.locales().locales()
    }
}
