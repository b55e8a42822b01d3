//! Translation grid: listing, sorting, filtering, inline edits and deletion.
//!
//! The grid keeps no state between requests. Every call reads from or writes
//! to the [`TranslationStore`] and shapes the result for the presentation layer.

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::CacheInvalidator;
use crate::db::TranslationStore;
use crate::error::{GridError, GridResult};
use crate::locales::LocaleRegistry;
use crate::models::{ColumnFilter, NewTransUnit, Sort, TransUnit, Translation};

/// Column value the grid sends when a translation cell is edited
pub const TRANSLATION_COLUMN: &str = "translation";
/// Column value the grid sends when a row's delete button is used
pub const DELETE_COLUMN: &str = "delete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    pub page_size: u32,
    pub auto_cache_clean: bool,
    /// Treat every column other than `translation` as a delete request
    pub legacy_delete_on_any_column: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            auto_cache_clean: false,
            legacy_delete_on_any_column: false,
        }
    }
}

/// One page of the grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPage {
    pub rows: Vec<TransUnit>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// What a save-cell request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellIntent {
    UpdateContent {
        trans_unit_id: i64,
        locale: String,
        content: String,
    },
    DeleteTransUnit {
        trans_unit_id: i64,
    },
}

impl CellIntent {
    /// Decode the legacy save-cell request into an intent.
    pub fn from_request(
        trans_unit_id: i64,
        locale: &str,
        column: &str,
        new_value: &str,
        legacy_delete_on_any_column: bool,
    ) -> GridResult<Self> {
        match column {
            TRANSLATION_COLUMN => Ok(Self::UpdateContent {
                trans_unit_id,
                locale: locale.to_string(),
                content: new_value.to_string(),
            }),
            DELETE_COLUMN => Ok(Self::DeleteTransUnit { trans_unit_id }),
            _ if legacy_delete_on_any_column => Ok(Self::DeleteTransUnit { trans_unit_id }),
            other => Err(GridError::invalid(format!("Unknown grid column: {}", other))),
        }
    }
}

/// Parse a 1-based page number. Missing or blank means the first page.
pub fn parse_page(raw: Option<&str>) -> GridResult<u32> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(1),
        Some(s) => match s.parse::<u32>() {
            Ok(0) => Err(GridError::invalid("Page numbers start at 1")),
            Ok(page) => Ok(page),
            Err(_) => Err(GridError::invalid(format!("Not a page number: {}", s))),
        },
    }
}

pub struct GridService {
    store: TranslationStore,
    locales: LocaleRegistry,
    cache: CacheInvalidator,
    options: GridOptions,
}

impl GridService {
    pub fn new(
        store: TranslationStore,
        locales: LocaleRegistry,
        cache: CacheInvalidator,
        options: GridOptions,
    ) -> Self {
        Self {
            store,
            locales,
            cache,
            options,
        }
    }

    pub fn locales(&self) -> &LocaleRegistry {
        &self.locales
    }

    pub fn store(&self) -> &TranslationStore {
        &self.store
    }

    pub fn options(&self) -> GridOptions {
        self.options
    }

    /// One page of trans units with their managed-locale translations.
    pub async fn list_page(&self, page: u32, page_size: u32, sort: &Sort) -> GridResult<GridPage> {
        if page == 0 {
            return Err(GridError::invalid("Page numbers start at 1"));
        }
        if page_size == 0 {
            return Err(GridError::invalid("Page size must be greater than zero"));
        }

        let rows = self
            .store
            .list(self.locales.locales(), page, page_size, sort)
            .await?;
        let total = self.store.count().await?;

        Ok(GridPage {
            rows,
            total,
            page,
            page_size,
        })
    }

    /// First page in default order with the configured page size.
    pub async fn default_page(&self) -> GridResult<GridPage> {
        self.list_page(1, self.options.page_size, &Sort::default()).await
    }

    /// Rows matching a column filter. An empty value yields the default page.
    pub async fn filter(
        &self,
        column: &str,
        value: &str,
        column_type: &str,
    ) -> GridResult<Vec<TransUnit>> {
        if value.is_empty() {
            return Ok(self.default_page().await?.rows);
        }

        let filter = ColumnFilter::parse(column, value, column_type, &self.locales)?;
        self.store.find_by_filter(&filter, self.locales.locales()).await
    }

    /// Dispatch a save-cell request to an edit or a delete.
    pub async fn update_cell(
        &self,
        trans_unit_id: i64,
        locale: &str,
        column: &str,
        new_value: &str,
    ) -> GridResult<CellIntent> {
        let intent = CellIntent::from_request(
            trans_unit_id,
            locale,
            column,
            new_value,
            self.options.legacy_delete_on_any_column,
        )?;

        match &intent {
            CellIntent::UpdateContent {
                trans_unit_id,
                locale,
                content,
            } => {
                self.update_translation_content(*trans_unit_id, locale, content)
                    .await?;
            }
            CellIntent::DeleteTransUnit { trans_unit_id } => {
                self.delete_trans_unit(*trans_unit_id).await?;
            }
        }

        Ok(intent)
    }

    /// Set the content of one translation, creating it when absent.
    pub async fn update_translation_content(
        &self,
        trans_unit_id: i64,
        locale: &str,
        content: &str,
    ) -> GridResult<Translation> {
        if !self.locales.contains(locale) {
            return Err(GridError::not_found(format!("Locale {} is not managed", locale)));
        }
        self.find_trans_unit(trans_unit_id).await?;

        let mut uow = self.store.begin().await?;
        uow.save_translation(trans_unit_id, locale, content).await?;
        uow.flush().await?;

        info!("Updated trans unit {} [{}]", trans_unit_id, locale);

        if self.options.auto_cache_clean {
            self.clean_after_commit(&[locale.to_string()]);
        }

        self.find_translation(trans_unit_id, locale).await
    }

    /// Remove a trans unit together with all its translations.
    pub async fn delete_trans_unit(&self, trans_unit_id: i64) -> GridResult<()> {
        let mut uow = self.store.begin().await?;
        if !uow.delete_trans_unit(trans_unit_id).await? {
            return Err(GridError::not_found(format!(
                "Trans unit {} not found",
                trans_unit_id
            )));
        }
        uow.flush().await?;

        info!("Deleted trans unit {}", trans_unit_id);

        if self.options.auto_cache_clean {
            self.clean_after_commit(self.locales.locales());
        }
        Ok(())
    }

    /// Register a new trans unit with content for managed locales.
    pub async fn create_trans_unit(&self, unit: NewTransUnit) -> GridResult<TransUnit> {
        let unit = NewTransUnit {
            domain: unit.domain.trim().to_string(),
            key: unit.key.trim().to_string(),
            translations: unit.translations,
        };

        if unit.domain.is_empty() {
            return Err(GridError::invalid("Domain must not be blank"));
        }
        if unit.key.is_empty() {
            return Err(GridError::invalid("Key must not be blank"));
        }
        if let Some((locale, _)) = unit
            .translations
            .iter()
            .find(|(locale, _)| !self.locales.contains(locale))
        {
            return Err(GridError::invalid(format!("Locale {} is not managed", locale)));
        }

        let mut uow = self.store.begin().await?;
        let id = uow.save_trans_unit(&unit).await?;
        uow.flush().await?;

        info!("Created trans unit {} ({}/{})", id, unit.domain, unit.key);

        if self.options.auto_cache_clean {
            self.clean_after_commit(self.locales.locales());
        }

        self.find_trans_unit(id).await
    }

    /// Automatic cleaning runs after the write is committed, so a failure
    /// leaves stale catalogues behind but does not fail the edit.
    fn clean_after_commit(&self, locales: &[String]) {
        if let Err(e) = self.cache.remove_locales_cache_files(locales) {
            warn!("Edit saved but catalogue cache was not cleared: {}", e);
        }
    }

    /// Drop cached catalogues of every managed locale. Safe to repeat.
    pub fn invalidate_cache(&self) -> GridResult<usize> {
        let removed = self
            .cache
            .remove_locales_cache_files(self.locales.locales())
            .map_err(|e| {
                warn!("Failed to clear catalogue cache: {}", e);
                e
            })?;
        Ok(removed)
    }

    pub async fn find_translation(&self, trans_unit_id: i64, locale: &str) -> GridResult<Translation> {
        self.store
            .find_translation(trans_unit_id, locale)
            .await?
            .ok_or_else(|| {
                GridError::not_found(format!(
                    "No {} translation for trans unit {}",
                    locale, trans_unit_id
                ))
            })
    }

    pub async fn find_trans_unit(&self, trans_unit_id: i64) -> GridResult<TransUnit> {
        self.store
            .find_trans_unit(trans_unit_id, self.locales.locales())
            .await?
            .ok_or_else(|| GridError::not_found(format!("Trans unit {} not found", trans_unit_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::seed;
    use crate::models::SortColumn;
    use proptest::prelude::*;
    use tempfile::TempDir;

    async fn service_with(options: GridOptions, cache_dir: &std::path::Path) -> GridService {
        let store = TranslationStore::in_memory().await.expect("Should open store");
        GridService::new(
            store,
            LocaleRegistry::new(["en", "fr"]).unwrap(),
            CacheInvalidator::new(cache_dir),
            options,
        )
    }

    async fn seeded_service(cache_dir: &std::path::Path) -> GridService {
        let service = service_with(GridOptions::default(), cache_dir).await;
        seed(service.store(), "messages", "hello", &[("en", "Hello"), ("fr", "Bonjour")]).await;
        seed(service.store(), "messages", "bye", &[("en", "Bye")]).await;
        seed(service.store(), "validators", "required", &[("en", "Required")]).await;
        service
    }

    // ==================== Page Parsing Tests ====================

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(None).unwrap(), 1);
        assert_eq!(parse_page(Some("")).unwrap(), 1);
        assert_eq!(parse_page(Some(" 3 ")).unwrap(), 3);
        assert!(matches!(parse_page(Some("0")), Err(GridError::InvalidArgument(_))));
        assert!(matches!(parse_page(Some("-1")), Err(GridError::InvalidArgument(_))));
        assert!(matches!(parse_page(Some("two")), Err(GridError::InvalidArgument(_))));
    }

    // ==================== Cell Intent Tests ====================

    #[test]
    fn test_cell_intent_dispatch() {
        assert_eq!(
            CellIntent::from_request(1, "fr", "translation", "Salut", false).unwrap(),
            CellIntent::UpdateContent {
                trans_unit_id: 1,
                locale: "fr".to_string(),
                content: "Salut".to_string(),
            }
        );
        assert_eq!(
            CellIntent::from_request(1, "fr", "delete", "", false).unwrap(),
            CellIntent::DeleteTransUnit { trans_unit_id: 1 }
        );
        assert!(matches!(
            CellIntent::from_request(1, "fr", "domain", "", false),
            Err(GridError::InvalidArgument(_))
        ));
        assert_eq!(
            CellIntent::from_request(1, "fr", "domain", "", true).unwrap(),
            CellIntent::DeleteTransUnit { trans_unit_id: 1 }
        );
    }

    // ==================== list_page Tests ====================

    #[tokio::test]
    async fn test_list_page_reports_total() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;

        let page = service.list_page(1, 2, &Sort::default()).await.unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 2);
    }

    #[tokio::test]
    async fn test_list_page_rejects_zero() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;

        assert!(matches!(
            service.list_page(0, 20, &Sort::default()).await,
            Err(GridError::InvalidArgument(_))
        ));
        assert!(matches!(
            service.list_page(1, 0, &Sort::default()).await,
            Err(GridError::InvalidArgument(_))
        ));
    }

    // ==================== filter Tests ====================

    #[tokio::test]
    async fn test_empty_filter_equals_default_page() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;

        let filtered = service.filter("domain", "", "exact").await.unwrap();
        let default = service.default_page().await.unwrap();
        assert_eq!(filtered, default.rows);
    }

    #[tokio::test]
    async fn test_filter_locale_fr_shows_bonjour() {
        let dir = TempDir::new().unwrap();
        let service = service_with(GridOptions::default(), dir.path()).await;
        seed(service.store(), "messages", "hello", &[("en", "Hello"), ("fr", "Bonjour")]).await;

        let rows = service.filter("locale", "fr", "exact").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].translations.len(), 1);
        assert_eq!(rows[0].translations[0].content, "Bonjour");
    }

    #[tokio::test]
    async fn test_filter_no_match_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;

        let rows = service.filter("key", "nothing-like-this", "text").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_filter_unknown_column_is_invalid() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;

        assert!(matches!(
            service.filter("owner", "x", "exact").await,
            Err(GridError::InvalidArgument(_))
        ));
    }

    // ==================== update_cell Tests ====================

    #[tokio::test]
    async fn test_update_then_find_returns_new_content() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;
        let id = service.filter("key", "hello", "exact").await.unwrap()[0].id;

        service.update_cell(id, "fr", "translation", "x").await.unwrap();
        assert_eq!(service.find_translation(id, "fr").await.unwrap().content, "x");
    }

    #[tokio::test]
    async fn test_update_creates_missing_translation() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;
        let id = service.filter("key", "bye", "exact").await.unwrap()[0].id;

        assert!(service.find_translation(id, "fr").await.is_err());
        let translation = service.update_translation_content(id, "fr", "Au revoir").await.unwrap();
        assert_eq!(translation.content, "Au revoir");
    }

    #[tokio::test]
    async fn test_update_unknown_unit_or_locale_is_not_found() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;
        let id = service.filter("key", "hello", "exact").await.unwrap()[0].id;

        assert!(matches!(
            service.update_cell(9999, "fr", "translation", "x").await,
            Err(GridError::NotFound(_))
        ));
        assert!(matches!(
            service.update_cell(id, "de", "translation", "x").await,
            Err(GridError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_then_lookup_is_not_found() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;
        let id = service.filter("key", "hello", "exact").await.unwrap()[0].id;

        service.update_cell(id, "fr", "delete", "").await.unwrap();

        assert!(matches!(service.find_trans_unit(id).await, Err(GridError::NotFound(_))));
        assert!(matches!(service.find_translation(id, "fr").await, Err(GridError::NotFound(_))));
        assert!(matches!(
            service.update_cell(id, "fr", "delete", "").await,
            Err(GridError::NotFound(_))
        ));
        assert_eq!(service.store().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_auto_cache_clean_on_edit() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("catalogue.fr.abc.php"), "x").unwrap();
        std::fs::write(dir.path().join("catalogue.en.abc.php"), "x").unwrap();

        let options = GridOptions {
            auto_cache_clean: true,
            ..GridOptions::default()
        };
        let service = service_with(options, dir.path()).await;
        let id = seed(service.store(), "messages", "hello", &[("fr", "Bonjour")]).await;

        service.update_cell(id, "fr", "translation", "Salut").await.unwrap();

        assert!(!dir.path().join("catalogue.fr.abc.php").exists());
        assert!(dir.path().join("catalogue.en.abc.php").exists());
    }

    #[tokio::test]
    async fn test_auto_cache_clean_failure_keeps_edit() {
        let dir = TempDir::new().unwrap();
        // A plain file where the cache directory should be makes listing fail
        let not_a_dir = dir.path().join("cache");
        std::fs::write(&not_a_dir, "x").unwrap();

        let options = GridOptions {
            auto_cache_clean: true,
            ..GridOptions::default()
        };
        let service = service_with(options, &not_a_dir).await;
        let id = seed(service.store(), "messages", "hello", &[("fr", "Bonjour")]).await;
        let other = seed(service.store(), "messages", "bye", &[("en", "Bye")]).await;

        let translation = service
            .update_translation_content(id, "fr", "Salut")
            .await
            .expect("Committed edit should report success");
        assert_eq!(translation.content, "Salut");

        service.delete_trans_unit(other).await.expect("Committed delete should report success");
        assert_eq!(service.store().count().await.unwrap(), 1);

        // Explicit invalidation still reports the failure
        assert!(matches!(service.invalidate_cache(), Err(GridError::Cache(_))));
    }

    // ==================== invalidate_cache Tests ====================

    #[tokio::test]
    async fn test_invalidate_cache_twice() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("catalogue.en.abc.php"), "x").unwrap();
        let service = seeded_service(dir.path()).await;

        assert_eq!(service.invalidate_cache().unwrap(), 1);
        assert_eq!(service.invalidate_cache().unwrap(), 0);
    }

    // ==================== create_trans_unit Tests ====================

    #[tokio::test]
    async fn test_create_trans_unit() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;

        let unit = service
            .create_trans_unit(NewTransUnit {
                domain: " messages ".to_string(),
                key: "welcome".to_string(),
                translations: vec![
                    ("en".to_string(), "Welcome".to_string()),
                    ("fr".to_string(), String::new()),
                ],
            })
            .await
            .unwrap();

        assert_eq!(unit.domain, "messages");
        assert_eq!(unit.translations.len(), 1);
        assert_eq!(unit.translation("en").unwrap().content, "Welcome");
    }

    #[tokio::test]
    async fn test_create_trans_unit_validation() {
        let dir = TempDir::new().unwrap();
        let service = seeded_service(dir.path()).await;

        let blank_key = NewTransUnit {
            domain: "messages".to_string(),
            key: "  ".to_string(),
            translations: Vec::new(),
        };
        assert!(matches!(
            service.create_trans_unit(blank_key).await,
            Err(GridError::InvalidArgument(_))
        ));

        let unmanaged = NewTransUnit {
            domain: "messages".to_string(),
            key: "other".to_string(),
            translations: vec![("de".to_string(), "Andere".to_string())],
        };
        assert!(matches!(
            service.create_trans_unit(unmanaged).await,
            Err(GridError::InvalidArgument(_))
        ));

        let duplicate = NewTransUnit {
            domain: "messages".to_string(),
            key: "hello".to_string(),
            translations: Vec::new(),
        };
        assert!(matches!(
            service.create_trans_unit(duplicate).await,
            Err(GridError::InvalidArgument(_))
        ));
    }

    // ==================== Pagination Properties ====================

    fn sort_strategy() -> impl Strategy<Value = Sort> {
        let column = prop_oneof![
            Just(None),
            Just(Some(SortColumn::Id)),
            Just(Some(SortColumn::Domain)),
            Just(Some(SortColumn::Key)),
            Just(Some(SortColumn::Locale("en".to_string()))),
        ];
        (column, any::<bool>()).prop_map(|(column, desc)| Sort {
            column,
            direction: if desc {
                crate::models::SortDirection::Desc
            } else {
                crate::models::SortDirection::Asc
            },
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_pages_partition_sorted_set(
            units in prop::collection::btree_map("[a-z]{1,4}", ("[ab]", "[a-c]{0,2}"), 0..30),
            page_size in 1u32..8,
            sort in sort_strategy(),
        ) {
            let dir = TempDir::new().unwrap();
            let (pages, full, total) = tokio_test::block_on(async {
                let service = service_with(GridOptions::default(), dir.path()).await;
                for (key, (domain, content)) in &units {
                    seed(service.store(), domain, key, &[("en", content.as_str())]).await;
                }

                let full = service.list_page(1, 1000, &sort).await.unwrap();
                let mut pages = Vec::new();
                let mut page = 1;
                loop {
                    let result = service.list_page(page, page_size, &sort).await.unwrap();
                    if result.rows.is_empty() {
                        break;
                    }
                    pages.push(result.rows.iter().map(|u| u.id).collect::<Vec<_>>());
                    page += 1;
                }
                (pages, full.rows.iter().map(|u| u.id).collect::<Vec<_>>(), full.total)
            });

            prop_assert_eq!(total as usize, units.len());
            prop_assert_eq!(full.len(), units.len());
            for page in &pages {
                prop_assert!(page.len() <= page_size as usize);
            }

            let concatenated: Vec<i64> = pages.into_iter().flatten().collect();
            prop_assert_eq!(&concatenated, &full);

            let mut unique = concatenated.clone();
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(unique.len(), concatenated.len());
        }
    }
}
