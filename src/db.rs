use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::error::{GridError, GridResult};
use crate::models::{
    ColumnFilter, FilterColumn, FilterMode, NewTransUnit, Sort, SortColumn, TransUnit, Translation,
};

/// Trans unit ids bound per translation query. SQLite caps bound variables
/// at 999 on older builds; the rest of the budget goes to locale codes.
const ID_CHUNK_SIZE: usize = 500;

#[derive(Debug, sqlx::FromRow)]
struct UnitRow {
    id: i64,
    domain: String,
    key_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct TranslationRow {
    trans_unit_id: i64,
    locale: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TranslationRow> for Translation {
    fn from(row: TranslationRow) -> Self {
        Translation {
            locale: row.locale,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Persistence for trans units and their translations.
#[derive(Clone)]
pub struct TranslationStore {
    pool: SqlitePool,
}

impl TranslationStore {
    /// Open the database and create tables
    pub async fn connect(database_url: &str) -> GridResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    /// Private in-memory database, used by tests and demos
    pub async fn in_memory() -> GridResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // A memory database lives as long as its single connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> GridResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS trans_unit (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                domain TEXT NOT NULL,
                key_name TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                UNIQUE (domain, key_name)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS translation (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trans_unit_id INTEGER NOT NULL REFERENCES trans_unit(id) ON DELETE CASCADE,
                locale TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                UNIQUE (trans_unit_id, locale)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_translation_locale ON translation (locale)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// One page of trans units with translations restricted to `locales`.
    ///
    /// `page` is 1-based. Ties are broken by id so pages never overlap.
    pub async fn list(
        &self,
        locales: &[String],
        page: u32,
        page_size: u32,
        sort: &Sort,
    ) -> GridResult<Vec<TransUnit>> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        let dir = sort.direction.as_sql();

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT tu.id, tu.domain, tu.key_name, tu.created_at, tu.updated_at FROM trans_unit tu",
        );

        match &sort.column {
            None => {
                qb.push(" ORDER BY tu.domain ASC, tu.key_name ASC, tu.id ASC");
            }
            Some(SortColumn::Id) => {
                qb.push(format!(" ORDER BY tu.id {}", dir));
            }
            Some(SortColumn::Domain) => {
                qb.push(format!(" ORDER BY tu.domain {}, tu.id ASC", dir));
            }
            Some(SortColumn::Key) => {
                qb.push(format!(" ORDER BY tu.key_name {}, tu.id ASC", dir));
            }
            Some(SortColumn::Locale(locale)) => {
                qb.push(" LEFT JOIN translation s ON s.trans_unit_id = tu.id AND s.locale = ");
                qb.push_bind(locale.clone());
                qb.push(format!(" ORDER BY COALESCE(s.content, '') {}, tu.id ASC", dir));
            }
        }

        qb.push(" LIMIT ");
        qb.push_bind(i64::from(page_size));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let units: Vec<UnitRow> = qb.build_query_as::<UnitRow>().fetch_all(&self.pool).await?;
        debug!("Listed {} trans units (page {})", units.len(), page);

        self.attach_translations(units, locales).await
    }

    /// Total number of trans units
    pub async fn count(&self) -> GridResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trans_unit")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Every trans unit matching `filter`, ordered by domain then key.
    pub async fn find_by_filter(
        &self,
        filter: &ColumnFilter,
        locales: &[String],
    ) -> GridResult<Vec<TransUnit>> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT tu.id, tu.domain, tu.key_name, tu.created_at, tu.updated_at \
             FROM trans_unit tu WHERE ",
        );

        // Locale filters only show the matched locales
        let mut shown: Vec<String> = locales.to_vec();

        match &filter.column {
            FilterColumn::Id(id) => {
                qb.push("tu.id = ");
                qb.push_bind(*id);
            }
            FilterColumn::Domain => push_comparison(&mut qb, "tu.domain", filter),
            FilterColumn::Key => push_comparison(&mut qb, "tu.key_name", filter),
            FilterColumn::Locale => {
                shown.retain(|locale| filter.matches(locale));
                if shown.is_empty() {
                    return Ok(Vec::new());
                }
                qb.push(
                    "EXISTS (SELECT 1 FROM translation t WHERE t.trans_unit_id = tu.id AND t.locale IN (",
                );
                let mut separated = qb.separated(", ");
                for locale in &shown {
                    separated.push_bind(locale.clone());
                }
                separated.push_unseparated("))");
            }
            FilterColumn::Content(locale) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM translation t WHERE t.trans_unit_id = tu.id AND t.locale = ",
                );
                qb.push_bind(locale.clone());
                if filter.mode != FilterMode::Content {
                    qb.push(" AND ");
                    push_comparison(&mut qb, "t.content", filter);
                }
                qb.push(")");
            }
        }

        qb.push(" ORDER BY tu.domain ASC, tu.key_name ASC, tu.id ASC");

        let rows: Vec<UnitRow> = qb.build_query_as::<UnitRow>().fetch_all(&self.pool).await?;
        let mut units = self.attach_translations(rows, &shown).await?;

        // Unicode case folding is not available in SQLite
        if let (FilterColumn::Content(locale), FilterMode::Content) = (&filter.column, filter.mode) {
            units.retain(|unit| {
                unit.translation(locale)
                    .map(|t| filter.matches(&t.content))
                    .unwrap_or(false)
            });
        }

        debug!("Filter matched {} trans units", units.len());
        Ok(units)
    }

    pub async fn find_translation(
        &self,
        trans_unit_id: i64,
        locale: &str,
    ) -> GridResult<Option<Translation>> {
        let row: Option<TranslationRow> = sqlx::query_as(
            "SELECT trans_unit_id, locale, content, created_at, updated_at
             FROM translation WHERE trans_unit_id = ?1 AND locale = ?2",
        )
        .bind(trans_unit_id)
        .bind(locale)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Translation::from))
    }

    pub async fn find_trans_unit(
        &self,
        trans_unit_id: i64,
        locales: &[String],
    ) -> GridResult<Option<TransUnit>> {
        let row: Option<UnitRow> = sqlx::query_as(
            "SELECT id, domain, key_name, created_at, updated_at FROM trans_unit WHERE id = ?1",
        )
        .bind(trans_unit_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_translations(vec![row], locales).await?.pop()),
            None => Ok(None),
        }
    }

    /// Distinct domains, sorted
    pub async fn domains(&self) -> GridResult<Vec<String>> {
        let domains: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT domain FROM trans_unit ORDER BY domain")
                .fetch_all(&self.pool)
                .await?;
        Ok(domains)
    }

    /// Most recent translation update, if any translation exists
    pub async fn latest_updated_at(&self) -> GridResult<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT updated_at FROM translation ORDER BY updated_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(latest)
    }

    /// Number of trans units per domain
    pub async fn count_by_domain(&self) -> GridResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT domain, COUNT(*) FROM trans_unit GROUP BY domain ORDER BY domain",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of non-empty translations per (domain, locale)
    pub async fn count_translated(&self) -> GridResult<Vec<(String, String, i64)>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT tu.domain, t.locale, COUNT(*)
             FROM translation t
             JOIN trans_unit tu ON tu.id = t.trans_unit_id
             WHERE t.content <> ''
             GROUP BY tu.domain, t.locale",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Start a unit of work. Nothing is written until [`UnitOfWork::flush`].
    pub async fn begin(&self) -> GridResult<UnitOfWork> {
        Ok(UnitOfWork {
            tx: self.pool.begin().await?,
        })
    }

    async fn attach_translations(
        &self,
        units: Vec<UnitRow>,
        locales: &[String],
    ) -> GridResult<Vec<TransUnit>> {
        if units.is_empty() || locales.is_empty() {
            return Ok(units.into_iter().map(|u| assemble(u, Vec::new())).collect());
        }

        let mut rows: Vec<TranslationRow> = Vec::new();
        for chunk in units.chunks(ID_CHUNK_SIZE) {
            let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
                "SELECT trans_unit_id, locale, content, created_at, updated_at \
                 FROM translation WHERE trans_unit_id IN (",
            );
            let mut ids = qb.separated(", ");
            for unit in chunk {
                ids.push_bind(unit.id);
            }
            ids.push_unseparated(") AND locale IN (");
            let mut codes = qb.separated(", ");
            for locale in locales {
                codes.push_bind(locale.clone());
            }
            codes.push_unseparated(")");

            rows.extend(
                qb.build_query_as::<TranslationRow>()
                    .fetch_all(&self.pool)
                    .await?,
            );
        }

        let mut by_unit: HashMap<i64, Vec<Translation>> = HashMap::new();
        for row in rows {
            by_unit.entry(row.trans_unit_id).or_default().push(row.into());
        }

        Ok(units
            .into_iter()
            .map(|unit| {
                let mut translations = by_unit.remove(&unit.id).unwrap_or_default();
                translations.sort_by_key(|t| locales.iter().position(|l| *l == t.locale));
                assemble(unit, translations)
            })
            .collect())
    }
}

fn assemble(row: UnitRow, translations: Vec<Translation>) -> TransUnit {
    TransUnit {
        id: row.id,
        domain: row.domain,
        key: row.key_name,
        created_at: row.created_at,
        updated_at: row.updated_at,
        translations,
    }
}

/// Append `<column> = ?` or `<column> LIKE ?` for exact and text filters.
fn push_comparison(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, filter: &ColumnFilter) {
    qb.push(column);
    match filter.mode {
        FilterMode::Exact => {
            qb.push(" = ");
            qb.push_bind(filter.value.clone());
        }
        FilterMode::Text | FilterMode::Content => {
            qb.push(" LIKE ");
            qb.push_bind(format!("%{}%", escape_like(&filter.value)));
            qb.push(" ESCAPE '\\'");
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Pending writes against the store, committed by [`UnitOfWork::flush`].
///
/// Dropping a unit of work without flushing rolls its writes back.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Insert a new trans unit and its non-blank translations. Returns the new id.
    pub async fn save_trans_unit(&mut self, unit: &NewTransUnit) -> GridResult<i64> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM trans_unit WHERE domain = ?1 AND key_name = ?2")
                .bind(&unit.domain)
                .bind(&unit.key)
                .fetch_optional(&mut *self.tx)
                .await?;
        if existing.is_some() {
            return Err(GridError::invalid(format!(
                "Trans unit {}/{} already exists",
                unit.domain, unit.key
            )));
        }

        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO trans_unit (domain, key_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3) RETURNING id",
        )
        .bind(&unit.domain)
        .bind(&unit.key)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        for (locale, content) in &unit.translations {
            if content.trim().is_empty() {
                continue;
            }
            self.save_translation(id, locale, content).await?;
        }

        Ok(id)
    }

    /// Set the content of (trans unit, locale), creating the translation if absent.
    ///
    /// Concurrent writers to the same pair are last-write-wins.
    pub async fn save_translation(
        &mut self,
        trans_unit_id: i64,
        locale: &str,
        content: &str,
    ) -> GridResult<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO translation (trans_unit_id, locale, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (trans_unit_id, locale)
             DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
        )
        .bind(trans_unit_id)
        .bind(locale)
        .bind(content)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query("UPDATE trans_unit SET updated_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(trans_unit_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    /// Delete a trans unit and its translations. Returns false if it did not exist.
    pub async fn delete_trans_unit(&mut self, trans_unit_id: i64) -> GridResult<bool> {
        sqlx::query("DELETE FROM translation WHERE trans_unit_id = ?1")
            .bind(trans_unit_id)
            .execute(&mut *self.tx)
            .await?;

        let result = sqlx::query("DELETE FROM trans_unit WHERE id = ?1")
            .bind(trans_unit_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Commit pending writes
    pub async fn flush(self) -> GridResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
