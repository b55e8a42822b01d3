use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{GridError, GridResult};
use crate::locales::LocaleRegistry;

/// Localized content of a trans unit for one locale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub locale: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A translatable string, keyed by domain and key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransUnit {
    pub id: i64,
    pub domain: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub translations: Vec<Translation>,
}

impl TransUnit {
    pub fn translation(&self, locale: &str) -> Option<&Translation> {
        self.translations.iter().find(|t| t.locale == locale)
    }
}

/// Trans unit submitted through the creation form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransUnit {
    pub domain: String,
    pub key: String,
    /// (locale, content) pairs; blank contents are not stored
    pub translations: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a direction, treating a missing or blank value as ascending.
    pub fn parse(raw: Option<&str>) -> GridResult<Self> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::Asc),
            Some(s) if s.eq_ignore_ascii_case("asc") => Ok(Self::Asc),
            Some(s) if s.eq_ignore_ascii_case("desc") => Ok(Self::Desc),
            Some(other) => Err(GridError::invalid(format!("Unknown sort direction: {}", other))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Domain,
    Key,
    /// Content of the given managed locale
    Locale(String),
}

/// Grid ordering. Without a column the grid is ordered by domain, then key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sort {
    pub column: Option<SortColumn>,
    pub direction: SortDirection,
}

impl Sort {
    pub fn parse(
        column: Option<&str>,
        direction: Option<&str>,
        locales: &LocaleRegistry,
    ) -> GridResult<Self> {
        let direction = SortDirection::parse(direction)?;
        let column = match column.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some("id") => Some(SortColumn::Id),
            Some("domain") => Some(SortColumn::Domain),
            Some("key") => Some(SortColumn::Key),
            Some(code) if locales.contains(code) => Some(SortColumn::Locale(code.to_string())),
            Some(other) => {
                return Err(GridError::invalid(format!("Unknown sort column: {}", other)))
            }
        };

        Ok(Self { column, direction })
    }
}

/// How a filter value is compared to the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Equality
    Exact,
    /// Substring, ASCII case-insensitive
    Text,
    /// Substring, Unicode case-insensitive; locale columns only
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterColumn {
    Id(i64),
    Domain,
    Key,
    /// Locale code of the translations
    Locale,
    /// Content of the given managed locale
    Content(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    pub column: FilterColumn,
    pub value: String,
    pub mode: FilterMode,
}

impl ColumnFilter {
    pub fn parse(
        column: &str,
        value: &str,
        column_type: &str,
        locales: &LocaleRegistry,
    ) -> GridResult<Self> {
        let mode = match column_type.trim().to_ascii_lowercase().as_str() {
            "exact" => FilterMode::Exact,
            "text" => FilterMode::Text,
            "content" => FilterMode::Content,
            other => return Err(GridError::invalid(format!("Unknown column type: {}", other))),
        };

        let column = match column.trim() {
            "id" => {
                if mode != FilterMode::Exact {
                    return Err(GridError::invalid("The id column only supports exact filters"));
                }
                let id = value
                    .trim()
                    .parse()
                    .map_err(|_| GridError::invalid(format!("Not a trans unit id: {}", value)))?;
                FilterColumn::Id(id)
            }
            "domain" => FilterColumn::Domain,
            "key" => FilterColumn::Key,
            "locale" => FilterColumn::Locale,
            code if locales.contains(code) => FilterColumn::Content(code.to_string()),
            other => return Err(GridError::invalid(format!("Unknown filter column: {}", other))),
        };

        if mode == FilterMode::Content && !matches!(column, FilterColumn::Content(_)) {
            return Err(GridError::invalid(
                "The content column type only applies to locale columns",
            ));
        }

        Ok(Self {
            column,
            value: value.to_string(),
            mode,
        })
    }

    /// Whether `candidate` satisfies this filter's comparison.
    pub fn matches(&self, candidate: &str) -> bool {
        match self.mode {
            FilterMode::Exact => candidate == self.value,
            FilterMode::Text => candidate
                .to_ascii_lowercase()
                .contains(&self.value.to_ascii_lowercase()),
            FilterMode::Content => candidate.to_lowercase().contains(&self.value.to_lowercase()),
        }
    }
}
