//! Locale registry: the ordered set of locales the service maintains.
//!
//! The registry is built once from configuration and handed to the services
//! that need it. It never changes after construction.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

/// Locale codes look like `en`, `fr_CA`, `pt-BR` or `zh_Hant_TW`.
static LOCALE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn locale_pattern() -> &'static Regex {
    LOCALE_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]{2,3}([_-][A-Za-z0-9]{2,8})*$").expect("locale pattern is valid")
    })
}

/// Grid column names. A locale named like one could never be sorted or filtered.
pub const RESERVED_COLUMNS: [&str; 4] = ["id", "domain", "key", "locale"];

/// Managed locales, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleRegistry {
    locales: Vec<String>,
}

impl LocaleRegistry {
    /// Build a registry from configured locale codes.
    ///
    /// # Errors
    /// Fails when the list is empty, a code is malformed or clashes with a grid
    /// column name, or a code is listed twice.
    pub fn new<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut locales: Vec<String> = Vec::new();
        for code in codes {
            let code = code.into();
            if !locale_pattern().is_match(&code) {
                anyhow::bail!("Invalid locale code: {}", code);
            }
            if RESERVED_COLUMNS.contains(&code.as_str()) {
                anyhow::bail!(
                    "Locale code {} clashes with a grid column, use a regional form such as {}_{}",
                    code,
                    code,
                    code.to_ascii_uppercase()
                );
            }
            if locales.contains(&code) {
                anyhow::bail!("Locale listed twice: {}", code);
            }
            locales.push(code);
        }

        if locales.is_empty() {
            anyhow::bail!("At least one managed locale is required");
        }

        Ok(Self { locales })
    }

    /// Managed locale codes in configuration order.
    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    pub fn contains(&self, code: &str) -> bool {
        self.locales.iter().any(|l| l == code)
    }
}
