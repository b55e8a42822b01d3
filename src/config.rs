use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub database_url: String,
    pub port: u16,

    // Locales
    pub managed_locales: Vec<String>,

    // Catalogue cache
    pub cache_dir: String,
    pub auto_cache_clean: bool,

    // Grid
    pub grid_page_size: u32,
    pub legacy_delete_on_any_column: bool,

    // Presentation
    pub view: ViewConfig,

    // Dev tools
    pub dev_tools_enabled: bool,
    pub dev_tools_token_limit: usize,

    // Security
    pub csrf_token: Option<String>,
}

/// Values handed to the presentation layer with every screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    pub layout: String,
    pub input_type: InputType,
    pub auto_cache_clean: bool,
    pub toggle_similar: bool,
}

/// Widget used by the grid for inline edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Textarea,
}

impl InputType {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "textarea" => Ok(Self::Textarea),
            other => anyhow::bail!("Invalid GRID_INPUT_TYPE: {}. Expected text or textarea", other),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let auto_cache_clean = env_flag("AUTO_CACHE_CLEAN")?;

        let grid_page_size: u32 = match std::env::var("GRID_PAGE_SIZE") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("GRID_PAGE_SIZE is not a number: {}", v))?,
            Err(_) => 20,
        };
        if grid_page_size == 0 {
            anyhow::bail!("GRID_PAGE_SIZE must be greater than zero");
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://translations.db?mode=rwc".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            managed_locales: parse_locale_list(
                &std::env::var("MANAGED_LOCALES").unwrap_or_else(|_| "en".to_string()),
            ),

            cache_dir: std::env::var("CACHE_DIR")
                .unwrap_or_else(|_| "var/cache/translations".to_string()),
            auto_cache_clean,

            grid_page_size,
            legacy_delete_on_any_column: env_flag("LEGACY_DELETE_ON_ANY_COLUMN")?,

            view: ViewConfig {
                layout: std::env::var("BASE_LAYOUT").unwrap_or_else(|_| "layout.html".to_string()),
                input_type: match std::env::var("GRID_INPUT_TYPE") {
                    Ok(v) => InputType::parse(&v)?,
                    Err(_) => InputType::Text,
                },
                auto_cache_clean,
                toggle_similar: env_flag("GRID_TOGGLE_SIMILAR")?,
            },

            dev_tools_enabled: env_flag("DEV_TOOLS_ENABLED")?,
            dev_tools_token_limit: std::env::var("DEV_TOOLS_TOKEN_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),

            csrf_token: std::env::var("CSRF_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }
}

/// Split a comma separated locale list, dropping blanks.
fn parse_locale_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_flag(name: &str) -> Result<bool> {
    match std::env::var(name) {
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => anyhow::bail!("Invalid boolean for {}: {}", name, other),
        },
        Err(_) => Ok(false),
    }
}
