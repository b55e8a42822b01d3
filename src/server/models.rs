use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ViewConfig;
use crate::models::TransUnit;
use crate::profiler::RequestToken;
use crate::stats::DomainStats;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewView {
    pub view: ViewConfig,
    pub locales: Vec<String>,
    pub domains: Vec<String>,
    pub latest_trans: Option<DateTime<Utc>>,
    pub stats: DomainStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub view: ViewConfig,
    pub locales: Vec<String>,
    pub tokens: Option<Vec<RequestToken>>,
    pub translations: Vec<TransUnit>,
    pub page: u32,
    pub translations_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<String>,
}

/// Rows rendered into an existing grid.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridFragment {
    pub locales: Vec<String>,
    pub translations: Vec<TransUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoResults {
    pub no_results: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFormView {
    pub view: ViewConfig,
    pub locales: Vec<String>,
    pub domains: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GridQuery {
    pub flash: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadGridForm {
    pub sort: Option<String>,
    pub column_to_order_by: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveCellForm {
    pub id: Option<String>,
    pub locale: Option<String>,
    pub newvalue: Option<String>,
    pub column: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterForm {
    pub column: Option<String>,
    pub filter_value: Option<String>,
    pub column_type: Option<String>,
}
