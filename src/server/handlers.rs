use anyhow::{Context, Result};
use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::models::{
    FilterForm, GridFragment, GridQuery, GridView, LoadGridForm, MessageResponse, NewFormView,
    NoResults, OverviewView, SaveCellForm, SaveResponse,
};
use super::state::AppState;
use crate::error::{GridError, GridResult};
use crate::grid::{parse_page, CellIntent};
use crate::models::{NewTransUnit, Sort};
use crate::profiler::record_request;
use crate::security::{check_csrf, CSRF_HEADER};

pub const GRID_PATH: &str = "/translations/grid";
pub const NEW_PATH: &str = "/translations/new";

const CACHE_REMOVED: &str = "Translation cache removed";
const SUCCESSFULLY_ADDED: &str = "Translation successfully added";
const NO_TRANSLATIONS: &str = "No translations found";

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let translations = Router::new()
        .route("/", get(overview))
        .route("/grid", get(grid))
        .route("/grid/page", post(load_translation_grid))
        .route("/grid/save", post(save_updates))
        .route("/grid/filter", post(filter_translations))
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/new", get(new_form).post(create_trans_unit));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/translations/", get(overview))
        .nest("/translations", translations)
        .with_state(Arc::clone(&state));

    if let Some(finder) = &state.token_finder {
        app = app.layer(middleware::from_fn_with_state(
            Arc::clone(finder),
            record_request,
        ));
    }

    app.layer(TraceLayer::new_for_http())
}

pub async fn run_server(state: Arc<AppState>, port: u16) -> Result<()> {
    let app = router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("✓ Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// Translation status per domain.
pub async fn overview(State(state): State<Arc<AppState>>) -> GridResult<Json<OverviewView>> {
    let store = state.grid.store();

    Ok(Json(OverviewView {
        view: state.view.clone(),
        locales: state.locales().to_vec(),
        domains: store.domains().await?,
        latest_trans: store.latest_updated_at().await?,
        stats: state.stats.stats().await?,
    }))
}

/// First page of the grid.
pub async fn grid(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GridQuery>,
) -> GridResult<Json<GridView>> {
    let page = state.grid.default_page().await?;
    let tokens = state.token_finder.as_ref().map(|finder| finder.find());

    Ok(Json(GridView {
        view: state.view.clone(),
        locales: state.locales().to_vec(),
        tokens,
        translations: page.rows,
        page: page.page,
        translations_count: page.total,
        flash: query.flash,
    }))
}

/// A sorted page of the grid.
pub async fn load_translation_grid(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoadGridForm>,
) -> GridResult<Json<GridFragment>> {
    let page = parse_page(form.page.as_deref())?;
    let sort = Sort::parse(
        form.column_to_order_by.as_deref(),
        form.sort.as_deref(),
        state.grid.locales(),
    )?;

    let result = state
        .grid
        .list_page(page, state.grid.options().page_size, &sort)
        .await?;

    Ok(Json(GridFragment {
        locales: state.locales().to_vec(),
        translations: result.rows,
        page: Some(result.page),
    }))
}

/// Inline edit of a translation cell, or deletion of the row.
pub async fn save_updates(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SaveCellForm>,
) -> GridResult<Json<SaveResponse>> {
    let raw_id = required(form.id, "id")?;
    let trans_unit_id: i64 = raw_id
        .trim()
        .parse()
        .map_err(|_| GridError::invalid(format!("Not a trans unit id: {}", raw_id)))?;
    let column = required(form.column, "column")?;
    let locale = form.locale.unwrap_or_default();
    let new_value = form.newvalue.unwrap_or_default();

    match state
        .grid
        .update_cell(trans_unit_id, &locale, &column, &new_value)
        .await?
    {
        CellIntent::UpdateContent { .. } => info!("Saved {} cell of {}", locale, trans_unit_id),
        CellIntent::DeleteTransUnit { .. } => info!("Removed row {}", trans_unit_id),
    }

    Ok(Json(SaveResponse { kind: "success" }))
}

/// Rows matching a column filter.
pub async fn filter_translations(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FilterForm>,
) -> GridResult<Response> {
    let value = form.filter_value.unwrap_or_default();
    let column = form.column.unwrap_or_default();
    let column_type = form.column_type.unwrap_or_else(|| "exact".to_string());

    let rows = state.grid.filter(&column, &value, &column_type).await?;

    if rows.is_empty() {
        return Ok(Json(NoResults {
            no_results: true,
            message: NO_TRANSLATIONS.to_string(),
        })
        .into_response());
    }

    Ok(Json(GridFragment {
        locales: state.locales().to_vec(),
        translations: rows,
        page: None,
    })
    .into_response())
}

/// Remove cached catalogues for managed locales.
pub async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> GridResult<Response> {
    if is_xml_http_request(&headers) {
        let submitted = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
        check_csrf(state.csrf_token.as_deref(), submitted)?;

        state.grid.invalidate_cache()?;
        return Ok(Json(MessageResponse {
            message: CACHE_REMOVED.to_string(),
        })
        .into_response());
    }

    state.grid.invalidate_cache()?;
    Ok(Redirect::to(&format!("{}?flash=cache_removed", GRID_PATH)).into_response())
}

pub async fn new_form(State(state): State<Arc<AppState>>) -> GridResult<Json<NewFormView>> {
    Ok(Json(NewFormView {
        view: state.view.clone(),
        locales: state.locales().to_vec(),
        domains: state.grid.store().domains().await?,
    }))
}

/// Create a trans unit from the new-entry form.
///
/// Fields: `domain`, `key`, `translations[<locale>]` and an optional `save_add`
/// asking to return to the form for another entry.
pub async fn create_trans_unit(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> GridResult<Response> {
    let mut unit = NewTransUnit {
        domain: String::new(),
        key: String::new(),
        translations: Vec::new(),
    };
    let mut save_add = false;

    for (name, value) in fields {
        match name.as_str() {
            "domain" => unit.domain = value,
            "key" => unit.key = value,
            "save_add" => save_add = true,
            _ => {
                if let Some(locale) = name
                    .strip_prefix("translations[")
                    .and_then(|rest| rest.strip_suffix(']'))
                {
                    unit.translations.push((locale.to_string(), value));
                }
            }
        }
    }

    let created = state.grid.create_trans_unit(unit).await?;
    info!("{}: {}/{}", SUCCESSFULLY_ADDED, created.domain, created.key);

    let target = if save_add { NEW_PATH } else { GRID_PATH };
    Ok(Redirect::to(&format!("{}?flash=successfully_added", target)).into_response())
}

fn required(value: Option<String>, name: &str) -> GridResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GridError::invalid(format!("Missing field: {}", name)))
}

fn is_xml_http_request(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false)
}
