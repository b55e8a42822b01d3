mod handlers;
mod models;
mod state;

pub use handlers::{
    create_trans_unit, filter_translations, grid, health, invalidate_cache,
    load_translation_grid, new_form, overview, router, run_server, save_updates, GRID_PATH,
    NEW_PATH,
};
pub use models::{
    FilterForm, GridFragment, GridQuery, GridView, LoadGridForm, MessageResponse, NewFormView,
    NoResults, OverviewView, SaveCellForm, SaveResponse,
};
pub use state::AppState;
