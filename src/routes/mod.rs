mod actions;
mod api;
mod pages;
#[cfg(test)]
mod tests;

pub use actions::*;
pub use api::*;
pub use pages::*;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::db::Change;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/submissions", post(create_submission))
        .route("/submissions/:id/delete", post(delete_submission))
        .route("/reviews/pickup", post(pick_up_review))
        .route("/reviews/:id/finish", post(finish_review))
        .route("/reviews/:id/delete", post(delete_review))
        .route("/admin/settings", post(save_settings))
        .route("/admin/clear", post(clear_data))
        .route("/admin/export", get(export_csv))
        .route("/preferences/columns", post(save_columns))
        .route("/api/snapshot", get(snapshot))
        .route("/api/events", get(events))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Reloads what a write touched so the redirect target already shows it.
/// The change feed would get there too, just not necessarily first.
pub(crate) async fn refresh_after_write(state: &AppState, changes: &[Change]) {
    for change in changes {
        if let Err(e) = state.cache.refresh(*change).await {
            tracing::error!("Failed to reload {} after write: {}", change.as_ref(), e);
        }
    }
}
