use axum::{
    extract::{Query, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Redirect, Response,
    },
    Form, Json,
};
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use crate::cache::Snapshot;
use crate::db::broadcast_feed;
use crate::export::{to_csv, EXPORT_FILENAME};
use crate::preferences::ColumnVisibility;
use crate::projection::view_rows;
use crate::session::{AdminSession, SignedIn};
use crate::state::AppState;
use crate::view::{ViewQuery, ViewState};

/// CSV of the administrator's current table view, filter and sort included.
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    admin: AdminSession,
    Query(query): Query<ViewQuery>,
) -> Response {
    let snapshot = state.cache.snapshot().await;
    let view = ViewState::from_query(&query, true);
    let filter = view.filter();

    let rows = view_rows(
        &snapshot.submissions,
        &snapshot.reviews,
        filter.as_ref(),
        view.sort,
    );
    let csv = to_csv(&rows, snapshot.settings.max_score);
    tracing::info!("{} exported {} rows", admin.email, rows.len());

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response()
}

/// Current data as JSON. Non-administrators only see what concerns them.
pub async fn snapshot(State(state): State<Arc<AppState>>, caller: SignedIn) -> Json<Snapshot> {
    let snapshot = state.cache.snapshot().await;
    if caller.is_admin {
        Json(snapshot)
    } else {
        Json(snapshot.visible_to(&caller.email))
    }
}

/// Server-sent events naming each collection as it changes.
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = broadcast_feed(state.cache.subscribe())
        .map(|change| Ok(Event::default().event("change").data(change.as_ref())));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn save_columns(Form(form): Form<HashMap<String, String>>) -> Response {
    let visibility = ColumnVisibility::from_form(&form);

    (
        [(header::SET_COOKIE, visibility.set_cookie())],
        Redirect::to("/?tab=admin"),
    )
        .into_response()
}
