use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Html,
};
use serde::Serialize;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tera::Context;

use crate::assignment::candidates;
use crate::cache::Snapshot;
use crate::db::{ReviewStatus, SubmissionStatus};
use crate::export::{cell, format_date, NOT_AVAILABLE, NO_COMMENT};
use crate::notice::Notice;
use crate::preferences::ColumnVisibility;
use crate::projection::{view_rows, Column, FilterColumn, RowStatus};
use crate::session::Session;
use crate::state::AppState;
use crate::templates::render;
use crate::view::{Tab, ViewQuery, ViewState};

#[derive(Serialize)]
struct FeedbackView {
    status: &'static str,
    score: String,
    comment: String,
}

#[derive(Serialize)]
struct SubmissionView {
    id: String,
    link: String,
    status: &'static str,
    review_count: i32,
    submission_date: String,
    pickup_date: String,
    correction_date: String,
    feedback: Vec<FeedbackView>,
}

#[derive(Serialize)]
struct ReviewTaskView {
    id: String,
    link: String,
    finished: bool,
    status: &'static str,
    score: Option<i32>,
    comment: String,
    pickup_date: String,
    correction_date: String,
}

#[derive(Serialize)]
struct CellView {
    column: &'static str,
    text: String,
}

#[derive(Serialize)]
struct AdminRowView {
    submission_id: String,
    review_id: Option<String>,
    link: String,
    cells: Vec<CellView>,
}

#[derive(Serialize)]
struct OptionView {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

fn submission_status_label(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Pending => "Čeká na hodnocení",
        SubmissionStatus::InReview => "Hodnotí se",
        SubmissionStatus::Reviewed => "Ohodnoceno",
    }
}

fn optional_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(format_date)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// The caller's own submissions with the finished feedback on each.
/// Reviewer identities are not shown to authors.
fn my_submissions(snapshot: &Snapshot, email: &str) -> Vec<SubmissionView> {
    let max_score = snapshot.settings.max_score;

    snapshot
        .submissions
        .iter()
        .filter(|s| s.author == email)
        .map(|s| SubmissionView {
            id: s.id.clone(),
            link: s.link.clone(),
            status: submission_status_label(s.status),
            review_count: s.review_count,
            submission_date: format_date(s.submission_date),
            pickup_date: optional_date(s.pickup_date),
            correction_date: optional_date(s.correction_date),
            feedback: snapshot
                .reviews_of(&s.id)
                .filter(|r| r.status == ReviewStatus::Finished)
                .map(|r| FeedbackView {
                    status: RowStatus::from(r.status).label(),
                    score: r
                        .score
                        .map(|score| format!("{} / {}", score, max_score))
                        .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                    comment: if r.comment.trim().is_empty() {
                        NO_COMMENT.to_string()
                    } else {
                        r.comment.clone()
                    },
                })
                .collect(),
        })
        .collect()
}

fn my_reviews(snapshot: &Snapshot, email: &str) -> Vec<ReviewTaskView> {
    snapshot
        .reviews
        .iter()
        .filter(|r| r.reviewer == email)
        .filter_map(|r| {
            let submission = snapshot.submission(&r.submission_id)?;
            Some(ReviewTaskView {
                id: r.id.clone(),
                link: submission.link.clone(),
                finished: r.status == ReviewStatus::Finished,
                status: RowStatus::from(r.status).label(),
                score: r.score,
                comment: r.comment.clone(),
                pickup_date: format_date(r.pickup_date),
                correction_date: optional_date(r.correction_date),
            })
        })
        .collect()
}

fn admin_context(ctx: &mut Context, snapshot: &Snapshot, view: &ViewState, headers: &HeaderMap) {
    let visibility = ColumnVisibility::from_headers(headers);
    let visible = visibility.visible();
    let max_score = snapshot.settings.max_score;
    let filter = view.filter();

    let rows: Vec<AdminRowView> = view_rows(
        &snapshot.submissions,
        &snapshot.reviews,
        filter.as_ref(),
        view.sort,
    )
    .into_iter()
    .map(|row| AdminRowView {
        cells: visible
            .iter()
            .map(|c| CellView {
                column: c.name(),
                text: cell(&row, *c, max_score),
            })
            .collect(),
        submission_id: row.submission_id,
        review_id: row.review_id,
        link: row.link,
    })
    .collect();

    let sort_links: Vec<_> = visible.iter().map(|c| view.sort_link(*c)).collect();
    let filter_columns: Vec<OptionView> = FilterColumn::iter()
        .map(|c| OptionView {
            value: c.name(),
            label: c.label(),
            selected: c == view.filter_column,
        })
        .collect();
    let columns: Vec<OptionView> = Column::all()
        .into_iter()
        .map(|c| OptionView {
            value: c.name(),
            label: c.label(),
            selected: visibility.is_visible(c),
        })
        .collect();
    let statuses: Vec<OptionView> = [RowStatus::Assigned, RowStatus::Finished, RowStatus::Unassigned]
        .into_iter()
        .map(|s| OptionView {
            value: s.name(),
            label: s.label(),
            selected: false,
        })
        .collect();

    let (sort, dir) = match view.active_sort() {
        Some((column, direction)) => (column, direction.name()),
        None => ("", ""),
    };

    ctx.insert("rows", &rows);
    ctx.insert("row_count", &rows.len());
    ctx.insert("sort_links", &sort_links);
    ctx.insert("filter_columns", &filter_columns);
    ctx.insert("filter_column", view.filter_column.name());
    ctx.insert("filter_value", &view.filter_value);
    ctx.insert("statuses", &statuses);
    ctx.insert("columns", &columns);
    ctx.insert("sort", sort);
    ctx.insert("dir", dir);
    ctx.insert("submission_total", &snapshot.submissions.len());
    ctx.insert("review_total", &snapshot.reviews.len());
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<ViewQuery>,
    headers: HeaderMap,
) -> Html<String> {
    let snapshot = state.cache.snapshot().await;
    let view = ViewState::from_query(&query, session.is_admin);

    let mut ctx = Context::new();
    ctx.insert("session", &session);
    ctx.insert("sign_in_url", &state.config.sign_in_url);
    ctx.insert("sign_out_url", &state.config.sign_out_url);
    ctx.insert("tab", view.tab.as_ref());
    ctx.insert("notice", &view.notice.map(Notice::view));
    ctx.insert("settings", &snapshot.settings);

    if let Some(email) = session.email.as_deref() {
        let reviews = my_reviews(&snapshot, email);
        let finished = reviews.iter().filter(|r| r.finished).count();

        ctx.insert("my_submissions", &my_submissions(&snapshot, email));
        ctx.insert("my_reviews", &reviews);
        ctx.insert("finished_reviews", &finished);
        ctx.insert(
            "available",
            &candidates(email, &snapshot.submissions, &snapshot.reviews).len(),
        );
    }

    if view.tab == Tab::Admin {
        admin_context(&mut ctx, &snapshot, &view, &headers);
    }

    render("index.html", &ctx)
}
