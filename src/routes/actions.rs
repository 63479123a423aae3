use axum::{
    extract::{Path, State},
    response::Redirect,
    Form,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{refresh_after_write, today};
use crate::assignment::{pick_up, PickupError};
use crate::db::{Change, NewSubmission, ReviewCorrection, StoreError};
use crate::notice::Notice;
use crate::session::{AdminSession, SignedIn};
use crate::state::AppState;
use crate::validation::{parse_settings, validate_link, validate_score};
use crate::view::Tab;

fn back(tab: Tab, notice: Notice) -> Redirect {
    Redirect::to(&format!("/?tab={}&notice={}", tab.as_ref(), notice.as_ref()))
}

#[derive(Deserialize)]
pub struct SubmissionForm {
    link: String,
}

pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    caller: SignedIn,
    Form(form): Form<SubmissionForm>,
) -> Redirect {
    let link = match validate_link(&form.link) {
        Ok(link) => link,
        Err(e) => return back(Tab::Work, e.into()),
    };

    let new = NewSubmission {
        author: caller.email.clone(),
        link,
        submission_date: today(),
    };

    match state.store.create_submission(new).await {
        Ok(submission) => {
            tracing::info!("{} submitted {}", caller.email, submission.id);
            refresh_after_write(&state, &[Change::Submissions]).await;
            back(Tab::Work, Notice::Submitted)
        }
        Err(e) => {
            tracing::error!("Failed to create submission: {}", e);
            back(Tab::Work, Notice::SubmitFailed)
        }
    }
}

pub async fn delete_submission(
    State(state): State<Arc<AppState>>,
    caller: SignedIn,
    Path(id): Path<String>,
) -> Redirect {
    let tab = if caller.is_admin { Tab::Admin } else { Tab::Work };

    let snapshot = state.cache.snapshot().await;
    let Some(submission) = snapshot.submission(&id) else {
        return back(tab, Notice::DeleteFailed);
    };
    if !caller.is_admin && submission.author != caller.email {
        tracing::warn!("{} tried to delete submission {}", caller.email, id);
        return back(tab, Notice::Forbidden);
    }

    match state.store.delete_submission(&id).await {
        Ok(()) => {
            tracing::info!("{} deleted submission {} with its reviews", caller.email, id);
            refresh_after_write(&state, &[Change::Submissions, Change::Reviews]).await;
            back(tab, Notice::Deleted)
        }
        Err(e) => {
            tracing::error!("Failed to delete submission {}: {}", id, e);
            back(tab, Notice::DeleteFailed)
        }
    }
}

pub async fn pick_up_review(State(state): State<Arc<AppState>>, caller: SignedIn) -> Redirect {
    let snapshot = state.cache.snapshot().await;

    match pick_up(state.store.as_ref(), &snapshot, &caller.email, today()).await {
        Ok(review) => {
            tracing::info!("{} picked up review {}", caller.email, review.id);
            refresh_after_write(&state, &[Change::Submissions, Change::Reviews]).await;
            back(Tab::Reviews, Notice::PickedUp)
        }
        Err(PickupError::NothingAvailable) => back(Tab::Reviews, Notice::NothingAvailable),
        Err(PickupError::Store(e)) => {
            tracing::error!("Failed to assign a review to {}: {}", caller.email, e);
            back(Tab::Reviews, Notice::PickupFailed)
        }
    }
}

#[derive(Deserialize)]
pub struct ReviewForm {
    score: String,
    #[serde(default)]
    comment: String,
}

pub async fn finish_review(
    State(state): State<Arc<AppState>>,
    caller: SignedIn,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Redirect {
    let snapshot = state.cache.snapshot().await;
    let Some(review) = snapshot.review(&id) else {
        return back(Tab::Reviews, Notice::ReviewFailed);
    };
    if review.reviewer != caller.email {
        tracing::warn!("{} tried to finish review {}", caller.email, id);
        return back(Tab::Reviews, Notice::Forbidden);
    }

    let score = match validate_score(&form.score, snapshot.settings.max_score) {
        Ok(score) => score,
        Err(e) => return back(Tab::Reviews, e.into()),
    };

    let correction = ReviewCorrection {
        score,
        comment: form.comment.trim().to_string(),
        correction_date: today(),
    };

    match state.store.finish_review(&id, correction).await {
        Ok(_) => {
            tracing::info!("{} finished review {}", caller.email, id);
            refresh_after_write(&state, &[Change::Submissions, Change::Reviews]).await;
            back(Tab::Reviews, Notice::ReviewSaved)
        }
        Err(e) => {
            tracing::error!("Failed to finish review {}: {}", id, e);
            back(Tab::Reviews, Notice::ReviewFailed)
        }
    }
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    admin: AdminSession,
    Path(id): Path<String>,
) -> Redirect {
    match state.store.delete_review(&id).await {
        Ok(()) => {
            tracing::info!("{} deleted review {}", admin.email, id);
            refresh_after_write(&state, &[Change::Submissions, Change::Reviews]).await;
            back(Tab::Admin, Notice::Deleted)
        }
        Err(StoreError::NotFound) => {
            tracing::warn!("Review {} is already gone", id);
            back(Tab::Admin, Notice::DeleteFailed)
        }
        Err(e) => {
            tracing::error!("Failed to delete review {}: {}", id, e);
            back(Tab::Admin, Notice::DeleteFailed)
        }
    }
}

#[derive(Deserialize)]
pub struct SettingsForm {
    reviews_per_submission: String,
    max_score: String,
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    admin: AdminSession,
    Form(form): Form<SettingsForm>,
) -> Redirect {
    let settings = match parse_settings(&form.reviews_per_submission, &form.max_score) {
        Ok(settings) => settings,
        Err(e) => return back(Tab::Admin, e.into()),
    };

    match state.store.save_settings(settings).await {
        Ok(()) => {
            tracing::info!("{} changed settings to {:?}", admin.email, settings);
            refresh_after_write(&state, &[Change::Settings, Change::Submissions]).await;
            back(Tab::Admin, Notice::SettingsSaved)
        }
        Err(e) => {
            tracing::error!("Failed to save settings: {}", e);
            back(Tab::Admin, Notice::SettingsFailed)
        }
    }
}

pub async fn clear_data(State(state): State<Arc<AppState>>, admin: AdminSession) -> Redirect {
    match state.store.clear().await {
        Ok(()) => {
            tracing::warn!("{} cleared all submissions and reviews", admin.email);
            refresh_after_write(&state, &[Change::Submissions, Change::Reviews]).await;
            back(Tab::Admin, Notice::Cleared)
        }
        Err(e) => {
            tracing::error!("Failed to clear data: {}", e);
            back(Tab::Admin, Notice::ClearFailed)
        }
    }
}
