use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cache::Snapshot;
use crate::db::{NewReview, Review, Store, StoreError, Submission};

#[derive(Debug, thiserror::Error)]
pub enum PickupError {
    #[error("no submission is available for review")]
    NothingAvailable,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Submissions the caller may review: not their own and not already reviewed
/// by them.
pub fn candidates<'a>(
    caller: &str,
    submissions: &'a [Submission],
    reviews: &[Review],
) -> Vec<&'a Submission> {
    submissions
        .iter()
        .filter(|s| s.author != caller)
        .filter(|s| {
            !reviews
                .iter()
                .any(|r| r.submission_id == s.id && r.reviewer == caller)
        })
        .collect()
}

/// Picks one candidate uniformly at random.
pub fn choose<'a, R: Rng + ?Sized>(
    caller: &str,
    submissions: &'a [Submission],
    reviews: &[Review],
    rng: &mut R,
) -> Option<&'a Submission> {
    candidates(caller, submissions, reviews)
        .choose(rng)
        .copied()
}

/// Assigns a random eligible submission to `caller`. The review and the
/// submission's pickup date are written by the store in one step.
pub async fn pick_up(
    store: &dyn Store,
    snapshot: &Snapshot,
    caller: &str,
    today: NaiveDate,
) -> Result<Review, PickupError> {
    let submission_id = {
        let mut rng = rand::thread_rng();
        choose(caller, &snapshot.submissions, &snapshot.reviews, &mut rng)
            .map(|s| s.id.clone())
            .ok_or(PickupError::NothingAvailable)?
    };

    tracing::info!("Assigning submission {} to {}", submission_id, caller);

    let review = store
        .assign_review(NewReview {
            submission_id,
            reviewer: caller.to_string(),
            pickup_date: today,
        })
        .await?;

    Ok(review)
}
