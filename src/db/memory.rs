use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use super::{
    broadcast_feed, Change, ChangeFeed, NewReview, NewSubmission, Review, ReviewCorrection, ReviewStatus,
    Settings, Store, StoreError, Submission, SubmissionStatus,
};
use crate::ids::generate_id;

#[derive(Default)]
struct MemoryData {
    submissions: Vec<Submission>,
    reviews: Vec<Review>,
    settings: Settings,
}

impl MemoryData {
    fn refresh_submission(&mut self, submission_id: &str, correction_date: Option<NaiveDate>) {
        let (total, finished) = self
            .reviews
            .iter()
            .filter(|r| r.submission_id == submission_id)
            .fold((0i64, 0i64), |(total, finished), r| {
                (total + 1, finished + i64::from(r.status == ReviewStatus::Finished))
            });
        let quota = self.settings.reviews_per_submission;

        if let Some(submission) = self.submissions.iter_mut().find(|s| s.id == submission_id) {
            submission.review_count = i32::try_from(finished).unwrap_or(i32::MAX);
            submission.status = SubmissionStatus::from_counts(total, finished, quota);
            if correction_date.is_some() {
                submission.correction_date = correction_date;
            }
        }
    }
}

/// Store that keeps everything in process memory. Behaves like [`super::PgStore`]
/// including the uniqueness of (submission, reviewer) pairs.
pub struct MemoryStore {
    data: Mutex<MemoryData>,
    changes: broadcast::Sender<Change>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            data: Mutex::new(MemoryData::default()),
            changes,
        }
    }

    fn data(&self) -> MutexGuard<'_, MemoryData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, changes: &[Change]) {
        for change in changes {
            // No receivers is fine: nobody is watching yet.
            let _ = self.changes.send(*change);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn submissions(&self) -> Result<Vec<Submission>, StoreError> {
        let mut submissions = self.data().submissions.clone();
        submissions.sort_by(|a, b| {
            a.submission_date
                .cmp(&b.submission_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(submissions)
    }

    async fn reviews(&self) -> Result<Vec<Review>, StoreError> {
        let mut reviews = self.data().reviews.clone();
        reviews.sort_by(|a, b| a.pickup_date.cmp(&b.pickup_date).then_with(|| a.id.cmp(&b.id)));
        Ok(reviews)
    }

    async fn settings(&self) -> Result<Settings, StoreError> {
        Ok(self.data().settings)
    }

    async fn create_submission(&self, new: NewSubmission) -> Result<Submission, StoreError> {
        let submission = Submission {
            id: generate_id(),
            author: new.author,
            link: new.link,
            status: SubmissionStatus::Pending,
            review_count: 0,
            submission_date: new.submission_date,
            pickup_date: None,
            correction_date: None,
        };

        self.data().submissions.push(submission.clone());
        self.publish(&[Change::Submissions]);
        Ok(submission)
    }

    async fn delete_submission(&self, id: &str) -> Result<(), StoreError> {
        {
            let mut data = self.data();
            let before = data.submissions.len();
            data.submissions.retain(|s| s.id != id);
            if data.submissions.len() == before {
                return Err(StoreError::NotFound);
            }
            data.reviews.retain(|r| r.submission_id != id);
        }

        self.publish(&[Change::Reviews, Change::Submissions]);
        Ok(())
    }

    async fn assign_review(&self, new: NewReview) -> Result<Review, StoreError> {
        let review = {
            let mut data = self.data();

            if data
                .reviews
                .iter()
                .any(|r| r.submission_id == new.submission_id && r.reviewer == new.reviewer)
            {
                return Err(StoreError::Conflict);
            }

            let submission = data
                .submissions
                .iter_mut()
                .find(|s| s.id == new.submission_id)
                .ok_or(StoreError::NotFound)?;
            submission.pickup_date = Some(new.pickup_date);
            if submission.status == SubmissionStatus::Pending {
                submission.status = SubmissionStatus::InReview;
            }

            let review = Review {
                id: generate_id(),
                submission_id: new.submission_id,
                reviewer: new.reviewer,
                status: ReviewStatus::Assigned,
                score: None,
                comment: String::new(),
                pickup_date: new.pickup_date,
                correction_date: None,
            };
            data.reviews.push(review.clone());
            review
        };

        self.publish(&[Change::Reviews, Change::Submissions]);
        Ok(review)
    }

    async fn finish_review(
        &self,
        id: &str,
        correction: ReviewCorrection,
    ) -> Result<Review, StoreError> {
        let review = {
            let mut data = self.data();

            let review = data
                .reviews
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(StoreError::NotFound)?;
            review.status = ReviewStatus::Finished;
            review.score = Some(correction.score);
            review.comment = correction.comment;
            review.correction_date = Some(correction.correction_date);
            let review = review.clone();

            data.refresh_submission(&review.submission_id, Some(correction.correction_date));
            review
        };

        self.publish(&[Change::Reviews, Change::Submissions]);
        Ok(review)
    }

    async fn delete_review(&self, id: &str) -> Result<(), StoreError> {
        {
            let mut data = self.data();
            let position = data
                .reviews
                .iter()
                .position(|r| r.id == id)
                .ok_or(StoreError::NotFound)?;
            let removed = data.reviews.remove(position);
            data.refresh_submission(&removed.submission_id, None);
        }

        self.publish(&[Change::Reviews, Change::Submissions]);
        Ok(())
    }

    async fn save_settings(&self, settings: Settings) -> Result<(), StoreError> {
        {
            let mut data = self.data();
            data.settings = settings;

            // Statuses depend on the quota.
            let ids: Vec<String> = data.submissions.iter().map(|s| s.id.clone()).collect();
            for id in ids {
                data.refresh_submission(&id, None);
            }
        }

        self.publish(&[Change::Settings, Change::Submissions]);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        {
            let mut data = self.data();
            data.reviews.clear();
            data.submissions.clear();
        }

        self.publish(&[Change::Reviews, Change::Submissions]);
        Ok(())
    }

    async fn changes(&self) -> Result<ChangeFeed, StoreError> {
        Ok(broadcast_feed(self.changes.subscribe()))
    }
}
