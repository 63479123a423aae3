use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{AsRefStr, Display, EnumString};

use super::StoreError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    InReview,
    Reviewed,
}

impl SubmissionStatus {
    /// Status of a submission given how many reviews it has, how many of them
    /// are finished, and the configured quota.
    pub fn from_counts(total: i64, finished: i64, quota: i32) -> Self {
        if finished >= i64::from(quota) {
            SubmissionStatus::Reviewed
        } else if total > 0 {
            SubmissionStatus::InReview
        } else {
            SubmissionStatus::Pending
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewStatus {
    Assigned,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub author: String,
    pub link: String,
    pub status: SubmissionStatus,
    pub review_count: i32,
    pub submission_date: NaiveDate,
    pub pickup_date: Option<NaiveDate>,
    pub correction_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub submission_id: String,
    pub reviewer: String,
    pub status: ReviewStatus,
    pub score: Option<i32>,
    pub comment: String,
    pub pickup_date: NaiveDate,
    pub correction_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub reviews_per_submission: i32,
    pub max_score: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reviews_per_submission: 3,
            max_score: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub author: String,
    pub link: String,
    pub submission_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub submission_id: String,
    pub reviewer: String,
    pub pickup_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ReviewCorrection {
    pub score: i32,
    pub comment: String,
    pub correction_date: NaiveDate,
}

#[derive(Debug, FromRow)]
pub struct SubmissionRow {
    pub id: String,
    pub author: String,
    pub link: String,
    pub status: String,
    pub review_count: i32,
    pub submission_date: NaiveDate,
    pub pickup_date: Option<NaiveDate>,
    pub correction_date: Option<NaiveDate>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = StoreError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("submission {}: status {}", row.id, row.status)))?;

        Ok(Submission {
            id: row.id,
            author: row.author,
            link: row.link,
            status,
            review_count: row.review_count,
            submission_date: row.submission_date,
            pickup_date: row.pickup_date,
            correction_date: row.correction_date,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ReviewRow {
    pub id: String,
    pub submission_id: String,
    pub reviewer: String,
    pub status: String,
    pub score: Option<i32>,
    pub comment: String,
    pub pickup_date: NaiveDate,
    pub correction_date: Option<NaiveDate>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("review {}: status {}", row.id, row.status)))?;

        Ok(Review {
            id: row.id,
            submission_id: row.submission_id,
            reviewer: row.reviewer,
            status,
            score: row.score,
            comment: row.comment,
            pickup_date: row.pickup_date,
            correction_date: row.correction_date,
        })
    }
}
