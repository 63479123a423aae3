//! Flat row view over submissions and reviews, with one column filter and
//! one sort key at a time.

use chrono::NaiveDate;
use deunicode::deunicode;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::db::{Review, ReviewStatus, Submission};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Column {
    Sender,
    Link,
    Reviewer,
    Status,
    Score,
    Comment,
    SubmissionDate,
    PickupDate,
    CorrectionDate,
}

impl Column {
    pub fn all() -> Vec<Column> {
        Column::iter().collect()
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn label(self) -> &'static str {
        match self {
            Column::Sender => "Odesílatel",
            Column::Link => "Odkaz",
            Column::Reviewer => "Hodnotitel",
            Column::Status => "Stav",
            Column::Score => "Skóre",
            Column::Comment => "Poznámka",
            Column::SubmissionDate => "Datum odevzdání",
            Column::PickupDate => "Datum vyzvednutí",
            Column::CorrectionDate => "Datum opravy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RowStatus {
    Assigned,
    Finished,
    Unassigned,
}

impl RowStatus {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn label(self) -> &'static str {
        match self {
            RowStatus::Assigned => "Přiřazeno",
            RowStatus::Finished => "Dokončeno",
            RowStatus::Unassigned => "Nepřiřazeno",
        }
    }
}

impl From<ReviewStatus> for RowStatus {
    fn from(status: ReviewStatus) -> Self {
        match status {
            ReviewStatus::Assigned => RowStatus::Assigned,
            ReviewStatus::Finished => RowStatus::Finished,
        }
    }
}

/// One review, or a placeholder for a submission nobody has picked up yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub submission_id: String,
    pub review_id: Option<String>,
    pub sender: String,
    pub link: String,
    pub reviewer: Option<String>,
    pub status: RowStatus,
    pub score: Option<i32>,
    pub comment: String,
    pub submission_date: NaiveDate,
    pub pickup_date: Option<NaiveDate>,
    pub correction_date: Option<NaiveDate>,
}

impl Row {
    pub fn is_review(&self) -> bool {
        self.review_id.is_some()
    }

    fn placeholder(submission: &Submission) -> Self {
        Row {
            submission_id: submission.id.clone(),
            review_id: None,
            sender: submission.author.clone(),
            link: submission.link.clone(),
            reviewer: None,
            status: RowStatus::Unassigned,
            score: None,
            comment: String::new(),
            submission_date: submission.submission_date,
            pickup_date: submission.pickup_date,
            correction_date: submission.correction_date,
        }
    }

    fn for_review(submission: &Submission, review: &Review) -> Self {
        Row {
            submission_id: submission.id.clone(),
            review_id: Some(review.id.clone()),
            sender: submission.author.clone(),
            link: submission.link.clone(),
            reviewer: Some(review.reviewer.clone()),
            status: review.status.into(),
            score: review.score,
            comment: review.comment.clone(),
            submission_date: submission.submission_date,
            pickup_date: Some(review.pickup_date),
            correction_date: review.correction_date,
        }
    }
}

/// Joins submissions with their reviews. Reviews whose submission is gone are
/// dropped.
pub fn project(submissions: &[Submission], reviews: &[Review]) -> Vec<Row> {
    let mut ordered: Vec<&Submission> = submissions.iter().collect();
    ordered.sort_by(|a, b| {
        a.submission_date
            .cmp(&b.submission_date)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut rows = Vec::with_capacity(reviews.len() + submissions.len());
    for submission in ordered {
        let mut own: Vec<&Review> = reviews
            .iter()
            .filter(|r| r.submission_id == submission.id)
            .collect();

        if own.is_empty() {
            rows.push(Row::placeholder(submission));
            continue;
        }

        own.sort_by(|a, b| a.pickup_date.cmp(&b.pickup_date).then_with(|| a.id.cmp(&b.id)));
        rows.extend(own.into_iter().map(|r| Row::for_review(submission, r)));
    }
    rows
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FilterColumn {
    Status,
    Sender,
    Reviewer,
    Score,
}

impl FilterColumn {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterColumn::Status => Column::Status.label(),
            FilterColumn::Sender => Column::Sender.label(),
            FilterColumn::Reviewer => Column::Reviewer.label(),
            FilterColumn::Score => Column::Score.label(),
        }
    }
}

/// Inclusive score bounds written as `min-max`, `min-`, `-max` or a single
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl ScoreRange {
    pub fn contains(&self, score: i32) -> bool {
        self.min.map_or(true, |min| score >= min) && self.max.map_or(true, |max| score <= max)
    }
}

impl FromStr for ScoreRange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bound = |part: &str| -> Result<Option<i32>, ()> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse().map(Some).map_err(|_| ())
            }
        };

        let range = match s.trim().split_once('-') {
            Some((min, max)) => ScoreRange {
                min: bound(min)?,
                max: bound(max)?,
            },
            None => {
                let exact = bound(s)?;
                ScoreRange {
                    min: exact,
                    max: exact,
                }
            }
        };

        if range.min.is_none() && range.max.is_none() {
            return Err(());
        }
        Ok(range)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Status(String),
    Sender(String),
    Reviewer(String),
    /// `None` when the range did not parse; such a filter admits nothing.
    Score(Option<ScoreRange>),
}

impl Filter {
    /// Builds the filter for `column`, or `None` when `value` is blank.
    pub fn new(column: FilterColumn, value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        Some(match column {
            FilterColumn::Status => Filter::Status(value.to_string()),
            FilterColumn::Sender => Filter::Sender(value.to_lowercase()),
            FilterColumn::Reviewer => Filter::Reviewer(value.to_lowercase()),
            FilterColumn::Score => Filter::Score(value.parse().ok()),
        })
    }

    pub fn admits(&self, row: &Row) -> bool {
        match self {
            Filter::Status(status) => row.status.as_ref() == status,
            Filter::Sender(needle) => row.sender.to_lowercase().contains(needle),
            Filter::Reviewer(needle) => row
                .reviewer
                .as_deref()
                .map_or(false, |reviewer| reviewer.to_lowercase().contains(needle)),
            Filter::Score(range) => match (range, row.is_review()) {
                (Some(range), true) => row.score.map_or(false, |score| range.contains(score)),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Active sort key, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState(pub Option<(Column, Direction)>);

impl SortState {
    /// State after the user selects `column`: the same column cycles
    /// asc → desc → none, another column starts at asc.
    pub fn select(self, column: Column) -> SortState {
        match self.0 {
            Some((current, Direction::Asc)) if current == column => {
                SortState(Some((column, Direction::Desc)))
            }
            Some((current, Direction::Desc)) if current == column => SortState(None),
            _ => SortState(Some((column, Direction::Asc))),
        }
    }

    pub fn direction_of(self, column: Column) -> Option<Direction> {
        match self.0 {
            Some((current, direction)) if current == column => Some(direction),
            _ => None,
        }
    }

    pub fn apply(self, rows: &mut [Row]) {
        let Some((column, direction)) = self.0 else {
            return;
        };

        rows.sort_by(|a, b| {
            let ordering = compare(column, a, b);
            match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        });
    }
}

/// Case- and accent-insensitive ordering, ties broken by the raw text.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    deunicode(a)
        .to_lowercase()
        .cmp(&deunicode(b).to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare(column: Column, a: &Row, b: &Row) -> Ordering {
    match column {
        Column::Sender => locale_cmp(&a.sender, &b.sender),
        Column::Link => locale_cmp(&a.link, &b.link),
        Column::Reviewer => locale_cmp(
            a.reviewer.as_deref().unwrap_or_default(),
            b.reviewer.as_deref().unwrap_or_default(),
        ),
        Column::Status => locale_cmp(a.status.label(), b.status.label()),
        Column::Score => a.score.unwrap_or(-1).cmp(&b.score.unwrap_or(-1)),
        Column::Comment => a.comment.chars().count().cmp(&b.comment.chars().count()),
        Column::SubmissionDate => a.submission_date.cmp(&b.submission_date),
        Column::PickupDate => a.pickup_date.cmp(&b.pickup_date),
        Column::CorrectionDate => a.correction_date.cmp(&b.correction_date),
    }
}

/// Projects, filters and sorts in one go.
pub fn view_rows(
    submissions: &[Submission],
    reviews: &[Review],
    filter: Option<&Filter>,
    sort: SortState,
) -> Vec<Row> {
    let mut rows = project(submissions, reviews);
    if let Some(filter) = filter {
        rows.retain(|row| filter.admits(row));
    }
    sort.apply(&mut rows);
    rows
}
