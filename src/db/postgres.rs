use async_trait::async_trait;
use chrono::NaiveDate;
use futures::StreamExt;
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::{PgConnection, PgPool};

use super::{
    Change, ChangeFeed, NewReview, NewSubmission, Review, ReviewCorrection, ReviewRow, Settings,
    Store, StoreError, Submission, SubmissionRow, SubmissionStatus,
};
use crate::ids::generate_id;

/// Channel the table triggers notify with the changed table's name.
const CHANGE_CHANNEL: &str = "oponentura_changes";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps constraint violations onto the store's own error kinds.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict;
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    StoreError::Database(err)
}

async fn review_quota(conn: &mut PgConnection) -> Result<i32, StoreError> {
    let quota: Option<i32> =
        sqlx::query_scalar("SELECT reviews_per_submission FROM settings WHERE id = 1")
            .fetch_optional(&mut *conn)
            .await?;

    Ok(quota.unwrap_or_else(|| Settings::default().reviews_per_submission))
}

/// Recomputes review count and status of a submission from its reviews.
async fn refresh_submission(
    conn: &mut PgConnection,
    submission_id: &str,
    correction_date: Option<NaiveDate>,
) -> Result<(), StoreError> {
    let (total, finished): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'finished')
        FROM reviews
        WHERE submission_id = $1
        "#,
    )
    .bind(submission_id)
    .fetch_one(&mut *conn)
    .await?;

    let quota = review_quota(conn).await?;
    let status = SubmissionStatus::from_counts(total, finished, quota);

    sqlx::query(
        r#"
        UPDATE submissions
        SET review_count = $2, status = $3, correction_date = COALESCE($4, correction_date)
        WHERE id = $1
        "#,
    )
    .bind(submission_id)
    .bind(i32::try_from(finished).unwrap_or(i32::MAX))
    .bind(status.as_ref())
    .bind(correction_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn submissions(&self) -> Result<Vec<Submission>, StoreError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            "SELECT * FROM submissions ORDER BY submission_date, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Submission::try_from).collect()
    }

    async fn reviews(&self) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews ORDER BY pickup_date, id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    async fn settings(&self) -> Result<Settings, StoreError> {
        let settings = sqlx::query_as::<_, Settings>(
            "SELECT reviews_per_submission, max_score FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings.unwrap_or_default())
    }

    async fn create_submission(&self, new: NewSubmission) -> Result<Submission, StoreError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO submissions (id, author, link, status, review_count, submission_date)
            VALUES ($1, $2, $3, $4, 0, $5)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&new.author)
        .bind(&new.link)
        .bind(SubmissionStatus::Pending.as_ref())
        .bind(new.submission_date)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Submission::try_from(row)
    }

    async fn delete_submission(&self, id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reviews WHERE submission_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM submissions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn assign_review(&self, new: NewReview) -> Result<Review, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            INSERT INTO reviews (id, submission_id, reviewer, status, score, comment, pickup_date)
            VALUES ($1, $2, $3, 'assigned', NULL, '', $4)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&new.submission_id)
        .bind(&new.reviewer)
        .bind(new.pickup_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        sqlx::query(
            r#"
            UPDATE submissions
            SET pickup_date = $2,
                status = CASE WHEN status = 'pending' THEN 'in_review' ELSE status END
            WHERE id = $1
            "#,
        )
        .bind(&new.submission_id)
        .bind(new.pickup_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Review::try_from(row)
    }

    async fn finish_review(
        &self,
        id: &str,
        correction: ReviewCorrection,
    ) -> Result<Review, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            UPDATE reviews
            SET status = 'finished', score = $2, comment = $3, correction_date = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(correction.score)
        .bind(&correction.comment)
        .bind(correction.correction_date)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        refresh_submission(&mut *tx, &row.submission_id, Some(correction.correction_date)).await?;

        tx.commit().await?;
        Review::try_from(row)
    }

    async fn delete_review(&self, id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let submission_id: String =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = $1 RETURNING submission_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::NotFound)?;

        refresh_submission(&mut *tx, &submission_id, None).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn save_settings(&self, settings: Settings) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO settings (id, reviews_per_submission, max_score)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE
            SET reviews_per_submission = EXCLUDED.reviews_per_submission,
                max_score = EXCLUDED.max_score
            "#,
        )
        .bind(settings.reviews_per_submission)
        .bind(settings.max_score)
        .execute(&mut *tx)
        .await?;

        // Statuses depend on the quota.
        sqlx::query(
            r#"
            UPDATE submissions s
            SET status = CASE
                WHEN c.finished >= $1 THEN 'reviewed'
                WHEN c.total > 0 THEN 'in_review'
                ELSE 'pending'
            END
            FROM (
                SELECT sub.id,
                       COUNT(r.id) AS total,
                       COUNT(r.id) FILTER (WHERE r.status = 'finished') AS finished
                FROM submissions sub
                LEFT JOIN reviews r ON r.submission_id = sub.id
                GROUP BY sub.id
            ) c
            WHERE s.id = c.id
            "#,
        )
        .bind(settings.reviews_per_submission)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reviews").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM submissions").execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn changes(&self) -> Result<ChangeFeed, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let feed = listener.into_stream().filter_map(|notification| async move {
            match notification {
                Ok(notification) => match notification.payload().parse::<Change>() {
                    Ok(change) => Some(change),
                    Err(_) => {
                        tracing::warn!("Unknown change payload: {}", notification.payload());
                        None
                    }
                },
                Err(e) => {
                    tracing::error!("Change listener failed: {}", e);
                    None
                }
            }
        });

        Ok(feed.boxed())
    }
}
