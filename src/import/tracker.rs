use crate::models::ImportJob;
use rocket_db_pools::sqlx::{self, PgPool};

/// Owns the lifecycle and progress counters of `import_jobs` rows.
///
/// Every transition carries a terminal-state guard in SQL, so a completed or
/// failed job can never move again no matter how often the at-least-once
/// queue re-invokes the pipeline.
pub struct ImportJobs {
    pool: PgPool,
}

const NOT_TERMINAL: &str = "status NOT IN ('completed', 'failed')";

impl ImportJobs {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending job for an uploaded file, returning its id.
    pub async fn create(&self, filename: &str) -> Result<i32, sqlx::Error> {
        let (id,): (i32,) =
            sqlx::query_as("INSERT INTO import_jobs (filename) VALUES ($1) RETURNING id")
                .bind(filename)
                .fetch_one(&self.pool)
                .await?;

        Ok(id)
    }

    pub async fn find(&self, job_id: i32) -> Result<Option<ImportJob>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT id, filename, status, total_rows, processed_rows, error_message,
                      created_at, started_at, finished_at
               FROM import_jobs
               WHERE id = $1"#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn begin_parsing(&self, job_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "UPDATE import_jobs SET status = 'parsing', started_at = NOW() WHERE id = $1 AND {NOT_TERMINAL}"
        ))
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_total(&self, job_id: i32, total_rows: i32) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "UPDATE import_jobs SET total_rows = $2 WHERE id = $1 AND {NOT_TERMINAL}"
        ))
        .bind(job_id)
        .bind(total_rows)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn begin_importing(&self, job_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "UPDATE import_jobs SET status = 'importing' WHERE id = $1 AND {NOT_TERMINAL}"
        ))
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Add a committed batch's raw row count to the durable progress
    /// counter. Deltas are non-negative, so the counter never decreases.
    pub async fn advance(&self, job_id: i32, delta: i32) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "UPDATE import_jobs SET processed_rows = processed_rows + $2 WHERE id = $1 AND {NOT_TERMINAL}"
        ))
        .bind(job_id)
        .bind(delta.max(0))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn complete(&self, job_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "UPDATE import_jobs SET status = 'completed', finished_at = NOW() WHERE id = $1 AND {NOT_TERMINAL}"
        ))
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a terminal failure; the message is stored verbatim.
    pub async fn fail(&self, job_id: i32, message: &str) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "UPDATE import_jobs SET status = 'failed', error_message = $2, finished_at = NOW() WHERE id = $1 AND {NOT_TERMINAL}"
        ))
        .bind(job_id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
