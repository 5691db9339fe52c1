use rocket_db_pools::sqlx::{self, PgPool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Import,
    WebhookDeliver,
    WebhookTest,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

/// A claimed queue row, ready for processing.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: i32,
    pub job_type: JobType,
    pub payload: Value,
}

/// Payload of an [`JobType::Import`] job.
#[derive(Debug, Deserialize)]
pub struct ImportTask {
    pub job_id: i32,
    pub file_path: String,
}

/// Payload of a [`JobType::WebhookDeliver`] job.
#[derive(Debug, Deserialize)]
pub struct DeliveryTask {
    pub webhook_id: i32,
    pub url: String,
    pub event_type: String,
    pub payload: Value,
}

/// Payload of a [`JobType::WebhookTest`] job.
#[derive(Debug, Deserialize)]
pub struct WebhookTestTask {
    pub webhook_id: i32,
}

pub struct JobQueue {
    pool: PgPool,
}

impl JobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a single job (generic)
    pub async fn enqueue(&self, job_type: JobType, payload: Value) -> Result<i32, sqlx::Error> {
        let (id,): (i32,) = sqlx::query_as(
            r#"INSERT INTO jobs (job_type, payload)
               VALUES ($1, $2)
               RETURNING id"#,
        )
        .bind(job_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Enqueue a CSV import for an existing import job row.
    pub async fn enqueue_import(&self, job_id: i32, file_path: &str) -> Result<i32, sqlx::Error> {
        self.enqueue(
            JobType::Import,
            serde_json::json!({ "job_id": job_id, "file_path": file_path }),
        )
        .await
    }

    /// Enqueue one outbound delivery attempt for a single webhook.
    pub async fn enqueue_delivery(
        &self,
        webhook_id: i32,
        url: &str,
        event_type: &str,
        payload: Value,
    ) -> Result<i32, sqlx::Error> {
        self.enqueue(
            JobType::WebhookDeliver,
            serde_json::json!({
                "webhook_id": webhook_id,
                "url": url,
                "event_type": event_type,
                "payload": payload,
            }),
        )
        .await
    }

    /// Enqueue the synthetic test trigger for a webhook.
    pub async fn enqueue_test(&self, webhook_id: i32) -> Result<i32, sqlx::Error> {
        self.enqueue(
            JobType::WebhookTest,
            serde_json::json!({ "webhook_id": webhook_id }),
        )
        .await
    }

    /// Claim the next queued job atomically (SELECT FOR UPDATE SKIP LOCKED)
    pub async fn claim_next(&self) -> Result<Option<QueuedJob>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let job: Option<(i32, JobType, Value)> = sqlx::query_as(
            r#"SELECT id, job_type, payload FROM jobs
               WHERE status = 'queued'
               ORDER BY created_at ASC, id ASC
               LIMIT 1
               FOR UPDATE SKIP LOCKED"#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((id, job_type, payload)) = job {
            sqlx::query(
                "UPDATE jobs SET status = 'running', started_at = COALESCE(started_at, NOW()) WHERE id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            Ok(Some(QueuedJob {
                id,
                job_type,
                payload,
            }))
        } else {
            Ok(None)
        }
    }

    /// Mark job complete
    pub async fn complete(&self, job_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE jobs SET status = 'succeeded', completed_at = NOW() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Mark job failed
    pub async fn fail(&self, job_id: i32, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', completed_at = NOW(), error_message = $1 WHERE id = $2",
        )
        .bind(error)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
