use crate::jobs::queue::JobQueue;
use rocket_db_pools::sqlx::{self, PgPool};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Upper bound on one outbound attempt; there is no cancellation path once
/// a delivery starts.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Performs single outbound delivery attempts and records their outcome.
#[derive(Clone)]
pub struct DeliveryWorker {
    client: reqwest::Client,
}

impl DeliveryWorker {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .expect("failed to build webhook HTTP client");

        Self { client }
    }

    /// POST `{"event_type": ..., "payload": ...}` to the subscriber exactly
    /// once and persist status code, wall-clock latency and transport error
    /// on the webhook row.
    ///
    /// Every outcome - non-2xx response, network error, timeout - is
    /// terminal for this attempt and absorbed here; nothing propagates to
    /// the caller.
    pub async fn deliver(
        &self,
        pool: &PgPool,
        webhook_id: i32,
        url: &str,
        event_type: &str,
        payload: &Value,
    ) {
        let body = serde_json::json!({ "event_type": event_type, "payload": payload });

        let started = Instant::now();
        let mut status_code: Option<i32> = None;
        let mut last_error: Option<String> = None;

        match self.client.post(url).json(&body).send().await {
            Ok(response) => {
                status_code = Some(response.status().as_u16() as i32);
                log::info!(
                    "webhook {} -> {} responded with {}",
                    webhook_id,
                    url,
                    response.status()
                );
            }
            Err(e) => {
                last_error = Some(e.to_string());
                log::warn!("webhook {} -> {} failed: {}", webhook_id, url, e);
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as i32;

        let recorded = sqlx::query(
            r#"UPDATE webhooks
               SET last_status_code = $1, last_response_ms = $2, last_error = $3, updated_at = NOW()
               WHERE id = $4"#,
        )
        .bind(status_code)
        .bind(elapsed_ms)
        .bind(&last_error)
        .bind(webhook_id)
        .execute(pool)
        .await;

        if let Err(e) = recorded {
            log::error!(
                "failed to record delivery outcome for webhook {}: {}",
                webhook_id,
                e
            );
        }
    }

    /// Trigger used by the "Test" button: loads the webhook, no-ops if it is
    /// gone or disabled, otherwise queues a delivery with a fixed synthetic
    /// payload.
    pub async fn run_test(&self, pool: &PgPool, webhook_id: i32) -> Result<(), sqlx::Error> {
        let hook: Option<(bool, String)> =
            sqlx::query_as("SELECT enabled, url FROM webhooks WHERE id = $1")
                .bind(webhook_id)
                .fetch_optional(pool)
                .await?;

        let Some((enabled, url)) = hook else {
            log::debug!("webhook {} no longer exists, skipping test", webhook_id);
            return Ok(());
        };

        if !enabled {
            log::debug!("webhook {} is disabled, skipping test", webhook_id);
            return Ok(());
        }

        let queue = JobQueue::new(pool.clone());
        queue
            .enqueue_delivery(
                webhook_id,
                &url,
                "webhook.test",
                serde_json::json!({ "message": "test from product-importer" }),
            )
            .await?;

        Ok(())
    }
}

impl Default for DeliveryWorker {
    fn default() -> Self {
        Self::new()
    }
}
