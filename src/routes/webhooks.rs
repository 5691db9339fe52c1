//! Webhook registration CRUD and the manual test trigger.

use crate::error::ApiError;
use crate::jobs::JobQueue;
use crate::models::Webhook;
use rocket::State;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

const WEBHOOK_COLUMNS: &str = "id, url, event_type, enabled, last_status_code, last_response_ms, \
     last_error, created_at, updated_at";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WebhookIn {
    pub url: String,
    pub event_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct AckResponse {
    pub ok: bool,
}

/// List all registered webhooks.
#[openapi(tag = "Webhooks")]
#[get("/webhooks")]
pub async fn list_webhooks(pool: &State<PgPool>) -> Result<Json<Vec<Webhook>>, ApiError> {
    let hooks: Vec<Webhook> = sqlx::query_as(&format!(
        "SELECT {WEBHOOK_COLUMNS} FROM webhooks ORDER BY id"
    ))
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(hooks))
}

/// Register a webhook endpoint.
#[openapi(tag = "Webhooks")]
#[post("/webhooks", data = "<payload>")]
pub async fn create_webhook(
    payload: Json<WebhookIn>,
    pool: &State<PgPool>,
) -> Result<Json<Webhook>, ApiError> {
    let url = payload.url.trim().to_string();
    let event_type = payload.event_type.trim().to_string();

    if url.is_empty() || event_type.is_empty() {
        return Err(ApiError::BadRequest(
            "url and event_type are required".to_string(),
        ));
    }

    let hook: Webhook = sqlx::query_as(&format!(
        r#"INSERT INTO webhooks (url, event_type, enabled)
           VALUES ($1, $2, $3)
           RETURNING {WEBHOOK_COLUMNS}"#
    ))
    .bind(&url)
    .bind(&event_type)
    .bind(payload.enabled)
    .fetch_one(pool.inner())
    .await?;

    Ok(Json(hook))
}

/// Replace a webhook's registration fields.
#[openapi(tag = "Webhooks")]
#[put("/webhooks/<webhook_id>", data = "<payload>")]
pub async fn update_webhook(
    webhook_id: i32,
    payload: Json<WebhookIn>,
    pool: &State<PgPool>,
) -> Result<Json<Webhook>, ApiError> {
    let hook: Option<Webhook> = sqlx::query_as(&format!(
        r#"UPDATE webhooks
           SET url = $2, event_type = $3, enabled = $4, updated_at = NOW()
           WHERE id = $1
           RETURNING {WEBHOOK_COLUMNS}"#
    ))
    .bind(webhook_id)
    .bind(payload.url.trim())
    .bind(payload.event_type.trim())
    .bind(payload.enabled)
    .fetch_optional(pool.inner())
    .await?;

    let hook = hook.ok_or_else(|| ApiError::NotFound("Webhook not found".to_string()))?;

    Ok(Json(hook))
}

/// Remove a webhook registration.
#[openapi(tag = "Webhooks")]
#[delete("/webhooks/<webhook_id>")]
pub async fn delete_webhook(
    webhook_id: i32,
    pool: &State<PgPool>,
) -> Result<Json<AckResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
        .bind(webhook_id)
        .execute(pool.inner())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Webhook not found".to_string()));
    }

    Ok(Json(AckResponse { ok: true }))
}

/// Queue a synthetic `webhook.test` delivery for this endpoint.
///
/// The queued task itself re-checks the registration and silently skips
/// disabled or deleted webhooks.
#[openapi(tag = "Webhooks")]
#[post("/webhooks/<webhook_id>/test")]
pub async fn test_webhook(
    webhook_id: i32,
    pool: &State<PgPool>,
) -> Result<Json<AckResponse>, ApiError> {
    let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM webhooks WHERE id = $1")
        .bind(webhook_id)
        .fetch_optional(pool.inner())
        .await?;

    if exists.is_none() {
        return Err(ApiError::NotFound("Webhook not found".to_string()));
    }

    let queue = JobQueue::new(pool.inner().clone());
    queue
        .enqueue_test(webhook_id)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to enqueue test: {}", e)))?;

    Ok(Json(AckResponse { ok: true }))
}
