use crate::jobs::queue::JobQueue;
use rocket_db_pools::sqlx::{self, PgPool};
use serde_json::Value;

/// Resolve matching subscribers for an event and enqueue one delivery job
/// per match. Returns the number of deliveries queued; zero matches is a
/// no-op, not an error.
///
/// Callers sit inside record-mutation paths and are required to log and
/// discard the error case - a dispatch failure must never unwind into the
/// operation that produced the event.
pub async fn dispatch_event(
    pool: &PgPool,
    event_type: &str,
    payload: Value,
) -> Result<usize, sqlx::Error> {
    let key = event_type.trim().to_lowercase();

    let hooks: Vec<(i32, String)> = sqlx::query_as(
        r#"SELECT id, url FROM webhooks
           WHERE enabled = TRUE AND LOWER(event_type) = $1
           ORDER BY id"#,
    )
    .bind(&key)
    .fetch_all(pool)
    .await?;

    if hooks.is_empty() {
        log::debug!("no subscribers for event '{}'", key);
        return Ok(0);
    }

    let queue = JobQueue::new(pool.clone());
    for (webhook_id, url) in &hooks {
        // The subscriber receives the producer's event type verbatim, not
        // the lowercased matching key.
        queue
            .enqueue_delivery(*webhook_id, url, event_type, payload.clone())
            .await?;
    }

    log::info!("queued {} deliveries for event '{}'", hooks.len(), key);
    Ok(hooks.len())
}
