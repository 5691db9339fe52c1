use crate::import::DEFAULT_BATCH_SIZE;
use crate::import::normalize::normalize_row;
use crate::import::reader::{CsvBatches, count_data_rows};
use crate::import::tracker::ImportJobs;
use crate::import::upsert::ProductUpserter;
use crate::webhooks::dispatcher::dispatch_event;
use rocket_db_pools::sqlx::PgPool;
use std::path::Path;

/// Drive one import job from `pending` to `completed` or `failed`.
///
/// Invoked by the queue worker, which records the returned error on the
/// queue row; the import job row itself is updated here first, so both the
/// job tracker and the queue's own failure accounting see a batch failure.
pub async fn run_import(pool: &PgPool, job_id: i32, file_path: &str) -> Result<(), String> {
    let tracker = ImportJobs::new(pool.clone());

    let job = tracker
        .find(job_id)
        .await
        .map_err(|e| format!("failed to load import job {}: {}", job_id, e))?;

    let Some(job) = job else {
        log::warn!("import job {} no longer exists, skipping", job_id);
        return Ok(());
    };

    // The queue is at-least-once; a re-delivered job that already finished
    // must not run again.
    if job.status.is_terminal() {
        log::info!(
            "import job {} already {:?}, skipping duplicate invocation",
            job_id,
            job.status
        );
        return Ok(());
    }

    tracker
        .begin_parsing(job_id)
        .await
        .map_err(|e| format!("failed to start parsing for job {}: {}", job_id, e))?;

    let path = Path::new(file_path);
    if !path.exists() {
        log::warn!("job {}: source file '{}' is missing", job_id, file_path);
        tracker
            .fail(job_id, "uploaded file not found on server")
            .await
            .map_err(|e| format!("failed to record missing file for job {}: {}", job_id, e))?;
        return Ok(());
    }

    match import_file(pool, &tracker, job_id, path).await {
        Ok(processed) => {
            tracker
                .complete(job_id)
                .await
                .map_err(|e| format!("failed to complete job {}: {}", job_id, e))?;

            log::info!("job {}: import complete, {} rows processed", job_id, processed);

            // Fire-and-forget: an enqueue failure must never fail a
            // finished import.
            let payload = serde_json::json!({ "job_id": job_id, "processed": processed });
            if let Err(e) = dispatch_event(pool, "product.import.completed", payload).await {
                log::warn!("job {}: failed to queue completion webhooks: {}", job_id, e);
            }

            Ok(())
        }
        Err(message) => {
            if let Err(e) = tracker.fail(job_id, &message).await {
                log::error!("job {}: failed to record failure: {}", job_id, e);
            }

            Err(message)
        }
    }
}

/// Count, then stream: the first pass establishes `total_rows` before any
/// progress checkpoint is reported; the second pass consumes batches
/// strictly sequentially, advancing the checkpoint by each batch's raw row
/// count - dropped and deduplicated rows included.
async fn import_file(
    pool: &PgPool,
    tracker: &ImportJobs,
    job_id: i32,
    path: &Path,
) -> Result<usize, String> {
    let total = count_data_rows(path).map_err(|e| format!("failed to count rows: {}", e))?;

    tracker
        .set_total(job_id, total as i32)
        .await
        .map_err(|e| format!("failed to store row total: {}", e))?;
    tracker
        .begin_importing(job_id)
        .await
        .map_err(|e| format!("failed to start importing: {}", e))?;

    log::info!("job {}: importing {} data rows from '{}'", job_id, total, path.display());

    let upserter = ProductUpserter::new(pool.clone());
    let mut batches = CsvBatches::open(path, DEFAULT_BATCH_SIZE)
        .map_err(|e| format!("failed to open csv: {}", e))?;

    let mut processed = 0usize;

    while let Some(batch) = batches
        .next_batch()
        .map_err(|e| format!("csv read error: {}", e))?
    {
        let raw_count = batch.len();
        let rows = batch.iter().filter_map(normalize_row).collect();

        // A storage failure aborts the whole job; the sqlx message is
        // captured verbatim on the job row.
        upserter.upsert_batch(rows).await.map_err(|e| e.to_string())?;

        processed += raw_count;
        tracker
            .advance(job_id, raw_count as i32)
            .await
            .map_err(|e| format!("failed to checkpoint progress: {}", e))?;

        log::debug!("job {}: {} / {} rows processed", job_id, processed, total);
    }

    Ok(processed)
}
