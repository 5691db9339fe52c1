use crate::import;
use crate::jobs::queue::{DeliveryTask, ImportTask, JobQueue, JobType, QueuedJob, WebhookTestTask};
use crate::webhooks::delivery::DeliveryWorker;
use rocket_db_pools::sqlx::PgPool;
use std::time::Duration;

pub struct JobWorker {
    pool: PgPool,
    queue: JobQueue,
    delivery: DeliveryWorker,
}

impl JobWorker {
    pub fn new(pool: PgPool) -> Self {
        let queue = JobQueue::new(pool.clone());
        Self {
            pool,
            queue,
            delivery: DeliveryWorker::new(),
        }
    }

    /// Run worker loop forever
    ///
    /// Each claimed job is spawned onto the runtime, so a slow import or a
    /// stalled delivery never blocks the claim loop or sibling jobs.
    pub async fn run(self) -> ! {
        log::info!("job worker started");

        loop {
            let job = match self.queue.claim_next().await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    // No jobs available, sleep and retry
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
                Err(e) => {
                    log::error!("worker: failed to claim job: {}", e);
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    continue;
                }
            };

            log::info!("worker: claimed {:?} job {}", job.job_type, job.id);

            let pool = self.pool.clone();
            let delivery = self.delivery.clone();

            tokio::spawn(async move {
                let queue = JobQueue::new(pool.clone());

                match Self::process_job(&pool, &delivery, &job).await {
                    Ok(()) => {
                        if let Err(e) = queue.complete(job.id).await {
                            log::error!("failed to mark job {} complete: {}", job.id, e);
                        }
                    }
                    Err(message) => {
                        log::error!("worker: job {} failed: {}", job.id, message);

                        if let Err(e) = queue.fail(job.id, &message).await {
                            log::error!("failed to mark job {} failed: {}", job.id, e);
                        }
                    }
                }
            });
        }
    }

    async fn process_job(
        pool: &PgPool,
        delivery: &DeliveryWorker,
        job: &QueuedJob,
    ) -> Result<(), String> {
        match job.job_type {
            JobType::Import => {
                let task: ImportTask = serde_json::from_value(job.payload.clone())
                    .map_err(|e| format!("invalid import payload: {}", e))?;

                import::runner::run_import(pool, task.job_id, &task.file_path).await
            }
            JobType::WebhookDeliver => {
                let task: DeliveryTask = serde_json::from_value(job.payload.clone())
                    .map_err(|e| format!("invalid delivery payload: {}", e))?;

                // All delivery outcomes, including transport failures, are
                // recorded on the webhook row and absorbed here.
                delivery
                    .deliver(pool, task.webhook_id, &task.url, &task.event_type, &task.payload)
                    .await;

                Ok(())
            }
            JobType::WebhookTest => {
                let task: WebhookTestTask = serde_json::from_value(job.payload.clone())
                    .map_err(|e| format!("invalid webhook test payload: {}", e))?;

                delivery
                    .run_test(pool, task.webhook_id)
                    .await
                    .map_err(|e| format!("webhook test failed: {}", e))
            }
        }
    }
}
