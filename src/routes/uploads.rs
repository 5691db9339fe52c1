//! CSV upload intake and import job status polling.

use crate::error::ApiError;
use crate::import::tracker::ImportJobs;
use crate::jobs::JobQueue;
use crate::models::{ImportJobStatus, ImportStatus};
use rocket::State;
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::PgPool;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Directory uploads are staged into before the background import reads
/// them; created at startup.
pub fn upload_dir() -> PathBuf {
    std::env::var("UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".to_string())
        .into()
}

#[derive(FromForm)]
pub struct CsvUpload<'f> {
    pub file: TempFile<'f>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UploadAccepted {
    pub job_id: i32,
    pub status: ImportStatus,
}

/// Accept a CSV upload, create the import job and enqueue it.
///
/// The file is staged under a UUID name so concurrent uploads of identically
/// named files never collide.
#[openapi(skip)]
#[post("/uploads", data = "<upload>")]
pub async fn upload_csv(
    upload: Form<CsvUpload<'_>>,
    pool: &State<PgPool>,
) -> Result<Json<UploadAccepted>, ApiError> {
    let mut upload = upload.into_inner();

    let original_name = upload
        .file
        .raw_name()
        .map(|n| n.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .unwrap_or_default();

    if !original_name.to_lowercase().ends_with(".csv") {
        return Err(ApiError::BadRequest(
            "Only CSV files are supported".to_string(),
        ));
    }

    let stored_path = upload_dir().join(format!("{}.csv", Uuid::new_v4()));
    upload
        .file
        .copy_to(&stored_path)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store upload: {}", e)))?;

    let tracker = ImportJobs::new(pool.inner().clone());
    let job_id = tracker.create(&original_name).await?;

    let queue = JobQueue::new(pool.inner().clone());
    queue
        .enqueue_import(job_id, &stored_path.to_string_lossy())
        .await
        .map_err(|e| ApiError::Internal(format!("failed to enqueue import: {}", e)))?;

    log::info!(
        "upload '{}' staged as '{}', import job {} queued",
        original_name,
        stored_path.display(),
        job_id
    );

    Ok(Json(UploadAccepted {
        job_id,
        status: ImportStatus::Pending,
    }))
}

/// Poll the status of an import job.
#[openapi(tag = "Uploads")]
#[get("/uploads/<job_id>")]
pub async fn get_upload_status(
    job_id: i32,
    pool: &State<PgPool>,
) -> Result<Json<ImportJobStatus>, ApiError> {
    let tracker = ImportJobs::new(pool.inner().clone());

    let job = tracker
        .find(job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Upload job not found".to_string()))?;

    Ok(Json(job.into()))
}
