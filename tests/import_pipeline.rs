use product_importer::import::runner::run_import;
use product_importer::import::tracker::ImportJobs;
use product_importer::jobs::queue::JobType;
use product_importer::models::{ImportJob, ImportStatus};
use product_importer::test_support::{TestDatabase, TestFixtures};
use rust_decimal::Decimal;
use std::io::Write;
use std::str::FromStr;
use tempfile::NamedTempFile;

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file
}

fn path_str(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().to_string()
}

async fn fetch_job(pool: &sqlx::PgPool, job_id: i32) -> ImportJob {
    ImportJobs::new(pool.clone())
        .find(job_id)
        .await
        .expect("load job")
        .expect("job exists")
}

async fn fetch_products(pool: &sqlx::PgPool) -> Vec<(String, String, Option<Decimal>)> {
    sqlx::query_as("SELECT sku, name, price FROM products ORDER BY sku")
        .fetch_all(pool)
        .await
        .expect("load products")
}

#[tokio::test]
async fn three_row_upload_converges_to_two_products() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();

    let csv = write_csv("sku,name,price\na1,Widget,9.99\nA1,Widget Pro,12.50\nb2,Gadget,\n");

    let tracker = ImportJobs::new(pool.clone());
    let job_id = tracker.create("products.csv").await.expect("create job");

    run_import(&pool, job_id, &path_str(&csv))
        .await
        .expect("import runs");

    let job = fetch_job(&pool, job_id).await;
    assert_eq!(job.status, ImportStatus::Completed);
    assert_eq!(job.total_rows, Some(3));
    assert_eq!(job.processed_rows, 3);
    assert_eq!(job.percentage(), Some(100.0));
    assert_eq!(job.error_message, None);
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());

    let products = fetch_products(&pool).await;
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].0, "A1");
    assert_eq!(products[0].1, "Widget Pro");
    assert_eq!(products[0].2, Some(Decimal::from_str("12.50").unwrap()));
    assert_eq!(products[1].0, "B2");
    assert_eq!(products[1].1, "Gadget");
    assert_eq!(products[1].2, None);

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn rerunning_the_same_file_is_idempotent() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();

    let csv = write_csv("sku,name,price\na1,Widget,9.99\nA1,Widget Pro,12.50\nb2,Gadget,\n");
    let tracker = ImportJobs::new(pool.clone());

    for _ in 0..2 {
        let job_id = tracker.create("products.csv").await.expect("create job");
        run_import(&pool, job_id, &path_str(&csv))
            .await
            .expect("import runs");
    }

    // Every key still resolves to its last occurrence, with no duplicates.
    let products = fetch_products(&pool).await;
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].1, "Widget Pro");
    assert_eq!(products[1].1, "Gadget");

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn dropped_rows_still_count_as_processed() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();

    // Second row has no sku, third has no name; both are dropped but both
    // still consume input.
    let csv = write_csv("sku,name\na1,Widget\n,NoSku\nb2,\n");

    let tracker = ImportJobs::new(pool.clone());
    let job_id = tracker.create("partial.csv").await.expect("create job");

    run_import(&pool, job_id, &path_str(&csv))
        .await
        .expect("import runs");

    let job = fetch_job(&pool, job_id).await;
    assert_eq!(job.status, ImportStatus::Completed);
    assert_eq!(job.total_rows, Some(3));
    assert_eq!(job.processed_rows, 3);

    let products = fetch_products(&pool).await;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].0, "A1");

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn missing_file_fails_job_without_progress() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();

    let tracker = ImportJobs::new(pool.clone());
    let job_id = tracker.create("ghost.csv").await.expect("create job");

    // The queue job itself succeeds; the failure lives on the import job.
    run_import(&pool, job_id, "/nonexistent/ghost.csv")
        .await
        .expect("missing file is not a queue-level failure");

    let job = fetch_job(&pool, job_id).await;
    assert_eq!(job.status, ImportStatus::Failed);
    assert_eq!(job.total_rows, None);
    assert_eq!(job.processed_rows, 0);
    assert_eq!(job.percentage(), None);
    assert_eq!(
        job.error_message.as_deref(),
        Some("uploaded file not found on server")
    );

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn vanished_job_is_a_noop() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();

    let csv = write_csv("sku,name\na1,Widget\n");

    run_import(&pool, 4242, &path_str(&csv))
        .await
        .expect("vanished job is skipped");

    assert!(fetch_products(&pool).await.is_empty());

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn duplicate_invocation_of_finished_job_is_skipped() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();

    let csv = write_csv("sku,name\na1,Widget\nb2,Gadget\n");

    let tracker = ImportJobs::new(pool.clone());
    let job_id = tracker.create("products.csv").await.expect("create job");

    run_import(&pool, job_id, &path_str(&csv))
        .await
        .expect("first invocation");
    run_import(&pool, job_id, &path_str(&csv))
        .await
        .expect("duplicate invocation");

    // The terminal-state guard kept the counter from doubling.
    let job = fetch_job(&pool, job_id).await;
    assert_eq!(job.status, ImportStatus::Completed);
    assert_eq!(job.processed_rows, 2);

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn completion_queues_webhooks_for_matching_subscribers() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    // Filter casing differs from the emitted event; matching is
    // case-insensitive. The disabled registration must never be picked up.
    let hook_id = fixtures
        .insert_webhook("http://example.invalid/hook", "Product.Import.Completed", true)
        .await
        .expect("insert webhook");
    fixtures
        .insert_webhook("http://example.invalid/disabled", "product.import.completed", false)
        .await
        .expect("insert disabled webhook");

    let csv = write_csv("sku,name\na1,Widget\nb2,Gadget\n");
    let tracker = ImportJobs::new(pool.clone());
    let job_id = tracker.create("products.csv").await.expect("create job");

    run_import(&pool, job_id, &path_str(&csv))
        .await
        .expect("import runs");

    let deliveries = fixtures
        .queued_jobs(JobType::WebhookDeliver)
        .await
        .expect("load queue");
    assert_eq!(deliveries.len(), 1);

    let payload = &deliveries[0].1;
    assert_eq!(payload["webhook_id"], hook_id);
    assert_eq!(payload["event_type"], "product.import.completed");
    assert_eq!(payload["payload"]["job_id"], job_id);
    assert_eq!(payload["payload"]["processed"], 2);

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn upsert_preserves_existing_active_flag_and_collapses_case() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    // Previously deactivated record; a re-import must update its fields but
    // leave it inactive.
    fixtures
        .insert_product("ABC", "Old Name", None, false)
        .await
        .expect("insert product");

    let csv = write_csv("sku,name,price\nabc,New Name,1.00\n");
    let tracker = ImportJobs::new(pool.clone());
    let job_id = tracker.create("products.csv").await.expect("create job");

    run_import(&pool, job_id, &path_str(&csv))
        .await
        .expect("import runs");

    let rows: Vec<(String, String, bool)> =
        sqlx::query_as("SELECT sku, name, active FROM products")
            .fetch_all(&pool)
            .await
            .expect("load products");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "ABC");
    assert_eq!(rows[0].1, "New Name");
    assert!(!rows[0].2);

    test_db.close().await.expect("drop test database");
}
