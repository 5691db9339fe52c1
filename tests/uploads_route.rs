use product_importer::jobs::queue::JobType;
use product_importer::models::{ImportJobStatus, ImportStatus};
use product_importer::routes::uploads::{get_upload_status, upload_csv};
use product_importer::test_support::{TestDatabase, TestFixtures, TestRocketBuilder};
use rocket::http::{Header, Status};
use rocket::routes;

const BOUNDARY: &str = "X-UPLOAD-BOUNDARY";

fn multipart_csv(filename: &str, contents: &str) -> (Header<'static>, String) {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: text/csv\r\n\r\n{contents}\r\n--{b}--\r\n",
        b = BOUNDARY,
    );
    let header = Header::new(
        "Content-Type",
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    (header, body)
}

#[tokio::test]
async fn upload_stages_file_creates_job_and_queues_import() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let staging = tempfile::tempdir().expect("staging dir");
    unsafe { std::env::set_var("UPLOAD_DIR", staging.path()) };

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![upload_csv, get_upload_status])
        .async_client()
        .await;

    let csv = "sku,name,price\na1,Widget,9.99\n";
    let (header, body) = multipart_csv("products.csv", csv);

    let response = client
        .post("/api/v1/uploads")
        .header(header)
        .body(body)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let accepted: serde_json::Value = response.into_json().await.expect("upload payload");
    let job_id = accepted["job_id"].as_i64().expect("job id");
    assert_eq!(accepted["status"], "pending");

    // Polling reports the freshly created job with undefined percentage.
    let response = client
        .get(format!("/api/v1/uploads/{}", job_id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let status: ImportJobStatus = response.into_json().await.expect("status payload");
    assert_eq!(status.filename, "products.csv");
    assert_eq!(status.status, ImportStatus::Pending);
    assert_eq!(status.total_rows, None);
    assert_eq!(status.processed_rows, 0);
    assert_eq!(status.percentage, None);

    // The queued import points at the staged copy of the upload.
    let imports = fixtures
        .queued_jobs(JobType::Import)
        .await
        .expect("load queue");
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].1["job_id"].as_i64(), Some(job_id));

    let staged_path = imports[0].1["file_path"].as_str().expect("file path");
    let staged = std::fs::read_to_string(staged_path).expect("staged file");
    assert_eq!(staged, csv);

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn upload_rejects_non_csv_filenames() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![upload_csv])
        .async_client()
        .await;

    let (header, body) = multipart_csv("data.txt", "sku,name\na1,Widget\n");

    let response = client
        .post("/api/v1/uploads")
        .header(header)
        .body(body)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    assert!(
        fixtures
            .queued_jobs(JobType::Import)
            .await
            .expect("load queue")
            .is_empty()
    );

    test_db.close().await.expect("drop test database");
}

#[tokio::test]
async fn unknown_job_status_is_not_found() {
    let test_db = TestDatabase::new().await.expect("provision test database");
    let pool = test_db.pool_clone();

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![get_upload_status])
        .async_client()
        .await;

    let response = client.get("/api/v1/uploads/4242").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    test_db.close().await.expect("drop test database");
}
