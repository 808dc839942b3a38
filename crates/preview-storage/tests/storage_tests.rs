//! S3 integration tests.
//!
//! Run with: `cargo test -p preview-storage --test storage_tests -- --ignored`
//! against a bucket named by `PREVIEW_TEST_BUCKET`.

use preview_storage::{ObjectStore, S3Client};

fn test_bucket() -> String {
    std::env::var("PREVIEW_TEST_BUCKET").expect("PREVIEW_TEST_BUCKET not set")
}

#[tokio::test]
#[ignore = "requires S3 credentials"]
async fn test_s3_connection() {
    dotenvy::dotenv().ok();

    let client = S3Client::from_env().await.expect("Failed to create S3 client");
    client
        .check_bucket(&test_bucket())
        .await
        .expect("Failed to reach test bucket");
}

#[tokio::test]
#[ignore = "requires S3 credentials"]
async fn test_upload_download() {
    use std::io::Write;
    use tempfile::NamedTempFile;

    dotenvy::dotenv().ok();

    let client = S3Client::from_env().await.expect("Failed to create S3 client");
    let bucket = test_bucket();
    let key = "test/integration/preview.mp4";

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(b"Integration test content")
        .expect("Failed to write to temp file");

    let sent = client
        .upload_file(&bucket, key, temp_file.path(), "video/mp4")
        .await
        .expect("Failed to upload");
    assert_eq!(sent, 24);

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let local = dir.path().join("downloaded.mp4");
    let written = client
        .download_to_file(&bucket, key, &local)
        .await
        .expect("Failed to download");
    assert_eq!(written, 24);
    assert_eq!(
        std::fs::read(&local).expect("Failed to read download"),
        b"Integration test content"
    );
}

#[tokio::test]
#[ignore = "requires S3 credentials"]
async fn test_missing_key_is_not_found() {
    dotenvy::dotenv().ok();

    let client = S3Client::from_env().await.expect("Failed to create S3 client");
    let err = client
        .get_object(&test_bucket(), "test/integration/does-not-exist.mp4")
        .await
        .expect_err("missing key should fail");
    assert!(err.is_not_found());
}
