// meta-gateway/tests/exiftool_smoke.rs
// Runs against a real exiftool when one is installed, otherwise returns early

use meta_gateway::{ExifTool, MetadataError, MetadataStore};
use tempfile::TempDir;

async fn exiftool() -> Option<ExifTool> {
    let tool = ExifTool::new("exiftool");
    match tool.version().await {
        Ok(version) if !version.is_empty() => Some(tool),
        _ => {
            eprintln!("exiftool not installed, skipping");
            None
        }
    }
}

#[tokio::test]
async fn test_missing_file_is_read_error_not_corruption() {
    let temp_dir = TempDir::new().unwrap();
    let tool = ExifTool::new("exiftool");

    let err = tool
        .read(&temp_dir.path().join("missing.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, MetadataError::Read { .. }));
    assert!(!err.is_corrupted());
}

#[tokio::test]
async fn test_garbage_jpeg_is_corrupted() {
    let Some(tool) = exiftool().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.jpg");
    std::fs::write(&path, b"definitely not a jpeg").unwrap();

    let err = tool.read(&path).await.unwrap_err();
    assert!(err.is_corrupted(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_missing_program_is_spawn_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("a.jpg");
    std::fs::write(&path, b"x").unwrap();

    let tool = ExifTool::new("exiftool-does-not-exist-anywhere");
    let err = tool.read(&path).await.unwrap_err();
    assert!(matches!(err, MetadataError::Spawn { .. }));
    assert!(tool.version().await.is_err());
}
