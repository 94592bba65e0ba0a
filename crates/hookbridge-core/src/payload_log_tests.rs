//! Tests for the rotating payload logger

use super::*;
use crate::ServiceName;
use serde_json::json;
use tempfile::TempDir;

fn logger_in(dir: &TempDir, max_bytes: u64, backup_count: u32) -> PayloadLogger {
    PayloadLogger::new(dir.path(), max_bytes, backup_count, "payload.log")
}

fn github() -> ServiceName {
    ServiceName::new("github").unwrap()
}

fn success_record(marker: &str) -> PayloadRecord {
    PayloadRecord {
        timestamp: Timestamp::now(),
        webhook_type: "github".to_string(),
        payload: json!({"marker": marker}),
        source_ip: "10.0.0.1".to_string(),
        user_agent: "GitHub-Hookshot/1".to_string(),
        processing_status: ProcessingStatus::Success,
        generated_message: Some(format!("msg {}", marker)),
        content_length: Some(20),
    }
}

// ============================================================================
// Append Tests
// ============================================================================

#[tokio::test]
async fn test_append_creates_service_directory() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);

    logger.append(&github(), &success_record("a")).await.unwrap();

    assert!(dir.path().join("github").join("payload.log").exists());
}

#[tokio::test]
async fn test_append_writes_one_json_object_per_line() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);

    logger.append(&github(), &success_record("a")).await.unwrap();
    logger.append(&github(), &success_record("b")).await.unwrap();

    let contents =
        std::fs::read_to_string(dir.path().join("github").join("payload.log")).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);

    for line in lines {
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(parsed["webhook_type"], "github");
        assert_eq!(parsed["processing_status"], "success");
        assert!(parsed["timestamp"].is_string());
    }
}

#[tokio::test]
async fn test_append_omits_absent_optional_fields() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);

    let mut record = success_record("a");
    record.processing_status = ProcessingStatus::Failure;
    record.generated_message = None;
    record.content_length = None;
    logger.append(&github(), &record).await.unwrap();

    let contents =
        std::fs::read_to_string(dir.path().join("github").join("payload.log")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
    assert_eq!(parsed["processing_status"], "failure");
    assert!(parsed.get("generated_message").is_none());
    assert!(parsed.get("content_length").is_none());
}

#[tokio::test]
async fn test_disabled_logger_drops_appends() {
    let logger = PayloadLogger::disabled();
    logger.append(&github(), &success_record("a")).await.unwrap();
    assert!(logger.recent(&github(), 10).await.unwrap().is_empty());
    assert!(logger.service_dirs().await.unwrap().is_empty());
}

// ============================================================================
// Rotation Tests
// ============================================================================

/// The write that pushes the active file past the threshold triggers
/// rotation; the next write opens a fresh active file.
#[tokio::test]
async fn test_rotation_at_threshold() {
    let dir = TempDir::new().unwrap();
    // Every record is larger than the threshold, so each append rotates.
    let logger = logger_in(&dir, 64, 5);

    logger.append(&github(), &success_record("first")).await.unwrap();
    let service_dir = dir.path().join("github");
    assert!(service_dir.join("payload.log.1").exists());
    assert!(!service_dir.join("payload.log").exists());

    logger.append(&github(), &success_record("second")).await.unwrap();
    assert!(service_dir.join("payload.log.2").exists());
    assert!(service_dir.join("payload.log.1").exists());
}

#[tokio::test]
async fn test_rotation_discards_beyond_backup_count() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 64, 2);

    for marker in ["a", "b", "c", "d"] {
        logger.append(&github(), &success_record(marker)).await.unwrap();
    }

    let service_dir = dir.path().join("github");
    assert!(service_dir.join("payload.log.1").exists());
    assert!(service_dir.join("payload.log.2").exists());
    assert!(!service_dir.join("payload.log.3").exists());

    // The newest rotation holds the most recent entry.
    let newest = std::fs::read_to_string(service_dir.join("payload.log.1")).unwrap();
    assert!(newest.contains("\"marker\":\"d\""));
}

#[tokio::test]
async fn test_small_appends_do_not_rotate() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);

    logger.append(&github(), &success_record("a")).await.unwrap();
    logger.append(&github(), &success_record("b")).await.unwrap();

    let service_dir = dir.path().join("github");
    assert!(service_dir.join("payload.log").exists());
    assert!(!service_dir.join("payload.log.1").exists());
}

// ============================================================================
// Recent Tests
// ============================================================================

#[tokio::test]
async fn test_recent_returns_newest_first() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);

    for marker in ["a", "b", "c"] {
        logger.append(&github(), &success_record(marker)).await.unwrap();
    }

    let entries = logger.recent(&github(), 2).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].payload["marker"], "c");
    assert_eq!(entries[1].payload["marker"], "b");
}

#[tokio::test]
async fn test_recent_spans_rotated_files() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 64, 5);

    for marker in ["a", "b", "c"] {
        logger.append(&github(), &success_record(marker)).await.unwrap();
    }

    let entries = logger.recent(&github(), 10).await.unwrap();
    let markers: Vec<&str> = entries
        .iter()
        .map(|e| e.payload["marker"].as_str().unwrap())
        .collect();
    assert_eq!(markers, vec!["c", "b", "a"]);
}

#[tokio::test]
async fn test_recent_for_unknown_service_is_empty() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);

    let entries = logger
        .recent(&ServiceName::new("nothing").unwrap(), 10)
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_recent_skips_corrupt_lines() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);
    logger.append(&github(), &success_record("a")).await.unwrap();

    let active = dir.path().join("github").join("payload.log");
    let mut contents = std::fs::read_to_string(&active).unwrap();
    contents.push_str("not json\n");
    std::fs::write(&active, contents).unwrap();

    let entries = logger.recent(&github(), 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payload["marker"], "a");
}

// ============================================================================
// Directory Enumeration Tests
// ============================================================================

#[tokio::test]
async fn test_service_dirs_lists_sorted_services() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);

    logger
        .append(&ServiceName::new("stripe").unwrap(), &success_record("a"))
        .await
        .unwrap();
    logger.append(&github(), &success_record("b")).await.unwrap();

    assert_eq!(
        logger.service_dirs().await.unwrap(),
        vec!["github".to_string(), "stripe".to_string()]
    );
}

#[tokio::test]
async fn test_service_dirs_empty_before_first_write() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);
    assert!(logger.service_dirs().await.unwrap().is_empty());
}

// ============================================================================
// Removal Tests
// ============================================================================

#[tokio::test]
async fn test_remove_service_deletes_directory() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);
    logger.append(&github(), &success_record("a")).await.unwrap();
    assert!(dir.path().join("github").exists());

    logger.remove_service(&github()).await.unwrap();
    assert!(!dir.path().join("github").exists());
}

#[tokio::test]
async fn test_remove_missing_service_is_ok() {
    let dir = TempDir::new().unwrap();
    let logger = logger_in(&dir, 10 * 1024 * 1024, 5);
    logger.remove_service(&github()).await.unwrap();
}
