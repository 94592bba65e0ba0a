//! Tests for shared identifier and alignment types

use super::*;

// ============================================================================
// ServiceName Tests
// ============================================================================

#[test]
fn test_service_name_accepts_lowercase_identifiers() {
    for name in ["github", "stripe", "net_device-mgr", "s3"] {
        assert!(ServiceName::new(name).is_ok(), "{} should be valid", name);
    }
}

#[test]
fn test_service_name_rejects_invalid_characters() {
    for name in ["GitHub", "git hub", "git.hub", "", "hook/route"] {
        assert!(ServiceName::new(name).is_err(), "{} should be invalid", name);
    }
}

#[test]
fn test_service_name_display_round_trip() {
    let name = ServiceName::new("github").unwrap();
    assert_eq!(name.to_string(), "github");
    assert_eq!("github".parse::<ServiceName>().unwrap(), name);
}

// ============================================================================
// Token Tests
// ============================================================================

#[test]
fn test_token_accepts_32_alphanumeric_characters() {
    let token = Token::new("A".repeat(32)).unwrap();
    assert_eq!(token.as_str().len(), 32);
    assert!(!token.is_legacy());
}

#[test]
fn test_token_accepts_literal_legacy() {
    let token = Token::new("legacy").unwrap();
    assert!(token.is_legacy());
    assert_eq!(token, Token::legacy());
}

#[test]
fn test_token_rejects_wrong_length() {
    assert!(Token::new("abc").is_err());
    assert!(Token::new("A".repeat(33)).is_err());
}

#[test]
fn test_token_rejects_non_alphanumeric() {
    let mut value = "A".repeat(31);
    value.push('-');
    assert!(Token::new(value).is_err());
}

// ============================================================================
// Alignment Tests
// ============================================================================

#[test]
fn test_alignment_parses_all_forms() {
    assert_eq!("".parse::<Alignment>().unwrap(), Alignment::None);
    assert_eq!("org:7".parse::<Alignment>().unwrap(), Alignment::Org(7));
    assert_eq!(
        "device:24".parse::<Alignment>().unwrap(),
        Alignment::Device(24)
    );
}

#[test]
fn test_alignment_rejects_malformed_values() {
    for value in ["org", "org:", "org:x", "site:3", "device:-1"] {
        assert!(value.parse::<Alignment>().is_err(), "{} should fail", value);
    }
}

#[test]
fn test_alignment_display_round_trip() {
    for value in ["", "org:3", "device:24"] {
        let alignment = value.parse::<Alignment>().unwrap();
        assert_eq!(alignment.to_string(), value);
    }
}

#[test]
fn test_aligned_resource_paths() {
    assert_eq!(Alignment::None.aligned_resource(), "/api/organization/0");
    assert_eq!(Alignment::Org(12).aligned_resource(), "/api/organization/12");
    assert_eq!(Alignment::Device(24).aligned_resource(), "/api/device/24");
}

// ============================================================================
// Timestamp Tests
// ============================================================================

#[test]
fn test_timestamp_rfc3339_parses_back() {
    let now = Timestamp::now();
    let text = now.to_rfc3339();
    assert!(chrono::DateTime::parse_from_rfc3339(&text).is_ok());
}

#[test]
fn test_timestamp_backup_stamp_shape() {
    let stamp = Timestamp::now().backup_stamp();
    // YYYYMMDD_HHMMSS
    assert_eq!(stamp.len(), 15);
    assert_eq!(stamp.as_bytes()[8], b'_');
    assert!(stamp
        .chars()
        .all(|c| c.is_ascii_digit() || c == '_'));
}
