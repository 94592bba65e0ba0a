//! Tests for the field-pattern parser

use super::*;

// ============================================================================
// Basic Parsing Tests
// ============================================================================

#[test]
fn test_parse_single_identifier() {
    let patterns = parse_patterns("action").unwrap();
    assert_eq!(patterns, vec![FieldPattern::leaf("action")]);
}

#[test]
fn test_parse_comma_separated_roots() {
    let patterns = parse_patterns("action,number,sender").unwrap();
    assert_eq!(
        patterns,
        vec![
            FieldPattern::leaf("action"),
            FieldPattern::leaf("number"),
            FieldPattern::leaf("sender"),
        ]
    );
}

#[test]
fn test_parse_nested_group() {
    let patterns = parse_patterns("repository{name}").unwrap();
    assert_eq!(
        patterns,
        vec![FieldPattern::with_children(
            "repository",
            vec![FieldPattern::leaf("name")]
        )]
    );
}

#[test]
fn test_parse_deep_nesting() {
    let patterns = parse_patterns("pull_request{title,user{login}}").unwrap();
    assert_eq!(
        patterns,
        vec![FieldPattern::with_children(
            "pull_request",
            vec![
                FieldPattern::leaf("title"),
                FieldPattern::with_children("user", vec![FieldPattern::leaf("login")]),
            ]
        )]
    );
}

#[test]
fn test_parse_whitespace_between_tokens() {
    let patterns = parse_patterns(" action , locations { search_id , asset_type } ").unwrap();
    assert_eq!(
        patterns,
        vec![
            FieldPattern::leaf("action"),
            FieldPattern::with_children(
                "locations",
                vec![
                    FieldPattern::leaf("search_id"),
                    FieldPattern::leaf("asset_type"),
                ]
            ),
        ]
    );
}

/// Successive brace groups on one root merge into a single child list, so
/// `a{b}{c}` traverses both b and c under a.
#[test]
fn test_parse_successive_groups_merge() {
    let patterns = parse_patterns("data{object{id}}{kind}").unwrap();
    assert_eq!(
        patterns,
        vec![FieldPattern::with_children(
            "data",
            vec![
                FieldPattern::with_children("object", vec![FieldPattern::leaf("id")]),
                FieldPattern::leaf("kind"),
            ]
        )]
    );
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_parse_empty_expression_fails() {
    assert_eq!(parse_patterns(""), Err(PatternError::Empty));
    assert_eq!(parse_patterns("   "), Err(PatternError::Empty));
}

#[test]
fn test_parse_unclosed_brace_fails() {
    assert!(matches!(
        parse_patterns("repository{name"),
        Err(PatternError::UnbalancedBraces { .. })
    ));
}

#[test]
fn test_parse_stray_closing_brace_fails() {
    assert!(matches!(
        parse_patterns("action}"),
        Err(PatternError::UnexpectedCharacter { character: '}', .. })
    ));
}

#[test]
fn test_parse_empty_group_fails() {
    assert!(matches!(
        parse_patterns("repository{}"),
        Err(PatternError::EmptyIdentifier { .. })
    ));
}

#[test]
fn test_parse_missing_identifier_fails() {
    assert!(matches!(
        parse_patterns("a,,b"),
        Err(PatternError::EmptyIdentifier { .. })
    ));
    assert!(matches!(
        parse_patterns("{name}"),
        Err(PatternError::EmptyIdentifier { .. })
    ));
}

#[test]
fn test_parse_adjacent_identifiers_fail() {
    assert!(matches!(
        parse_patterns("action number"),
        Err(PatternError::UnexpectedCharacter { .. })
    ));
}
