//! Tests for JSON field extraction

use super::*;
use serde_json::json;

fn run(payload: serde_json::Value, expression: &str) -> ValueMap {
    let patterns = parse_patterns(expression).unwrap();
    extract(&payload, &patterns)
}

// ============================================================================
// Object Descent Tests
// ============================================================================

#[test]
fn test_extract_top_level_scalar() {
    let map = run(json!({"action": "opened"}), "action");
    assert_eq!(map["action"], Extracted::Single(json!("opened")));
}

#[test]
fn test_extract_nested_path() {
    let payload = json!({
        "pull_request": {"title": "T", "user": {"login": "u"}},
        "repository": {"name": "R"},
    });
    let map = run(payload, "pull_request{title,user{login}},repository{name}");

    assert_eq!(map["pull_request.title"], Extracted::Single(json!("T")));
    assert_eq!(map["pull_request.user.login"], Extracted::Single(json!("u")));
    assert_eq!(map["repository.name"], Extracted::Single(json!("R")));
}

#[test]
fn test_extract_missing_root_contributes_nothing() {
    let map = run(json!({"action": "opened"}), "missing{child}");
    assert!(map.is_empty());
}

#[test]
fn test_extract_missing_subkey_stops_branch() {
    let map = run(json!({"repository": {"name": "R"}}), "repository{owner}");
    assert!(map.is_empty());
}

/// Descending into a scalar when the node still has children is a silent
/// type mismatch.
#[test]
fn test_extract_scalar_with_children_is_silent() {
    let map = run(json!({"action": "opened"}), "action{subfield}");
    assert!(map.is_empty());
}

/// An object at a leaf position records nothing; only scalars are values.
#[test]
fn test_extract_object_at_leaf_records_nothing() {
    let map = run(json!({"repository": {"name": "R"}}), "repository");
    assert!(map.is_empty());
}

#[test]
fn test_extract_numeric_and_boolean_scalars() {
    let map = run(json!({"number": 42, "merged": true}), "number,merged");
    assert_eq!(map["number"], Extracted::Single(json!(42)));
    assert_eq!(map["merged"], Extracted::Single(json!(true)));
}

// ============================================================================
// Array Fan-out Tests
// ============================================================================

#[test]
fn test_extract_array_fans_out_in_order() {
    let payload = json!({
        "locations": [
            {"search_id": "a", "asset_type": "cpe"},
            {"search_id": "b", "asset_type": "node"},
        ]
    });
    let map = run(payload, "locations{search_id,asset_type}");

    assert_eq!(
        map["locations.search_id"],
        Extracted::Many(vec![json!("a"), json!("b")])
    );
    assert_eq!(
        map["locations.asset_type"],
        Extracted::Many(vec![json!("cpe"), json!("node")])
    );
}

/// Elements lacking the requested subkey contribute nothing; the rest
/// contribute in order.
#[test]
fn test_extract_partial_array_elements() {
    let payload = json!({
        "locations": [
            {"search_id": "a"},
            {"asset_type": "node"},
        ]
    });
    let map = run(payload, "locations{search_id,asset_type}");

    assert_eq!(map["locations.search_id"], Extracted::Single(json!("a")));
    assert_eq!(map["locations.asset_type"], Extracted::Single(json!("node")));
}

#[test]
fn test_extract_array_of_scalars_at_leaf() {
    let map = run(json!({"labels": ["bug", "p1"]}), "labels");
    assert_eq!(
        map["labels"],
        Extracted::Many(vec![json!("bug"), json!("p1")])
    );
}

/// Arrays of arrays fan out transitively; every leaf scalar is collected.
#[test]
fn test_extract_nested_arrays_flatten() {
    let payload = json!({"matrix": [["a", "b"], ["c"]]});
    let map = run(payload, "matrix");
    assert_eq!(
        map["matrix"],
        Extracted::Many(vec![json!("a"), json!("b"), json!("c")])
    );
}

#[test]
fn test_extract_descends_through_nested_arrays_of_objects() {
    let payload = json!({
        "groups": [
            [{"id": 1}, {"id": 2}],
            [{"id": 3}],
        ]
    });
    let map = run(payload, "groups{id}");
    assert_eq!(
        map["groups.id"],
        Extracted::Many(vec![json!(1), json!(2), json!(3)])
    );
}

#[test]
fn test_extract_array_elements_of_wrong_shape_skipped() {
    let payload = json!({"items": [{"id": 1}, "stray", {"id": 2}]});
    let map = run(payload, "items{id}");
    assert_eq!(map["items.id"], Extracted::Many(vec![json!(1), json!(2)]));
}

// ============================================================================
// Null Handling Tests
// ============================================================================

#[test]
fn test_extract_null_only_path_is_absent() {
    let map = run(json!({"assignee": null}), "assignee");
    assert!(!map.contains_key("assignee"));
}

#[test]
fn test_extract_null_inside_fanout_is_retained() {
    let payload = json!({"items": [{"id": "a"}, {"id": null}]});
    let map = run(payload, "items{id}");
    assert_eq!(
        map["items.id"],
        Extracted::Many(vec![json!("a"), json!(null)])
    );
    assert_eq!(map["items.id"].render(), "a, ");
}

// ============================================================================
// Accumulation Tests
// ============================================================================

/// Identical paths reached via two distinct patterns merge into one
/// accumulation.
#[test]
fn test_extract_duplicate_paths_merge() {
    let map = run(json!({"repository": {"name": "R"}}), "repository{name},repository{name}");
    assert_eq!(
        map["repository.name"],
        Extracted::Many(vec![json!("R"), json!("R")])
    );
}

#[test]
fn test_extract_is_deterministic_under_repetition() {
    let payload = json!({"locations": [{"id": "a"}, {"id": "b"}]});
    let first = run(payload.clone(), "locations{id}");
    let second = run(payload, "locations{id}");
    assert_eq!(first, second);
}

// ============================================================================
// Rendering Tests
// ============================================================================

#[test]
fn test_render_joins_lists_with_comma_space() {
    let extracted = Extracted::Many(vec![json!("a"), json!("b")]);
    assert_eq!(extracted.render(), "a, b");
}

#[test]
fn test_render_index_selects_element() {
    let extracted = Extracted::Many(vec![json!("cpe"), json!("node")]);
    assert_eq!(extracted.render_index(0), "cpe");
    assert_eq!(extracted.render_index(1), "node");
    assert_eq!(extracted.render_index(2), "");
}

#[test]
fn test_render_index_on_single_value() {
    let extracted = Extracted::Single(json!("only"));
    assert_eq!(extracted.render_index(0), "only");
    assert_eq!(extracted.render_index(1), "");
}

#[test]
fn test_scalar_to_string_forms() {
    assert_eq!(scalar_to_string(&json!("text")), "text");
    assert_eq!(scalar_to_string(&json!(7)), "7");
    assert_eq!(scalar_to_string(&json!(2.5)), "2.5");
    assert_eq!(scalar_to_string(&json!(false)), "false");
    assert_eq!(scalar_to_string(&json!(null)), "");
}
