use std::collections::BTreeMap;

use json_path_extract::{distinct, AttributeContext, Engine, MatchingPath};
use pretty_assertions::assert_eq;
use serde_json::json;

fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_filter_bindings_do_not_leak_between_elements() {
    let engine = Engine::new();
    let doc = json!({"items": [{"id": "a", "value": 1}, {"id": "b", "value": 2}]});
    let found = engine.find_matching_paths(&doc, "$.items[?(@.id=${id})].value").unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].path_attributes, tags(&[("id", "a")]));
    assert_eq!(found[0].matched_object, json!(1));
    assert_eq!(found[1].path_attributes, tags(&[("id", "b")]));
    assert_eq!(found[1].matched_object, json!(2));
}

#[test]
fn test_sibling_placeholders_do_not_leak() {
    let engine = Engine::new();
    // Only "x" has a nested map, so the inner binding must never show up for "y".
    let doc = json!({"m": {"x": {"inner": {"k": 1}}, "y": {"inner": 5}}});
    let found = engine.find_matching_paths(&doc, "$.m.${outer}.inner").unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[1].path_attributes, tags(&[("outer", "y")]));

    let deeper = engine.find_matching_paths(&doc, "$.m.${outer}.inner.${leaf}").unwrap();
    assert_eq!(deeper.len(), 1);
    assert_eq!(deeper[0].path_attributes, tags(&[("leaf", "k"), ("outer", "x")]));
}

#[test]
fn test_range_selects_in_order() {
    let engine = Engine::new();
    let doc = json!({"list": ["a", "b", "c", "d", "e"]});
    let found = engine.find_matching_paths(&doc, "$.list[1:3]").unwrap();
    let got: Vec<_> = found
        .iter()
        .map(|m| (m.full_object_path.as_str(), m.matched_object.clone()))
        .collect();
    assert_eq!(got, vec![("$.list[1]", json!("b")), ("$.list[2]", json!("c"))]);

    assert_eq!(engine.find_matching_paths(&doc, "$.list[3:100]").unwrap().len(), 2);
    assert_eq!(engine.find_matching_paths(&doc, "$.list[:2]").unwrap().len(), 2);
    assert!(engine.find_matching_paths(&doc, "$.list[4:2]").unwrap().is_empty());
    assert!(engine.find_matching_paths(&doc, "$.list[7:9]").unwrap().is_empty());
}

#[test]
fn test_index_past_end_is_not_an_error() {
    let engine = Engine::new();
    let doc = json!({"list": [1, 2]});
    assert!(engine.find_matching_paths(&doc, "$.list[2]").unwrap().is_empty());
    let found = engine.find_matching_paths(&doc, "$.list[1]").unwrap();
    assert_eq!(found[0].full_object_path, "$.list[1]");
}

#[test]
fn test_nested_lists() {
    let engine = Engine::new();
    let doc = json!({"grid": [[1, 2], [3, 4]]});
    let found = engine.find_matching_paths(&doc, "$.grid[1][0]").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].full_object_path, "$.grid[1][0]");
    assert_eq!(found[0].matched_object, json!(3));
    assert_eq!(engine.find_matching_paths(&doc, "$.grid[0:2].[1]").unwrap().len(), 2);
}

#[test]
fn test_placeholder_over_list_binds_index() {
    let engine = Engine::new();
    let doc = json!({"items": [{"v": 1}, {"v": 2}]});
    for path in ["$.items.${i}.v", "$.items[${i}].v"] {
        let found = engine.find_matching_paths(&doc, path).unwrap();
        let got: Vec<_> = found
            .iter()
            .map(|m| (m.full_object_path.as_str(), m.path_attributes.clone(), m.matched_object.clone()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("$.items[0].v", tags(&[("i", "0")]), json!(1)),
                ("$.items[1].v", tags(&[("i", "1")]), json!(2)),
            ]
        );
    }
    let mut ctx = AttributeContext::with_bindings([("i", "outer")]);
    engine.find_matching_paths_with(&doc, "$.items.${i}", &mut ctx).unwrap();
    assert_eq!(ctx.get("i"), Some("outer"));
}

#[test]
fn test_value_alternation() {
    let engine = Engine::new();
    let doc = json!({"nodes": [
        {"name": "n1", "status": "up"},
        {"name": "n2", "status": "degraded"},
        {"name": "n3", "status": "down"},
        {"name": "n4", "status": "up "},
        {"name": "n5"}
    ]});
    let found = engine
        .find_matching_paths(&doc, "$.nodes[?(@.status=up||degraded)].name")
        .unwrap();
    let names: Vec<_> = found.iter().map(|m| m.matched_object.clone()).collect();
    assert_eq!(names, vec![json!("n1"), json!("n2")]);
}

#[test]
fn test_placeholder_clause_requires_a_value() {
    let engine = Engine::new();
    let doc = json!({"nodes": [{"name": "n1", "ip": "10.0.0.1"}, {"name": "n2"}, {"name": "n3", "ip": null}]});
    let found = engine
        .find_matching_paths(&doc, "$.nodes[?(@.ip=${ip} && @.name=${name})]")
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path_attributes, tags(&[("ip", "10.0.0.1"), ("name", "n1")]));
}

#[test]
fn test_distinct_keeps_first_match_per_path() {
    let make = |path: &str, v: i64| MatchingPath {
        full_object_path: path.to_string(),
        path_attributes: BTreeMap::new(),
        matched_object: json!(v),
    };
    let out = distinct(vec![make("$.a", 1), make("$.b", 2), make("$.a", 3)]);
    assert_eq!(out, vec![make("$.a", 1), make("$.b", 2)]);
}

#[test]
fn test_filter_binding_shadows_and_restores_outer_binding() {
    let engine = Engine::new();
    let doc = json!({"groups": {"g1": [{"id": "inner"}]}});
    let mut ctx = AttributeContext::new();
    let found = engine
        .find_matching_paths_with(&doc, "$.groups.${id}[?(@.id=${id})]", &mut ctx)
        .unwrap();
    assert_eq!(found[0].path_attributes, tags(&[("id", "inner")]));
    assert!(ctx.is_empty());
}

#[test]
fn test_shared_engine_across_threads() {
    let engine = Engine::new();
    let docs: Vec<_> = (0..8)
        .map(|n| {
            let mut nodes = serde_json::Map::new();
            nodes.insert(format!("n{n}"), json!({"load": n}));
            nodes.insert("shared".to_string(), json!({"load": 100}));
            json!({"nodes": nodes})
        })
        .collect();
    std::thread::scope(|s| {
        for (n, doc) in docs.iter().enumerate() {
            let engine = &engine;
            s.spawn(move || {
                for _ in 0..50 {
                    let found = engine.find_matching_paths(doc, "$.nodes.${node}.load").unwrap();
                    assert_eq!(found.len(), 2);
                    assert_eq!(found[0].path_attributes["node"], format!("n{n}"));
                }
            });
        }
    });
    assert_eq!(engine.cache().parsed_paths(), 1);
}
