//! Reshaping flat result rows into nested trees.

use serde_json::{Map, Value};

use crate::path::PATH_DELIMITER;

const HIERARCHY_DELIMITER: char = '_';

/// Nest a flat row on its `:`-delimited keys.
///
/// `{"foo:bar": 3, "foo:baz:qux": "x", "bar": 10}` becomes
/// `{"foo": {"bar": 3, "baz": {"qux": "x"}}, "bar": 10}`. A scalar sitting
/// where a branch is needed is replaced by the branch.
#[must_use]
pub fn make_nested(row: &Map<String, Value>) -> Map<String, Value> {
    let mut nested = Map::new();
    for (key, value) in row {
        let path: Vec<&str> = key.split(PATH_DELIMITER).collect();
        insert_path(&mut nested, &path, value.clone());
    }
    nested
}

fn insert_path(map: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            map.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = map.entry(*head).or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(branch) = entry {
                insert_path(branch, rest, value);
            }
        }
    }
}

/// Nest every row on its `_`-delimited keys.
///
/// Empty segments are ignored, so `a__b` nests like `a_b`. A leaf only replaces
/// an existing value that is empty.
#[must_use]
pub fn into_hierarchy(rows: &[Map<String, Value>]) -> Vec<Map<String, Value>> {
    rows.iter().map(explode_tree).collect()
}

fn explode_tree(row: &Map<String, Value>) -> Map<String, Value> {
    let mut tree = Map::new();
    for (key, value) in row {
        let mut segments: Vec<&str> =
            key.split(HIERARCHY_DELIMITER).filter(|segment| !segment.is_empty()).collect();
        if segments.is_empty() {
            segments.push(key);
        }
        merge_leaf(&mut tree, &segments, value);
    }
    tree
}

fn merge_leaf(map: &mut Map<String, Value>, path: &[&str], value: &Value) {
    match path {
        [] => {}
        [leaf] => {
            let current = map.entry(*leaf).or_insert(Value::Null);
            if is_empty(current) {
                *current = value.clone();
            }
        }
        [head, rest @ ..] => {
            let entry = map.entry(*head).or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(branch) = entry {
                merge_leaf(branch, rest, value);
            }
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
