// Per-call record of which payload paths a parse touched.
// A path is "visited" when a lookup walked through it and "consumed" when a
// field took the value found there. A consumed node with no visited children
// counts as fully parsed; every other node is checked child by child.
use crate::access;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashSet;

pub(crate) type Origin = Vec<String>;

#[derive(Debug, Default)]
pub(crate) struct AccessLog {
    visited: RefCell<HashSet<Origin>>,
    consumed: RefCell<HashSet<Origin>>,
}

impl AccessLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a lookup of `path` in `data`, which sits at `base` in the payload.
    /// Returns the origin of the resolved value, if any.
    pub(crate) fn record(&self, base: &[String], data: &Value, path: &[String]) -> Option<Origin> {
        let depth = access::resolved_depth(data, path);
        let mut visited = self.visited.borrow_mut();
        let mut cur: Origin = Vec::with_capacity(base.len() + depth);
        for seg in base.iter().chain(&path[..depth]) {
            cur.push(seg.clone());
            if !visited.contains(&cur) {
                visited.insert(cur.clone());
            }
        }
        access::get_value(data, path)?;
        self.consumed.borrow_mut().insert(cur.clone());
        Some(cur)
    }

    /// Portion of `root` that no lookup consumed, mirroring its shape.
    /// Array elements are keyed by their index.
    pub(crate) fn unparsed(&self, root: &Value) -> Option<Value> {
        let visited = self.visited.borrow();
        let consumed = self.consumed.borrow();
        let mut path = Vec::new();
        collect(root, &mut path, &visited, &consumed)
    }
}

fn collect(
    node: &Value,
    path: &mut Origin,
    visited: &HashSet<Origin>,
    consumed: &HashSet<Origin>,
) -> Option<Value> {
    let children: Vec<(String, &Value)> = match node {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
        _ => Vec::new(),
    };
    let any_child_visited = children.iter().any(|(key, _)| {
        path.push(key.clone());
        let hit = visited.contains(path);
        path.pop();
        hit
    });
    if !any_child_visited && consumed.contains(path) {
        return None;
    }
    if children.is_empty() {
        // Untouched leaf, or an empty container that was never consumed.
        return match node {
            Value::Object(_) | Value::Array(_) => None,
            _ => Some(node.clone()),
        };
    }

    let mut out = Map::new();
    for (key, child) in children {
        path.push(key.clone());
        let missing = if visited.contains(path) {
            collect(child, path, visited, consumed)
        } else {
            Some(child.clone())
        };
        path.pop();
        if let Some(v) = missing {
            out.insert(key, v);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(segs: &[&str]) -> Vec<String> {
        segs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reports_unread_sibling() {
        let data = json!({ "ok": true, "fail": false });
        let log = AccessLog::new();
        log.record(&[], &data, &path(&["ok"]));
        assert_eq!(log.unparsed(&data), Some(json!({ "fail": false })));
    }

    #[test]
    fn consumed_subtree_is_covered() {
        let data = json!({ "page": { "title": "x", "id": 1 } });
        let log = AccessLog::new();
        log.record(&[], &data, &path(&["page"]));
        assert_eq!(log.unparsed(&data), None);
    }

    #[test]
    fn missing_lookup_does_not_cover_parent() {
        let data = json!({ "a": { "c": 1 } });
        let log = AccessLog::new();
        assert_eq!(log.record(&[], &data, &path(&["a", "b"])), None);
        assert_eq!(log.unparsed(&data), Some(json!({ "a": { "c": 1 } })));
    }

    #[test]
    fn nested_reads_narrow_the_report() {
        let data = json!({ "result": [{ "id": "1", "x": 1 }, { "id": "2" }] });
        let log = AccessLog::new();
        let origin = log.record(&[], &data, &path(&["result"])).unwrap();
        for (i, item) in data["result"].as_array().unwrap().iter().enumerate() {
            let mut base = origin.clone();
            base.push(i.to_string());
            log.record(&base, item, &path(&["id"]));
        }
        assert_eq!(
            log.unparsed(&data),
            Some(json!({ "result": { "0": { "x": 1 } } }))
        );
    }

    #[test]
    fn text_node_origin_stops_at_string() {
        let data = json!({ "title": "hello" });
        let log = AccessLog::new();
        let origin = log.record(&[], &data, &path(&["title", "#text"]));
        assert_eq!(origin, Some(path(&["title"])));
        assert_eq!(log.unparsed(&data), None);
    }
}
