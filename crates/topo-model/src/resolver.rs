//! Inheritance resolver
//!
//! Effective node configuration is `defaults`, then `kinds[kind]`, then
//! `groups[group]`, each layer overwriting keys of the previous one, with the
//! node's own properties on top.

use serde_yaml::Value;
use std::collections::BTreeMap;
use topo_yaml::{Document, Node};

/// Resolved property map, keyed by YAML property name
pub type PropertyMap = BTreeMap<String, Value>;

/// Merge `defaults`, `kinds[kind]` and `groups[group]` of a topology document
///
/// Missing layers are skipped. Merging is a shallow overwrite by key.
#[must_use]
pub fn resolve_inherited_config(
    document: &Document,
    group: Option<&str>,
    kind: Option<&str>,
) -> PropertyMap {
    let mut resolved = PropertyMap::new();
    merge_layer(&mut resolved, document.get_path(&["topology", "defaults"]));
    if let Some(kind) = kind {
        merge_layer(&mut resolved, document.get_path(&["topology", "kinds", kind]));
    }
    if let Some(group) = group {
        merge_layer(&mut resolved, document.get_path(&["topology", "groups", group]));
    }
    resolved
}

/// Inherited merge overlaid with the node's own properties
///
/// The kind layer is chosen by the node's own `kind`, falling back to the one
/// the `defaults` and group layers provide. `None` if the node does not exist.
#[must_use]
pub fn effective_node_config(document: &Document, id: &str) -> Option<PropertyMap> {
    let node = document.get_path(&["topology", "nodes", id])?;
    let own = node.as_mapping();
    let own_str = |key: &str| own.and_then(|m| m.get(key)).and_then(Node::as_str);

    let group = own_str("group");
    let kind = own_str("kind").map(str::to_owned).or_else(|| {
        resolve_inherited_config(document, group, None)
            .get("kind")
            .and_then(Value::as_str)
            .map(str::to_owned)
    });

    let mut resolved = resolve_inherited_config(document, group, kind.as_deref());
    merge_layer(&mut resolved, Some(node));
    Some(resolved)
}

fn merge_layer(into: &mut PropertyMap, layer: Option<&Node>) {
    let Some(map) = layer.and_then(Node::as_mapping) else {
        return;
    };
    for (key, value) in map.iter() {
        into.insert(key.to_string(), value.to_value());
    }
}

/// Structural equality that ignores mapping key order
///
/// Sequences compare element-wise, mappings by key set and per-key value,
/// numbers by numeric value (`1` equals `1.0`).
#[must_use]
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Mapping(x), Value::Mapping(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| deep_equal(value, other)))
        }
        (Value::Sequence(x), Value::Sequence(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(l), Some(r)) => (l - r).abs() < f64::EPSILON || x == y,
            _ => x == y,
        },
        (Value::Tagged(x), Value::Tagged(y)) => x.tag == y.tag && deep_equal(&x.value, &y.value),
        _ => a == b,
    }
}
