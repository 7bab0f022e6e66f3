//! Node operations
//!
//! Add, edit and delete entries of `topology.nodes`. Edits write a property
//! only when it differs from what the node would inherit, and cascade
//! renames and deletes into `topology.links`.

use crate::error::{Result, TopologyError};
use crate::links::{cascade_rename, prune_links};
use crate::resolver::{deep_equal, resolve_inherited_config, PropertyMap};
use crate::types::{NodeProperty, NodeSaveData, Renamed};
use serde_yaml::Value;
use topo_yaml::{Document, Mapping, Node};
use tracing::{debug, info, warn};

const NODES_PATH: [&str; 2] = ["topology", "nodes"];

/// Nodes mapping for lookup; `Ok(None)` for an empty `nodes:` key
fn nodes_ref(document: &Document) -> Result<Option<&Mapping>> {
    match document.get_path(&NODES_PATH) {
        None => Err(TopologyError::NodesMalformed),
        Some(node) if node.is_null() => Ok(None),
        Some(node) => node
            .as_mapping()
            .map(Some)
            .ok_or(TopologyError::NodesMalformed),
    }
}

/// Nodes mapping for writing; an empty `{}` turns into a block mapping
fn nodes_mut(document: &mut Document) -> Result<&mut Mapping> {
    let nodes = document
        .ensure_mapping(&NODES_PATH)
        .map_err(|_| TopologyError::NodesMalformed)?;
    if nodes.is_flow() && nodes.is_empty() {
        *nodes = Mapping::new();
    }
    Ok(nodes)
}

/// Node identifiers in authored order
#[must_use]
pub fn node_ids(document: &Document) -> Vec<String> {
    match nodes_ref(document) {
        Ok(Some(nodes)) => nodes.keys().map(str::to_owned).collect(),
        _ => Vec::new(),
    }
}

/// Append a node entry
///
/// The identifier is `name` when set, else `id`. An absent `kind` becomes
/// `default_kind`; other properties are written only when provided.
///
/// # Errors
/// - `TopologyError::NodesMalformed` if `topology.nodes` is absent or not a mapping
/// - `TopologyError::NodeExists` if the identifier is taken
/// - `TopologyError::InvalidInput` if no identifier is given
pub fn add_node(document: &mut Document, data: &NodeSaveData, default_kind: &str) -> Result<()> {
    let id = data.target_id();
    if id.is_empty() {
        return Err(TopologyError::invalid("node identifier is empty"));
    }
    if nodes_ref(document)?.is_some_and(|nodes| nodes.contains_key(id)) {
        return Err(TopologyError::NodeExists(id.to_string()));
    }

    let mut entry = Mapping::new();
    let kind = data.properties.kind().filter(|k| !k.is_empty()).unwrap_or(default_kind);
    entry.insert(NodeProperty::Kind.key(), Node::string(kind));
    for (property, value) in data.properties.iter() {
        if property != NodeProperty::Kind {
            entry.insert(property.key(), Node::from_value(value));
        }
    }

    nodes_mut(document)?.insert(id, Node::Mapping(entry));
    info!(node = %id, kind = %kind, "node added");
    Ok(())
}

/// Planned change of one property
enum Change {
    Set(NodeProperty, Value),
    Remove(NodeProperty),
}

/// Property changes that bring `current` to `data`, omitting inherited values
fn plan_changes(current: Option<&Mapping>, data: &NodeSaveData, inherited: &PropertyMap) -> Vec<Change> {
    let mut changes = Vec::new();
    for &property in NodeProperty::ALL {
        let existing = current.and_then(|m| m.get(property.key())).map(Node::to_value);
        let wanted = data
            .properties
            .get(property)
            .filter(|value| !inherited.get(property.key()).is_some_and(|i| deep_equal(i, value)));
        match (existing, wanted) {
            (Some(_), None) => changes.push(Change::Remove(property)),
            (Some(existing), Some(wanted)) if deep_equal(&existing, wanted) => {}
            (_, Some(wanted)) => changes.push(Change::Set(property, wanted.clone())),
            (None, None) => {}
        }
    }
    changes
}

/// Edit a node located by its current identifier
///
/// Each whitelisted property that is absent from `data`, or equal to the
/// inherited value, loses its node-level override; others are written.
/// Keys outside the whitelist are left alone. When `data.name` differs from
/// `data.id` the entry moves to the new key, at the end of the mapping, and
/// every link endpoint on the old identifier follows.
///
/// A missing entry is created under the desired name unless `strict` is set.
///
/// # Errors
/// - `TopologyError::NodesMalformed` if `topology.nodes` is absent or not a mapping
/// - `TopologyError::NodeExists` if the desired name belongs to another node
/// - `TopologyError::NodeNotFound` if `strict` and the node is missing
pub fn edit_node(document: &mut Document, data: &NodeSaveData, strict: bool) -> Result<Option<Renamed>> {
    let original = data.id.as_str();
    let desired = data.target_id();
    if desired.is_empty() {
        return Err(TopologyError::invalid("node identifier is empty"));
    }

    let nodes = nodes_ref(document)?;
    let current = nodes.and_then(|m| m.get(original));
    if current.is_none() && strict {
        return Err(TopologyError::NodeNotFound(original.to_string()));
    }
    if desired != original && nodes.is_some_and(|m| m.contains_key(desired)) {
        return Err(TopologyError::NodeExists(desired.to_string()));
    }

    let group = data.properties.group();
    let kind = data.properties.kind().map(str::to_owned).or_else(|| {
        resolve_inherited_config(document, group, None)
            .get(NodeProperty::Kind.key())
            .and_then(Value::as_str)
            .map(str::to_owned)
    });
    let inherited = resolve_inherited_config(document, group, kind.as_deref());
    let exists = current.is_some();
    let changes = plan_changes(current.and_then(Node::as_mapping), data, &inherited);
    let reshape = current.is_some_and(|n| n.as_mapping().is_none());
    if exists && desired == original && changes.is_empty() && !reshape {
        debug!(node = %original, "node properties unchanged");
        return Ok(None);
    }

    let nodes = nodes_mut(document)?;
    let key = if exists {
        original
    } else {
        warn!(node = %original, created = %desired, "node to edit not found, creating it");
        nodes.insert(desired, Node::mapping());
        desired
    };

    if !changes.is_empty() || reshape {
        if let Some(entry) = nodes.get_mut(key) {
            if entry.as_mapping().is_none() {
                *entry = Node::mapping();
            }
            if let Some(entry) = entry.as_mapping_mut() {
                for change in changes {
                    match change {
                        Change::Set(property, value) => {
                            entry.insert(property.key(), Node::from_value(&value));
                        }
                        Change::Remove(property) => {
                            entry.remove(property.key());
                        }
                    }
                }
            }
        }
    }

    if !exists || desired == original {
        return Ok(None);
    }
    nodes.rename(original, desired);
    let links = cascade_rename(document, original, desired);
    info!(old = %original, new = %desired, links, "node renamed");
    Ok(Some(Renamed {
        old_id: original.to_string(),
        new_id: desired.to_string(),
    }))
}

/// Remove a node and every link that references it; returns links removed
///
/// # Errors
/// - `TopologyError::NodesMalformed` if `topology.nodes` is absent or not a mapping
/// - `TopologyError::NodeNotFound` if the node does not exist
pub fn delete_node(document: &mut Document, id: &str) -> Result<usize> {
    if !nodes_ref(document)?.is_some_and(|nodes| nodes.contains_key(id)) {
        return Err(TopologyError::NodeNotFound(id.to_string()));
    }
    nodes_mut(document)?.remove(id);
    let links = prune_links(document, id);
    info!(node = %id, links, "node deleted");
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_KIND;
    use pretty_assertions::assert_eq;

    const LAB: &str = "\
name: lab
topology:
  defaults:
    kind: nokia_srlinux
  kinds:
    nokia_srlinux:
      image: ghcr.io/nokia/srlinux:latest
  nodes:
    r1:
      kind: nokia_srlinux
      image: custom:1   # pinned
      x-extra: keep
    r2: {kind: linux}
  links:
    - endpoints: [\"r1:e1\", \"r2:e1\"]
";

    fn doc() -> Document {
        Document::parse(LAB).unwrap()
    }

    #[test]
    fn add_defaults_kind_and_appends() {
        let mut doc = doc();
        add_node(&mut doc, &NodeSaveData::new("r3"), DEFAULT_KIND).unwrap();
        assert!(doc
            .serialize()
            .contains("    r2: {kind: linux}\n    r3:\n      kind: nokia_srlinux\n  links:\n"));
        assert_eq!(node_ids(&doc), ["r1", "r2", "r3"]);
    }

    #[test]
    fn add_prefers_name_and_writes_given_properties() {
        let mut doc = doc();
        let data = NodeSaveData::new("ignored")
            .with_name("h1")
            .with_property(NodeProperty::Kind, "linux")
            .with_property(NodeProperty::Image, "alpine:3");
        add_node(&mut doc, &data, DEFAULT_KIND).unwrap();
        let h1 = doc.get_path(&["topology", "nodes", "h1"]).unwrap().to_value();
        assert_eq!(h1, serde_yaml::from_str::<Value>("{kind: linux, image: 'alpine:3'}").unwrap());
    }

    #[test]
    fn add_duplicate_fails_without_touching_the_tree() {
        let mut doc = doc();
        let err = add_node(&mut doc, &NodeSaveData::new("r1"), DEFAULT_KIND).unwrap_err();
        assert_eq!(err, TopologyError::NodeExists("r1".into()));
        assert_eq!(doc.serialize(), LAB);
    }

    #[test]
    fn add_needs_nodes_mapping() {
        let mut missing = Document::parse("name: x\n").unwrap();
        assert_eq!(
            add_node(&mut missing, &NodeSaveData::new("a"), DEFAULT_KIND).unwrap_err(),
            TopologyError::NodesMalformed
        );
        let mut list = Document::parse("topology:\n  nodes: [a]\n").unwrap();
        assert!(add_node(&mut list, &NodeSaveData::new("b"), DEFAULT_KIND).is_err());

        let mut empty = Document::parse("topology:\n  nodes:\n").unwrap();
        add_node(&mut empty, &NodeSaveData::new("a"), DEFAULT_KIND).unwrap();
        assert_eq!(empty.serialize(), "topology:\n  nodes:\n    a:\n      kind: nokia_srlinux\n");
    }

    #[test]
    fn edit_drops_inherited_and_absent_overrides() {
        let mut doc = doc();
        let data = NodeSaveData::new("r1")
            .with_property(NodeProperty::Kind, "nokia_srlinux")
            .with_property(NodeProperty::Image, "ghcr.io/nokia/srlinux:latest");
        assert_eq!(edit_node(&mut doc, &data, false).unwrap(), None);
        let out = doc.serialize();
        assert!(out.contains("  nodes:\n    r1:\n      x-extra: keep\n    r2: {kind: linux}\n"));
    }

    #[test]
    fn edit_writes_only_changed_values() {
        let mut doc = doc();
        let data = NodeSaveData::new("r1")
            .with_property(NodeProperty::Kind, "nokia_srlinux")
            .with_property(NodeProperty::Image, "custom:2");
        edit_node(&mut doc, &data, false).unwrap();
        assert!(doc.serialize().contains("      image: custom:2   # pinned\n"));
    }

    #[test]
    fn edit_with_same_state_keeps_bytes() {
        let mut doc = doc();
        let data = NodeSaveData::new("r2").with_property(NodeProperty::Kind, "linux");
        edit_node(&mut doc, &data, false).unwrap();
        assert_eq!(doc.serialize(), LAB);
    }

    #[test]
    fn rename_moves_entry_and_cascades() {
        let mut doc = doc();
        let data = NodeSaveData::new("r2")
            .with_name("leaf")
            .with_property(NodeProperty::Kind, "linux");
        let renamed = edit_node(&mut doc, &data, false).unwrap().unwrap();
        assert_eq!(renamed.old_id, "r2");
        assert_eq!(renamed.new_id, "leaf");
        assert_eq!(node_ids(&doc), ["r1", "leaf"]);
        assert!(doc.serialize().contains("- endpoints: [\"r1:e1\", \"leaf:e1\"]\n"));
    }

    #[test]
    fn rename_onto_existing_node_fails() {
        let mut doc = doc();
        let data = NodeSaveData::new("r2").with_name("r1");
        assert_eq!(
            edit_node(&mut doc, &data, false).unwrap_err(),
            TopologyError::NodeExists("r1".into())
        );
        assert_eq!(doc.serialize(), LAB);
    }

    #[test]
    fn edit_missing_node_is_lenient_unless_strict() {
        let mut strict = doc();
        let data = NodeSaveData::new("ghost").with_property(NodeProperty::Kind, "linux");
        assert!(edit_node(&mut strict, &data, true).unwrap_err().is_not_found());

        let mut lenient = doc();
        assert_eq!(edit_node(&mut lenient, &data, false).unwrap(), None);
        assert!(node_ids(&lenient).contains(&"ghost".to_string()));
    }

    #[test]
    fn delete_removes_node_and_links() {
        let mut doc = doc();
        assert_eq!(delete_node(&mut doc, "r1").unwrap(), 1);
        assert_eq!(node_ids(&doc), ["r2"]);
        assert!(!doc.serialize().contains("r1"));
        assert!(delete_node(&mut doc, "r1").unwrap_err().is_not_found());
    }
}
