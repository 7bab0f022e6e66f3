//! Annotation sidecar document
//!
//! Presentation metadata only: positions, network-node placement, group
//! styles, free text and shapes. Fields this crate does not know are kept in
//! `extra` and written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use topo_model::Position;

/// Geographic placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinates {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
}

/// Presentation state of a topology node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAnnotation {
    /// Topology node identifier
    pub id: String,
    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Icon name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Canvas position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Geographic position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_coordinates: Option<GeoCoordinates>,
    /// Visual group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Level inside the group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Where the group label sits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_label_pos: Option<String>,
    /// Interface naming pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_pattern: Option<String>,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeAnnotation {
    /// Annotation placing a node
    #[must_use]
    pub fn at(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            position: Some(position),
            ..Self::default()
        }
    }
}

/// A host, mgmt-net, macvlan or other cloud node drawn on the canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNodeAnnotation {
    /// Network node identifier, e.g. `host:eth1`
    pub id: String,
    /// Network type
    #[serde(rename = "type")]
    pub network_type: String,
    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Canvas position
    #[serde(default)]
    pub position: Position,
    /// Geographic position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_coordinates: Option<GeoCoordinates>,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Style of a visual group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStyleAnnotation {
    /// Group identifier
    pub id: String,
    /// Style fields
    #[serde(flatten)]
    pub style: Map<String, Value>,
}

/// Free-standing text on the canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeTextAnnotation {
    /// Annotation identifier
    pub id: String,
    /// Text
    #[serde(default)]
    pub text: String,
    /// Canvas position
    #[serde(default)]
    pub position: Position,
    /// Font size in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Font color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Free-standing shape on the canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeShapeAnnotation {
    /// Annotation identifier
    pub id: String,
    /// Shape kind (rectangle, circle, line)
    #[serde(default)]
    pub shape_type: String,
    /// Canvas position
    #[serde(default)]
    pub position: Position,
    /// Width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Unrecognized fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Position update of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    /// Topology node identifier
    pub id: String,
    /// Canvas position
    pub position: Position,
}

impl NodePosition {
    /// Create a position update
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
        }
    }
}

/// Whole sidecar file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopologyAnnotations {
    /// Node positions and labels
    pub node_annotations: Vec<NodeAnnotation>,
    /// Network (cloud) nodes
    pub network_node_annotations: Vec<NetworkNodeAnnotation>,
    /// Group styles
    pub group_style_annotations: Vec<GroupStyleAnnotation>,
    /// Free text
    pub free_text_annotations: Vec<FreeTextAnnotation>,
    /// Free shapes
    pub free_shape_annotations: Vec<FreeShapeAnnotation>,
    /// Unrecognized top-level fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TopologyAnnotations {
    /// Annotation of a node
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeAnnotation> {
        self.node_annotations.iter().find(|a| a.id == id)
    }

    /// Set a node's position, creating its annotation if needed
    pub fn set_node_position(&mut self, id: &str, position: Position) {
        match self.node_annotations.iter_mut().find(|a| a.id == id) {
            Some(annotation) => annotation.position = Some(position),
            None => self.node_annotations.push(NodeAnnotation::at(id, position)),
        }
    }

    /// Re-key a node's annotations; returns whether any record matched
    pub fn rename_node(&mut self, old: &str, new: &str) -> bool {
        let mut renamed = false;
        for annotation in self.node_annotations.iter_mut().filter(|a| a.id == old) {
            annotation.id = new.to_string();
            renamed = true;
        }
        renamed
    }

    /// Drop a node's position and network-node records; returns how many
    pub fn remove_node(&mut self, id: &str) -> usize {
        let before = self.node_annotations.len() + self.network_node_annotations.len();
        self.node_annotations.retain(|a| a.id != id);
        self.network_node_annotations.retain(|a| a.id != id);
        before - self.node_annotations.len() - self.network_node_annotations.len()
    }

    /// Nothing recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_annotations.is_empty()
            && self.network_node_annotations.is_empty()
            && self.group_style_annotations.is_empty()
            && self.free_text_annotations.is_empty()
            && self.free_shape_annotations.is_empty()
            && self.extra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SIDECAR: &str = r##"{
  "nodeAnnotations": [
    { "id": "r1", "position": { "x": 10.5, "y": 20.5 }, "group": "dc1", "level": "1", "custom": true }
  ],
  "networkNodeAnnotations": [
    { "id": "host:eth1", "type": "host", "position": { "x": 0.5, "y": 0.5 } }
  ],
  "groupStyleAnnotations": [ { "id": "dc1:1", "backgroundColor": "#eee" } ],
  "freeTextAnnotations": [ { "id": "t1", "text": "core", "position": { "x": 1.5, "y": 2.5 }, "fontSize": 14.5 } ],
  "freeShapeAnnotations": [],
  "viewerSettings": { "zoom": 2 }
}"##;

    #[test]
    fn unknown_fields_survive() {
        let parsed: TopologyAnnotations = serde_json::from_str(SIDECAR).unwrap();
        assert_eq!(parsed.node("r1").unwrap().extra.get("custom"), Some(&Value::Bool(true)));
        assert!(parsed.extra.contains_key("viewerSettings"));
        assert_eq!(
            parsed.group_style_annotations[0].style.get("backgroundColor"),
            Some(&Value::from("#eee"))
        );

        let back: Value = serde_json::to_value(&parsed).unwrap();
        let original: Value = serde_json::from_str(SIDECAR).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn missing_arrays_default_empty() {
        let parsed: TopologyAnnotations = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn rename_and_remove() {
        let mut annotations: TopologyAnnotations = serde_json::from_str(SIDECAR).unwrap();
        assert!(annotations.rename_node("r1", "r9"));
        assert!(!annotations.rename_node("r1", "r9"));
        assert!(annotations.node("r9").is_some());

        assert_eq!(annotations.remove_node("host:eth1"), 1);
        assert_eq!(annotations.remove_node("r9"), 1);
        assert!(annotations.node_annotations.is_empty());
    }

    #[test]
    fn set_position_upserts() {
        let mut annotations = TopologyAnnotations::default();
        annotations.set_node_position("r1", Position::new(1.0, 2.0));
        annotations.set_node_position("r1", Position::new(3.0, 4.0));
        assert_eq!(annotations.node_annotations.len(), 1);
        assert_eq!(annotations.node("r1").unwrap().position, Some(Position::new(3.0, 4.0)));
    }
}
