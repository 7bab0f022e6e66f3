//! Typed inputs and results of topology edits
//!
//! - Node property whitelist and property bag
//! - Node save data and canvas position
//! - Uniform `SaveResult` returned by every mutating call

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping as ValueMapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind written for a new node that names none
pub const DEFAULT_KIND: &str = "nokia_srlinux";

macro_rules! node_properties {
    ($($variant:ident => $key:literal),+ $(,)?) => {
        /// Recognized node property keys, in the order they are written
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum NodeProperty {
            $(
                #[doc = concat!("`", $key, "`")]
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl NodeProperty {
            /// Every whitelisted property
            pub const ALL: &'static [NodeProperty] = &[$(NodeProperty::$variant),+];

            /// YAML key of this property
            #[inline]
            #[must_use]
            pub fn key(self) -> &'static str {
                match self {
                    $(NodeProperty::$variant => $key),+
                }
            }

            /// Property for a YAML key, if whitelisted
            #[must_use]
            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $($key => Some(NodeProperty::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

node_properties! {
    Kind => "kind",
    Type => "type",
    Image => "image",
    Group => "group",
    License => "license",
    StartupConfig => "startup-config",
    EnforceStartupConfig => "enforce-startup-config",
    SuppressStartupConfig => "suppress-startup-config",
    StartupDelay => "startup-delay",
    AutoRemove => "auto-remove",
    RestartPolicy => "restart-policy",
    ImagePullPolicy => "image-pull-policy",
    Runtime => "runtime",
    User => "user",
    Entrypoint => "entrypoint",
    Cmd => "cmd",
    Exec => "exec",
    Binds => "binds",
    Env => "env",
    EnvFiles => "env-files",
    Labels => "labels",
    Ports => "ports",
    Dns => "dns",
    Aliases => "aliases",
    Memory => "memory",
    Cpu => "cpu",
    CpuSet => "cpu-set",
    ShmSize => "shm-size",
    CapAdd => "cap-add",
    Sysctls => "sysctls",
    Devices => "devices",
    MgmtIpv4 => "mgmt-ipv4",
    MgmtIpv6 => "mgmt-ipv6",
    NetworkMode => "network-mode",
    Healthcheck => "healthcheck",
    Certificate => "certificate",
    Stages => "stages",
    Components => "components",
}

impl fmt::Display for NodeProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for NodeProperty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("unknown node property: {s}"))
    }
}

/// Whitelisted property bag of a node
///
/// A null value is the same as an absent one: the property inherits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeProperties(BTreeMap<NodeProperty, Value>);

impl NodeProperties {
    /// Empty bag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a property set
    #[must_use]
    pub fn with(mut self, property: NodeProperty, value: impl Into<Value>) -> Self {
        self.set(property, value);
        self
    }

    /// Set a property; null removes it
    pub fn set(&mut self, property: NodeProperty, value: impl Into<Value>) {
        let value = value.into();
        if value.is_null() {
            self.0.remove(&property);
        } else {
            self.0.insert(property, value);
        }
    }

    /// Value of a property
    #[inline]
    #[must_use]
    pub fn get(&self, property: NodeProperty) -> Option<&Value> {
        self.0.get(&property)
    }

    /// Remove a property
    pub fn remove(&mut self, property: NodeProperty) -> Option<Value> {
        self.0.remove(&property)
    }

    /// String value of a property
    #[must_use]
    pub fn get_str(&self, property: NodeProperty) -> Option<&str> {
        self.get(property).and_then(Value::as_str)
    }

    /// `kind`, if set
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.get_str(NodeProperty::Kind)
    }

    /// `group`, if set
    #[inline]
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.get_str(NodeProperty::Group)
    }

    /// Properties in write order
    pub fn iter(&self) -> impl Iterator<Item = (NodeProperty, &Value)> {
        self.0.iter().map(|(p, v)| (*p, v))
    }

    /// Number of set properties
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No property set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whitelisted properties of a YAML mapping; other keys are ignored
    #[must_use]
    pub fn from_mapping(map: &ValueMapping) -> Self {
        let mut out = Self::new();
        for (key, value) in map {
            if let Some(property) = key.as_str().and_then(NodeProperty::from_key) {
                out.set(property, value.clone());
            }
        }
        out
    }
}

impl FromIterator<(NodeProperty, Value)> for NodeProperties {
    fn from_iter<I: IntoIterator<Item = (NodeProperty, Value)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (property, value) in iter {
            out.set(property, value);
        }
        out
    }
}

/// Canvas coordinates of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Position {
    /// Create a position
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Input of node add and edit
///
/// `id` is the identifier the node currently has; `name` is the identifier
/// it should have. For an add either one may carry the identifier, `name`
/// winning when both are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSaveData {
    /// Current identifier
    pub id: String,
    /// Desired identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whitelisted properties; absent ones inherit
    #[serde(default)]
    pub properties: NodeProperties,
    /// Placement forwarded to the annotation sidecar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl NodeSaveData {
    /// Node data for an identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// With a desired identifier
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With a property
    #[inline]
    #[must_use]
    pub fn with_property(mut self, property: NodeProperty, value: impl Into<Value>) -> Self {
        self.properties.set(property, value);
        self
    }

    /// With a placement
    #[inline]
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Identifier the node ends up with: `name` if non-empty, else `id`
    #[must_use]
    pub fn target_id(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }
}

/// A node identifier change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Renamed {
    /// Identifier before the edit
    pub old_id: String,
    /// Identifier after the edit
    pub new_id: String,
}

/// Outcome of every mutating call at the collaborator boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    /// Whether the operation was applied
    pub success: bool,
    /// Human-readable failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when a node edit changed the identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed: Option<Renamed>,
}

impl SaveResult {
    /// Success
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            renamed: None,
        }
    }

    /// Failure carrying a display message
    #[must_use]
    pub fn failed(err: impl fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            renamed: None,
        }
    }

    /// Success that renamed a node
    #[must_use]
    pub fn renamed(old_id: impl Into<String>, new_id: impl Into<String>) -> Self {
        Self {
            renamed: Some(Renamed {
                old_id: old_id.into(),
                new_id: new_id.into(),
            }),
            ..Self::ok()
        }
    }

    /// Whether the operation was applied
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.success
    }
}

impl<E: fmt::Display> From<Result<(), E>> for SaveResult {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(err) => Self::failed(err),
        }
    }
}

impl<E: fmt::Display> From<Result<Option<Renamed>, E>> for SaveResult {
    fn from(result: Result<Option<Renamed>, E>) -> Self {
        match result {
            Ok(Some(renamed)) => Self {
                renamed: Some(renamed),
                ..Self::ok()
            },
            Ok(None) => Self::ok(),
            Err(err) => Self::failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_keys_round_trip() {
        for property in NodeProperty::ALL {
            assert_eq!(NodeProperty::from_key(property.key()), Some(*property));
        }
        assert_eq!(NodeProperty::ALL.len(), 38);
        assert!(NodeProperty::from_key("position").is_none());
    }

    #[test]
    fn null_property_is_absent() {
        let mut props = NodeProperties::new().with(NodeProperty::Image, "alpine");
        props.set(NodeProperty::Image, Value::Null);
        assert!(props.is_empty());
    }

    #[test]
    fn write_order_starts_with_kind() {
        let props = NodeProperties::new()
            .with(NodeProperty::Image, "alpine")
            .with(NodeProperty::Kind, "linux");
        let keys: Vec<_> = props.iter().map(|(p, _)| p.key()).collect();
        assert_eq!(keys, ["kind", "image"]);
    }

    #[test]
    fn from_mapping_ignores_unknown_keys() {
        let map: ValueMapping =
            serde_yaml::from_str("kind: linux\nposition: {x: 1}\nmgmt-ipv4: 10.0.0.2\n").unwrap();
        let props = NodeProperties::from_mapping(&map);
        assert_eq!(props.kind(), Some("linux"));
        assert_eq!(props.get_str(NodeProperty::MgmtIpv4), Some("10.0.0.2"));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn target_id_prefers_name() {
        assert_eq!(NodeSaveData::new("r1").target_id(), "r1");
        assert_eq!(NodeSaveData::new("r1").with_name("r9").target_id(), "r9");
        assert_eq!(NodeSaveData::new("r1").with_name("").target_id(), "r1");
    }

    #[test]
    fn save_result_json_shape() {
        let json = serde_yaml::to_string(&SaveResult::renamed("r1", "r2")).unwrap();
        assert_eq!(json, "success: true\nrenamed:\n  oldId: r1\n  newId: r2\n");
        let failed: SaveResult = Err::<(), _>("boom").into();
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(!failed.is_ok());
    }
}
