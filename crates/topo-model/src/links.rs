//! Link identity, format selection and link operations
//!
//! A link is identified by the unordered pair of its endpoints. Brief links
//! (`endpoints: ["a:x", "b:y"]`) and extended links (`type:` plus endpoint
//! objects) with the same pair are the same link.

use crate::error::{Result, TopologyError};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use topo_yaml::{Document, Mapping, Node, Sequence};
use tracing::{debug, info};

const LINKS_PATH: [&str; 2] = ["topology", "links"];

/// Link types; every type but `veth` has a single endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    /// Point-to-point pair
    #[default]
    Veth,
    /// Interface in the host namespace
    Host,
    /// Interface attached to the management network
    MgmtNet,
    /// Macvlan on a host interface
    Macvlan,
    /// VXLAN tunnel to a remote VTEP
    Vxlan,
    /// VXLAN tunnel stitched through a veth
    VxlanStitch,
    /// Interface with no peer
    Dummy,
}

impl LinkType {
    /// Every link type
    pub const ALL: [LinkType; 7] = [
        Self::Veth,
        Self::Host,
        Self::MgmtNet,
        Self::Macvlan,
        Self::Vxlan,
        Self::VxlanStitch,
        Self::Dummy,
    ];

    /// Name as written in `type:`
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Veth => "veth",
            Self::Host => "host",
            Self::MgmtNet => "mgmt-net",
            Self::Macvlan => "macvlan",
            Self::Vxlan => "vxlan",
            Self::VxlanStitch => "vxlan-stitch",
            Self::Dummy => "dummy",
        }
    }

    /// Type for a `type:` value
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Second party is implicit
    #[inline]
    #[must_use]
    pub fn is_single_endpoint(self) -> bool {
        self != Self::Veth
    }

    /// Type named by the node part of a brief endpoint (`host:eth1`)
    #[must_use]
    pub fn implicit_party(node: &str) -> Option<Self> {
        match node {
            "host" => Some(Self::Host),
            "mgmt-net" => Some(Self::MgmtNet),
            "macvlan" => Some(Self::Macvlan),
            _ => None,
        }
    }

    fn uses_host_interface(self) -> bool {
        matches!(self, Self::Host | Self::MgmtNet | Self::Macvlan)
    }

    fn is_tunnel(self) -> bool {
        matches!(self, Self::Vxlan | Self::VxlanStitch)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown link type: {s}"))
    }
}

/// `node` or `node:interface`
#[must_use]
pub fn endpoint_string(node: &str, interface: &str) -> String {
    if interface.is_empty() {
        node.to_string()
    } else {
        format!("{node}:{interface}")
    }
}

/// Split a brief endpoint at its first `:`
#[must_use]
pub fn split_endpoint(endpoint: &str) -> (&str, &str) {
    endpoint.split_once(':').unwrap_or((endpoint, ""))
}

/// The endpoints a link is looked up by
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkIdentity {
    /// Link type
    #[serde(default)]
    pub link_type: LinkType,
    /// Source node
    pub source: String,
    /// Source interface
    #[serde(default)]
    pub source_interface: String,
    /// Target node, or the implicit party of a single-endpoint link
    #[serde(default)]
    pub target: String,
    /// Target interface
    #[serde(default)]
    pub target_interface: String,
}

impl LinkIdentity {
    /// Veth identity from two endpoints
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        source_interface: impl Into<String>,
        target: impl Into<String>,
        target_interface: impl Into<String>,
    ) -> Self {
        Self {
            link_type: LinkType::Veth,
            source: source.into(),
            source_interface: source_interface.into(),
            target: target.into(),
            target_interface: target_interface.into(),
        }
    }

    /// Veth identity from two brief endpoint strings
    #[must_use]
    pub fn from_endpoints(a: &str, b: &str) -> Self {
        let (source, source_interface) = split_endpoint(a);
        let (target, target_interface) = split_endpoint(b);
        Self::new(source, source_interface, target, target_interface)
    }

    /// With a link type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    /// Order-independent key: both parties rendered, sorted and joined
    ///
    /// A single-endpoint link's second party is its type name, as is a brief
    /// endpoint naming `host`, `mgmt-net` or `macvlan`.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        let (a, b) = if self.link_type.is_single_endpoint() {
            let (node, interface) = self.node_side();
            (endpoint_string(node, interface), self.link_type.as_str().to_string())
        } else {
            (
                party(&self.source, &self.source_interface),
                party(&self.target, &self.target_interface),
            )
        };
        if a <= b {
            format!("{a}|{b}")
        } else {
            format!("{b}|{a}")
        }
    }

    /// Whether either endpoint names `node`
    #[must_use]
    pub fn references(&self, node: &str) -> bool {
        self.source == node || self.target == node
    }

    /// Real node endpoint of a single-endpoint link
    fn node_side(&self) -> (&str, &str) {
        if LinkType::implicit_party(&self.source).is_some()
            && LinkType::implicit_party(&self.target).is_none()
            && !self.target.is_empty()
        {
            (&self.target, &self.target_interface)
        } else {
            (&self.source, &self.source_interface)
        }
    }

    fn implicit_interface(&self) -> Option<&str> {
        let (node, _) = self.node_side();
        let other = if node == self.source {
            (&self.target, &self.target_interface)
        } else {
            (&self.source, &self.source_interface)
        };
        (LinkType::implicit_party(other.0).is_some() && !other.1.is_empty())
            .then_some(other.1.as_str())
    }
}

impl fmt::Display for LinkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}

fn party(node: &str, interface: &str) -> String {
    match LinkType::implicit_party(node) {
        Some(t) => t.as_str().to_string(),
        None => endpoint_string(node, interface),
    }
}

/// Typed link for add, edit and read-back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkSaveData {
    /// Source node
    pub source: String,
    /// Source interface
    pub source_interface: String,
    /// Target node, or the implicit party of a single-endpoint link
    pub target: String,
    /// Target interface
    pub target_interface: String,
    /// Link type
    pub link_type: LinkType,
    /// MTU
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    /// MAC of the source endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_mac: Option<String>,
    /// MAC of the target endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_mac: Option<String>,
    /// Host-side interface of host, mgmt-net and macvlan links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_interface: Option<String>,
    /// Macvlan mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Remote VTEP address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    /// VXLAN network identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vni: Option<u32>,
    /// VXLAN destination UDP port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u16>,
    /// VXLAN source UDP port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u16>,
    /// Free-form link variables
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, Value>,
    /// Link labels
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, Value>,
    /// Identity of the link an edit replaces, when the endpoints change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<LinkIdentity>,
}

impl LinkSaveData {
    /// Veth link between two endpoints
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        source_interface: impl Into<String>,
        target: impl Into<String>,
        target_interface: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_interface: source_interface.into(),
            target: target.into(),
            target_interface: target_interface.into(),
            ..Self::default()
        }
    }

    /// Single-endpoint link of `link_type` on one node interface
    #[must_use]
    pub fn single(link_type: LinkType, node: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            target: link_type.as_str().to_string(),
            link_type,
            ..Self::new(node, interface, "", "")
        }
    }

    /// With a link type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    /// With an MTU
    #[inline]
    #[must_use]
    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// With the identity of the link being replaced
    #[inline]
    #[must_use]
    pub fn replacing(mut self, original: LinkIdentity) -> Self {
        self.original = Some(original);
        self
    }

    /// Identity of this link
    #[must_use]
    pub fn identity(&self) -> LinkIdentity {
        LinkIdentity {
            link_type: self.link_type,
            source: self.source.clone(),
            source_interface: self.source_interface.clone(),
            target: self.target.clone(),
            target_interface: self.target_interface.clone(),
        }
    }

    /// Canonical key of this link
    #[must_use]
    pub fn canonical_key(&self) -> String {
        self.identity().canonical_key()
    }

    /// Whether any non-default extended property is set
    #[must_use]
    pub fn is_extended(&self) -> bool {
        self.link_type != LinkType::Veth
            || self.mtu.is_some()
            || self.source_mac.is_some()
            || self.target_mac.is_some()
            || self.host_interface.is_some()
            || self.mode.is_some()
            || self.remote.is_some()
            || self.vni.is_some()
            || self.dst_port.is_some()
            || self.src_port.is_some()
            || !self.vars.is_empty()
            || !self.labels.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.source.is_empty() {
            return Err(TopologyError::invalid("link source is empty"));
        }
        if !self.link_type.is_single_endpoint() && self.target.is_empty() {
            return Err(TopologyError::invalid("veth link needs a target"));
        }
        Ok(())
    }

    /// YAML entry in the format this link needs
    #[must_use]
    pub fn to_node(&self) -> Node {
        if self.is_extended() {
            self.extended_node()
        } else {
            let mut map = Mapping::new();
            map.insert(
                "endpoints",
                Node::flow_sequence([
                    Node::quoted(endpoint_string(&self.source, &self.source_interface)),
                    Node::quoted(endpoint_string(&self.target, &self.target_interface)),
                ]),
            );
            Node::Mapping(map)
        }
    }

    fn extended_node(&self) -> Node {
        let link_type = self.link_type;
        let mut map = Mapping::new();
        map.insert("type", Node::string(link_type.as_str()));

        if link_type.is_single_endpoint() {
            let identity = self.identity();
            let (node, interface) = identity.node_side();
            let mac = if node == self.source {
                &self.source_mac
            } else {
                &self.target_mac
            };
            map.insert("endpoint", endpoint_object(node, interface, mac.as_deref()));
            if link_type.uses_host_interface() {
                let host_interface = self
                    .host_interface
                    .as_deref()
                    .or_else(|| identity.implicit_interface());
                if let Some(host_interface) = host_interface {
                    map.insert("host-interface", Node::string(host_interface));
                }
            }
        } else {
            let mut endpoints = Sequence::new();
            endpoints.push(endpoint_object(
                &self.source,
                &self.source_interface,
                self.source_mac.as_deref(),
            ));
            endpoints.push(endpoint_object(
                &self.target,
                &self.target_interface,
                self.target_mac.as_deref(),
            ));
            map.insert("endpoints", Node::Sequence(endpoints));
        }

        if link_type == LinkType::Macvlan {
            if let Some(mode) = &self.mode {
                map.insert("mode", Node::string(mode));
            }
        }
        if link_type.is_tunnel() {
            if let Some(remote) = &self.remote {
                map.insert("remote", Node::string(remote));
            }
            for (key, value) in [
                ("vni", self.vni),
                ("dst-port", self.dst_port.map(u32::from)),
                ("src-port", self.src_port.map(u32::from)),
            ] {
                if let Some(value) = value {
                    map.insert(key, Node::scalar(Value::from(value)));
                }
            }
        }
        if let Some(mtu) = self.mtu {
            map.insert("mtu", Node::scalar(Value::from(mtu)));
        }
        for (key, values) in [("vars", &self.vars), ("labels", &self.labels)] {
            if !values.is_empty() {
                let mapping = values
                    .iter()
                    .map(|(k, v)| (Value::String(k.clone()), v.clone()))
                    .collect();
                map.insert(key, Node::from_value(&Value::Mapping(mapping)));
            }
        }
        Node::Mapping(map)
    }

    /// Typed view of a YAML link entry; `None` if the entry is not a link
    #[must_use]
    pub fn from_node(node: &Node) -> Option<Self> {
        let map = node.as_mapping()?;
        let link_type = match map.get("type").and_then(Node::as_str) {
            Some(name) => LinkType::from_name(name)?,
            None => LinkType::Veth,
        };
        let mut link = Self {
            link_type,
            ..Self::default()
        };

        if let Some(endpoints) = map.get("endpoints").and_then(Node::as_sequence) {
            let mut parsed = endpoints.iter().filter_map(read_endpoint);
            let (source, source_interface, source_mac) = parsed.next()?;
            link.source = source;
            link.source_interface = source_interface;
            link.source_mac = source_mac;
            if let Some((target, target_interface, target_mac)) = parsed.next() {
                link.target = target;
                link.target_interface = target_interface;
                link.target_mac = target_mac;
            }
        } else {
            let (source, source_interface, source_mac) = read_endpoint(map.get("endpoint")?)?;
            link.source = source;
            link.source_interface = source_interface;
            link.source_mac = source_mac;
            link.target = link_type.as_str().to_string();
        }

        let text = |key: &str| map.get(key).and_then(Node::as_str).map(str::to_owned);
        let number = |key: &str| map.get(key).and_then(|n| n.to_value().as_u64());
        link.host_interface = text("host-interface");
        if link_type.is_single_endpoint() {
            if let Some(host_interface) = &link.host_interface {
                link.target_interface.clone_from(host_interface);
            }
        }
        link.mode = text("mode");
        link.remote = text("remote");
        link.mtu = number("mtu").and_then(|n| u32::try_from(n).ok());
        link.vni = number("vni").and_then(|n| u32::try_from(n).ok());
        link.dst_port = number("dst-port").and_then(|n| u16::try_from(n).ok());
        link.src_port = number("src-port").and_then(|n| u16::try_from(n).ok());
        link.vars = string_map(map.get("vars"));
        link.labels = string_map(map.get("labels"));
        Some(link)
    }
}

fn endpoint_object(node: &str, interface: &str, mac: Option<&str>) -> Node {
    let mut pairs = vec![("node", Node::string(node))];
    if !interface.is_empty() {
        pairs.push(("interface", Node::string(interface)));
    }
    if let Some(mac) = mac {
        pairs.push(("mac", Node::string(mac)));
    }
    Node::flow_mapping(pairs)
}

fn read_endpoint(node: &Node) -> Option<(String, String, Option<String>)> {
    if let Some(text) = node.as_str() {
        let (name, interface) = split_endpoint(text);
        return Some((name.to_string(), interface.to_string(), None));
    }
    let map = node.as_mapping()?;
    let field = |key: &str| map.get(key).and_then(Node::as_str);
    Some((
        field("node")?.to_string(),
        field("interface").unwrap_or_default().to_string(),
        field("mac").map(str::to_owned),
    ))
}

fn string_map(node: Option<&Node>) -> BTreeMap<String, Value> {
    let Some(map) = node.and_then(Node::as_mapping) else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(key, value)| (key.to_string(), value.to_value()))
        .collect()
}

/// Canonical key of a YAML link entry
#[must_use]
pub fn entry_key(node: &Node) -> Option<String> {
    LinkSaveData::from_node(node).map(|link| link.canonical_key())
}

/// Every parseable link of a topology, in authored order
#[must_use]
pub fn read_links(document: &Document) -> Vec<LinkSaveData> {
    let Some(links) = document.get_path(&LINKS_PATH).and_then(Node::as_sequence) else {
        return Vec::new();
    };
    links
        .iter()
        .filter_map(|node| {
            let link = LinkSaveData::from_node(node);
            if link.is_none() {
                debug!("skipping unrecognized link entry");
            }
            link
        })
        .collect()
}

/// Links sequence for lookup; `Ok(None)` when the document has none
fn links_ref(document: &Document) -> Result<Option<&Sequence>> {
    match document.get_path(&LINKS_PATH) {
        None => Ok(None),
        Some(node) if node.is_null() => Ok(None),
        Some(node) => node
            .as_sequence()
            .map(Some)
            .ok_or(TopologyError::LinksMalformed),
    }
}

/// Links sequence for writing; an empty `[]` turns into a block sequence
fn links_mut(document: &mut Document) -> Result<&mut Sequence> {
    let links = document
        .ensure_sequence(&LINKS_PATH)
        .map_err(|_| TopologyError::LinksMalformed)?;
    if links.is_flow() && links.is_empty() {
        *links = Sequence::new();
    }
    Ok(links)
}

fn position_of(links: &Sequence, key: &str, skip: Option<usize>) -> Option<usize> {
    links
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .find(|(_, node)| entry_key(node).as_deref() == Some(key))
        .map(|(i, _)| i)
}

/// Append a link
///
/// # Errors
/// - `TopologyError::LinksMalformed` if `topology.links` is not a sequence
/// - `TopologyError::LinkExists` on a canonical-key collision
/// - `TopologyError::InvalidInput` for a link without endpoints
pub fn add_link(document: &mut Document, link: &LinkSaveData) -> Result<()> {
    link.validate()?;
    let key = link.canonical_key();
    if let Some(links) = links_ref(document)? {
        if position_of(links, &key, None).is_some() {
            return Err(TopologyError::LinkExists(key));
        }
    }
    links_mut(document)?.push(link.to_node());
    info!(link = %key, extended = link.is_extended(), "link added");
    Ok(())
}

/// Replace a whole link entry
///
/// The entry is located by `link.original` when set, else by the link's own
/// key. Its comments stay; its body is rebuilt in the format the new data
/// needs.
///
/// # Errors
/// - `TopologyError::LinkNotFound` if no entry has the original key
/// - `TopologyError::LinkExists` if the new key belongs to another entry
pub fn edit_link(document: &mut Document, link: &LinkSaveData) -> Result<()> {
    link.validate()?;
    let key = link.canonical_key();
    let original = link
        .original
        .as_ref()
        .map_or_else(|| key.clone(), LinkIdentity::canonical_key);

    let links = links_ref(document)?.ok_or_else(|| TopologyError::LinkNotFound(original.clone()))?;
    let index =
        position_of(links, &original, None).ok_or_else(|| TopologyError::LinkNotFound(original.clone()))?;
    if key != original && position_of(links, &key, Some(index)).is_some() {
        return Err(TopologyError::LinkExists(key));
    }

    let fresh = link.to_node();
    if links.get(index).is_some_and(|current| current.to_value() == fresh.to_value()) {
        debug!(link = %key, "link unchanged");
        return Ok(());
    }
    links_mut(document)?.replace(index, fresh);
    info!(link = %key, replaced = %original, "link edited");
    Ok(())
}

/// Remove every entry with the identity's canonical key; returns how many
///
/// # Errors
/// `TopologyError::LinkNotFound` if nothing matched
pub fn delete_link(document: &mut Document, identity: &LinkIdentity) -> Result<usize> {
    let key = identity.canonical_key();
    let found = links_ref(document)?.is_some_and(|links| position_of(links, &key, None).is_some());
    if !found {
        return Err(TopologyError::LinkNotFound(key));
    }
    let removed = links_mut(document)?.retain(|node| entry_key(node).as_deref() != Some(key.as_str()));
    info!(link = %key, removed, "link deleted");
    Ok(removed)
}

/// Endpoint string or object names `node`
fn endpoint_refers(endpoint: &Node, node: &str) -> bool {
    if let Some(text) = endpoint.as_str() {
        return split_endpoint(text).0 == node;
    }
    endpoint.get("node").and_then(Node::as_str) == Some(node)
}

/// Link entry has an endpoint on `node`
pub(crate) fn entry_references(entry: &Node, node: &str) -> bool {
    let endpoints = entry
        .get("endpoints")
        .and_then(Node::as_sequence)
        .is_some_and(|seq| seq.iter().any(|e| endpoint_refers(e, node)));
    endpoints || entry.get("endpoint").is_some_and(|e| endpoint_refers(e, node))
}

fn rename_endpoint(endpoint: &mut Node, old: &str, new: &str) {
    let renamed = endpoint.as_str().and_then(|text| {
        let (name, interface) = split_endpoint(text);
        (name == old).then(|| endpoint_string(new, interface))
    });
    if let Some(renamed) = renamed {
        *endpoint = Node::quoted(renamed);
    } else if let Some(map) = endpoint.as_mapping_mut() {
        if map.get("node").and_then(Node::as_str) == Some(old) {
            map.insert("node", Node::string(new));
        }
    }
}

fn rename_in_entry(entry: &mut Node, old: &str, new: &str) {
    let Some(map) = entry.as_mapping_mut() else {
        return;
    };
    let hits: Vec<usize> = map
        .get("endpoints")
        .and_then(Node::as_sequence)
        .map(|seq| {
            seq.iter()
                .enumerate()
                .filter(|(_, e)| endpoint_refers(e, old))
                .map(|(i, _)| i)
                .collect()
        })
        .unwrap_or_default();
    if !hits.is_empty() {
        if let Some(seq) = map.get_mut("endpoints").and_then(Node::as_sequence_mut) {
            for i in hits {
                if let Some(endpoint) = seq.get_mut(i) {
                    rename_endpoint(endpoint, old, new);
                }
            }
        }
    }
    if map.get("endpoint").is_some_and(|e| endpoint_refers(e, old)) {
        if let Some(endpoint) = map.get_mut("endpoint") {
            rename_endpoint(endpoint, old, new);
        }
    }
}

/// Rewrite endpoints on `old` to `new`, keeping interface suffixes; returns links touched
pub(crate) fn cascade_rename(document: &mut Document, old: &str, new: &str) -> usize {
    let hits: Vec<usize> = match links_ref(document) {
        Ok(Some(links)) => links
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry_references(entry, old))
            .map(|(i, _)| i)
            .collect(),
        _ => return 0,
    };
    if hits.is_empty() {
        return 0;
    }
    let Ok(links) = links_mut(document) else {
        return 0;
    };
    for &i in &hits {
        if let Some(entry) = links.get_mut(i) {
            rename_in_entry(entry, old, new);
        }
    }
    hits.len()
}

/// Remove every link with an endpoint on `node`; returns how many
pub(crate) fn prune_links(document: &mut Document, node: &str) -> usize {
    let any = matches!(
        links_ref(document),
        Ok(Some(links)) if links.iter().any(|entry| entry_references(entry, node))
    );
    if !any {
        return 0;
    }
    links_mut(document).map_or(0, |links| links.retain(|entry| !entry_references(entry, node)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LINKS: &str = "\
topology:
  nodes:
    r1: {}
    r2: {}
  links:
    # core
    - endpoints: [\"r1:e1-1\", \"r2:e1-1\"]
    - endpoints: [\"r1:e1-2\", \"host:veth-r1\"]
    - type: vxlan
      endpoint: {node: r2, interface: e1-3}
      remote: 10.0.0.1
      vni: 100
";

    fn doc() -> Document {
        Document::parse(LINKS).unwrap()
    }

    #[test]
    fn canonical_key_ignores_order() {
        let ab = LinkIdentity::from_endpoints("r1:e1", "r2:e1");
        let ba = LinkIdentity::from_endpoints("r2:e1", "r1:e1");
        assert_eq!(ab.canonical_key(), ba.canonical_key());
        assert_eq!(ab.canonical_key(), "r1:e1|r2:e1");
    }

    #[test]
    fn single_endpoint_key_uses_type_name() {
        let host = LinkSaveData::single(LinkType::Host, "r1", "e1");
        let brief = LinkIdentity::from_endpoints("r1:e1", "host:eth9");
        let macvlan = LinkSaveData::single(LinkType::Macvlan, "r1", "e1");
        assert_eq!(host.canonical_key(), brief.canonical_key());
        assert_ne!(host.canonical_key(), macvlan.canonical_key());
    }

    #[test]
    fn brief_form_when_nothing_extended() {
        let node = LinkSaveData::new("r1", "e1", "r2", "e1").to_node();
        let mut doc = Document::new();
        doc.ensure_sequence(&["links"]).unwrap().push(node);
        assert_eq!(doc.serialize(), "links:\n  - endpoints: [\"r1:e1\", \"r2:e1\"]\n");
    }

    #[test]
    fn extended_veth_with_macs_and_mtu() {
        let mut link = LinkSaveData::new("r1", "e1", "r2", "e1").with_mtu(9000);
        link.source_mac = Some("02:00:00:00:00:01".into());
        let mut doc = Document::new();
        doc.ensure_sequence(&["links"]).unwrap().push(link.to_node());
        assert_eq!(
            doc.serialize(),
            "links:\n  - type: veth\n    endpoints:\n      - { node: r1, interface: e1, mac: \"02:00:00:00:00:01\" }\n      - { node: r2, interface: e1 }\n    mtu: 9000\n"
        );
    }

    #[test]
    fn extended_single_endpoint_fields() {
        let mut link = LinkSaveData::single(LinkType::Macvlan, "r1", "e1-5");
        link.host_interface = Some("enp0s3".into());
        link.mode = Some("bridge".into());
        link.remote = Some("ignored".into());
        let value = link.to_node().to_value();
        let expected: Value = serde_yaml::from_str(
            "{type: macvlan, endpoint: {node: r1, interface: e1-5}, host-interface: enp0s3, mode: bridge}",
        )
        .unwrap();
        assert_eq!(value, expected);
    }

    #[test]
    fn host_interface_falls_back_to_brief_party() {
        let link = LinkSaveData::new("r1", "e1", "host", "veth9").with_type(LinkType::Host);
        assert_eq!(
            link.to_node().get("host-interface").and_then(Node::as_str),
            Some("veth9")
        );
    }

    #[test]
    fn read_back_parses_both_forms() {
        let links = read_links(&doc());
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].identity(), LinkIdentity::from_endpoints("r1:e1-1", "r2:e1-1"));
        assert!(!links[0].is_extended());
        assert_eq!(links[2].link_type, LinkType::Vxlan);
        assert_eq!(links[2].vni, Some(100));
        assert_eq!(links[2].remote.as_deref(), Some("10.0.0.1"));
        assert_eq!(links[2].canonical_key(), "r2:e1-3|vxlan");
    }

    #[test]
    fn duplicate_link_rejected_in_either_order() {
        let mut doc = doc();
        let err = add_link(&mut doc, &LinkSaveData::new("r2", "e1-1", "r1", "e1-1")).unwrap_err();
        assert_eq!(err, TopologyError::LinkExists("r1:e1-1|r2:e1-1".into()));
        assert_eq!(doc.serialize(), LINKS);
    }

    #[test]
    fn host_link_collides_with_brief_host_endpoint() {
        let mut doc = doc();
        let err = add_link(&mut doc, &LinkSaveData::single(LinkType::Host, "r1", "e1-2")).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn add_creates_links_sequence() {
        let mut doc = Document::parse("topology:\n  nodes:\n    a: {}\n").unwrap();
        add_link(&mut doc, &LinkSaveData::new("a", "e1", "b", "e1")).unwrap();
        assert_eq!(
            doc.serialize(),
            "topology:\n  nodes:\n    a: {}\n  links:\n    - endpoints: [\"a:e1\", \"b:e1\"]\n"
        );
    }

    #[test]
    fn malformed_links_container() {
        let mut doc = Document::parse("topology:\n  links: {a: 1}\n").unwrap();
        let err = add_link(&mut doc, &LinkSaveData::new("a", "e1", "b", "e1")).unwrap_err();
        assert_eq!(err, TopologyError::LinksMalformed);
    }

    #[test]
    fn edit_replaces_whole_entry_and_keeps_comment() {
        let mut doc = doc();
        let link = LinkSaveData::new("r1", "e1-1", "r2", "e1-1").with_mtu(1500);
        edit_link(&mut doc, &link).unwrap();
        let out = doc.serialize();
        assert!(out.contains(
            "    # core\n    - type: veth\n      endpoints:\n        - { node: r1, interface: e1-1 }\n        - { node: r2, interface: e1-1 }\n      mtu: 1500\n"
        ));
        assert!(out.ends_with("    - endpoints: [\"r1:e1-2\", \"host:veth-r1\"]\n    - type: vxlan\n      endpoint: {node: r2, interface: e1-3}\n      remote: 10.0.0.1\n      vni: 100\n"));
    }

    #[test]
    fn edit_type_change_drops_stale_fields() {
        let mut doc = doc();
        let link = LinkSaveData::single(LinkType::Dummy, "r2", "e1-3")
            .replacing(LinkIdentity::new("r2", "e1-3", "vxlan", "").with_type(LinkType::Vxlan));
        edit_link(&mut doc, &link).unwrap();
        let links = read_links(&doc);
        assert_eq!(links[2].link_type, LinkType::Dummy);
        assert_eq!(links[2].remote, None);
        assert_eq!(links[2].vni, None);
    }

    #[test]
    fn edit_missing_link_fails() {
        let mut doc = doc();
        let err = edit_link(&mut doc, &LinkSaveData::new("r9", "e1", "r2", "e1")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn edit_onto_existing_key_fails() {
        let mut doc = doc();
        let link = LinkSaveData::new("r1", "e1-2", "host", "veth-r1")
            .replacing(LinkIdentity::from_endpoints("r1:e1-1", "r2:e1-1"));
        assert!(edit_link(&mut doc, &link).unwrap_err().is_conflict());
    }

    #[test]
    fn unchanged_edit_keeps_bytes() {
        let mut doc = doc();
        edit_link(&mut doc, &LinkSaveData::new("r1", "e1-1", "r2", "e1-1")).unwrap();
        assert_eq!(doc.serialize(), LINKS);
    }

    #[test]
    fn delete_by_key() {
        let mut doc = doc();
        let removed = delete_link(&mut doc, &LinkIdentity::from_endpoints("r2:e1-1", "r1:e1-1")).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(read_links(&doc).len(), 2);
        assert!(delete_link(&mut doc, &LinkIdentity::from_endpoints("r2:e1-1", "r1:e1-1"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn rename_cascade_keeps_interfaces() {
        let mut doc = doc();
        assert_eq!(cascade_rename(&mut doc, "r2", "leaf2"), 2);
        let out = doc.serialize();
        assert!(out.contains("    - endpoints: [\"r1:e1-1\", \"leaf2:e1-1\"]\n"));
        assert!(out.contains("      endpoint: { node: leaf2, interface: e1-3 }\n"));
        assert!(out.contains("    - endpoints: [\"r1:e1-2\", \"host:veth-r1\"]\n"));
    }

    #[test]
    fn prune_removes_links_on_node() {
        let mut doc = doc();
        assert_eq!(prune_links(&mut doc, "r1"), 2);
        assert_eq!(read_links(&doc).len(), 1);
        assert_eq!(prune_links(&mut doc, "nobody"), 0);
    }
}
