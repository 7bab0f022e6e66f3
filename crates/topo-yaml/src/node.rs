//! Document tree nodes
//!
//! Every node remembers the text it was parsed from. Reading never touches
//! that text; any mutable access clears it on the way down so the emitter
//! regenerates exactly the entries that were touched and nothing else.

use crate::error::PathError;
use crate::scan::split_leading;
use serde_yaml::{Mapping as ValueMapping, Value};

/// How a fresh scalar is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalarStyle {
    /// Plain when unambiguous, double-quoted otherwise
    #[default]
    Auto,
    /// Always double-quoted
    DoubleQuoted,
}

/// A node of the document tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Scalar (string, number, bool, null) or an opaque value kept verbatim
    Scalar(Scalar),
    /// Block or flow mapping
    Mapping(Mapping),
    /// Block or flow sequence
    Sequence(Sequence),
}

/// Scalar leaf
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub(crate) value: Value,
    pub(crate) style: ScalarStyle,
    pub(crate) raw: Option<String>,
}

/// Ordered mapping with string keys
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    pub(crate) entries: Vec<Entry>,
    pub(crate) indent: Option<usize>,
    pub(crate) flow: bool,
    pub(crate) raw: Option<String>,
}

/// One `key: value` pair of a mapping
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entry {
    pub(crate) key: String,
    pub(crate) key_raw: Option<String>,
    pub(crate) value: Node,
    /// Blank and comment lines above the entry
    pub(crate) leading: String,
    /// Whitespace between `:` and an inline value
    pub(crate) gap: Option<String>,
    /// Trailing spaces and comment on the key line
    pub(crate) comment: String,
    /// Authored text from the key to the end of the entry
    pub(crate) raw: Option<String>,
}

/// Ordered sequence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    pub(crate) items: Vec<Item>,
    pub(crate) indent: Option<usize>,
    pub(crate) flow: bool,
    pub(crate) raw: Option<String>,
}

/// One `- value` item of a sequence
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Item {
    pub(crate) value: Node,
    pub(crate) leading: String,
    pub(crate) gap: Option<String>,
    pub(crate) comment: String,
    /// Authored text from the dash to the end of the item
    pub(crate) raw: Option<String>,
}

impl Entry {
    pub(crate) fn new(key: impl Into<String>, value: Node) -> Self {
        Self {
            key: key.into(),
            key_raw: None,
            value,
            leading: String::new(),
            gap: None,
            comment: String::new(),
            raw: None,
        }
    }
}

impl Item {
    pub(crate) fn new(value: Node) -> Self {
        Self {
            value,
            leading: String::new(),
            gap: None,
            comment: String::new(),
            raw: None,
        }
    }
}

impl Scalar {
    /// Semantic value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// String content, if this is a string scalar
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Write style used when regenerated
    #[inline]
    #[must_use]
    pub fn style(&self) -> ScalarStyle {
        self.style
    }
}

impl Node {
    /// Null scalar
    #[must_use]
    pub fn null() -> Self {
        Self::scalar(Value::Null)
    }

    /// Scalar from a semantic value
    #[must_use]
    pub fn scalar(value: Value) -> Self {
        Self::Scalar(Scalar {
            value,
            style: ScalarStyle::Auto,
            raw: None,
        })
    }

    /// String scalar, quoted only when needed
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::scalar(Value::String(s.into()))
    }

    /// String scalar that is always written double-quoted
    ///
    /// Used for endpoint strings such as `eth0:1` so that no reader can take
    /// them for anything but a string.
    #[must_use]
    pub fn quoted(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar {
            value: Value::String(s.into()),
            style: ScalarStyle::DoubleQuoted,
            raw: None,
        })
    }

    /// Empty block mapping
    #[must_use]
    pub fn mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    /// Empty block sequence
    #[must_use]
    pub fn sequence() -> Self {
        Self::Sequence(Sequence::new())
    }

    /// Flow sequence (`[a, b]`) of the given nodes
    #[must_use]
    pub fn flow_sequence(items: impl IntoIterator<Item = Node>) -> Self {
        let mut seq = Sequence::flow();
        for item in items {
            seq.push(item);
        }
        Self::Sequence(seq)
    }

    /// Flow mapping (`{ k: v }`) of the given pairs
    #[must_use]
    pub fn flow_mapping<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Node)>) -> Self {
        let mut map = Mapping::flow();
        for (key, value) in pairs {
            map.insert(key, value);
        }
        Self::Mapping(map)
    }

    /// Build a fresh block-style subtree from a semantic value
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Mapping(map) => {
                let mut out = Mapping::new();
                for (key, value) in map {
                    out.insert(key_string(key), Self::from_value(value));
                }
                Self::Mapping(out)
            }
            Value::Sequence(items) => {
                let mut out = Sequence::new();
                for item in items {
                    out.push(Self::from_value(item));
                }
                Self::Sequence(out)
            }
            Value::Tagged(_) => Self::Scalar(Scalar {
                value: value.clone(),
                style: ScalarStyle::Auto,
                raw: serde_yaml::to_string(value)
                    .ok()
                    .map(|s| s.trim_end().to_string()),
            }),
            scalar => Self::scalar(scalar.clone()),
        }
    }

    /// Semantic value of this subtree
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(s) => s.value.clone(),
            Self::Mapping(m) => {
                let mut out = ValueMapping::new();
                for entry in &m.entries {
                    out.insert(Value::String(entry.key.clone()), entry.value.to_value());
                }
                Value::Mapping(out)
            }
            Self::Sequence(s) => {
                Value::Sequence(s.items.iter().map(|item| item.value.to_value()).collect())
            }
        }
    }

    /// Null scalar
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(s) if s.value.is_null())
    }

    /// String content of a string scalar
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => s.as_str(),
            _ => None,
        }
    }

    /// Scalar view
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Mapping view
    #[inline]
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Mutable mapping view
    #[inline]
    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Sequence view
    #[inline]
    #[must_use]
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable sequence view
    #[inline]
    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Child of a mapping node
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?.get(key)
    }

    /// Mutable child of a mapping node
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.as_mapping_mut()?.get_mut(key)
    }

    /// Node at a key path (`["topology", "nodes"]`)
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Node> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Mutable node at a key path
    pub fn get_path_mut(&mut self, path: &[&str]) -> Option<&mut Node> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.get_mut(first)?.get_path_mut(rest),
        }
    }

    /// Mapping at `path`, creating missing or null levels as empty mappings
    ///
    /// # Errors
    /// `PathError::NotAMapping` if a level exists with another shape
    pub fn ensure_mapping(&mut self, path: &[&str]) -> Result<&mut Mapping, PathError> {
        let child = self.ensure_child(path, Node::mapping)?;
        child
            .as_mapping_mut()
            .ok_or_else(|| PathError::NotAMapping(path.join(".")))
    }

    /// Sequence at `path`, creating missing levels; a null leaf becomes an empty sequence
    ///
    /// # Errors
    /// `PathError::NotAMapping` for a non-mapping intermediate level,
    /// `PathError::NotASequence` if the leaf exists with another shape
    pub fn ensure_sequence(&mut self, path: &[&str]) -> Result<&mut Sequence, PathError> {
        let child = self.ensure_child(path, Node::sequence)?;
        child
            .as_sequence_mut()
            .ok_or_else(|| PathError::NotASequence(path.join(".")))
    }

    fn ensure_child(
        &mut self,
        path: &[&str],
        leaf: fn() -> Node,
    ) -> Result<&mut Node, PathError> {
        let mut walked = Vec::with_capacity(path.len());
        ensure_in(self, path, leaf, &mut walked)
    }
}

fn ensure_in<'a>(
    node: &'a mut Node,
    path: &[&str],
    leaf: fn() -> Node,
    walked: &mut Vec<String>,
) -> Result<&'a mut Node, PathError> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(node);
    };
    let here = if walked.is_empty() {
        "document root".to_string()
    } else {
        walked.join(".")
    };
    let map = node
        .as_mapping_mut()
        .ok_or_else(|| PathError::NotAMapping(here))?;
    if map.get(first).map_or(true, Node::is_null) {
        let fresh = if rest.is_empty() { leaf() } else { Node::mapping() };
        map.insert(*first, fresh);
    }
    walked.push((*first).to_string());
    let child = map
        .get_mut(first)
        .ok_or_else(|| PathError::NotAMapping(walked.join(".")))?;
    ensure_in(child, rest, leaf, walked)
}

fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl Mapping {
    /// Empty block mapping
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty flow mapping
    #[inline]
    #[must_use]
    pub fn flow() -> Self {
        Self {
            flow: true,
            ..Self::default()
        }
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Written in flow style
    #[inline]
    #[must_use]
    pub fn is_flow(&self) -> bool {
        self.flow
    }

    /// Keys in authored order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Pairs in authored order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.value))
    }

    /// Whether `key` is present
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.position(key).map(|i| &self.entries[i].value)
    }

    /// Mutable value for `key`; the entry is regenerated on output
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        let i = self.position(key)?;
        self.raw = None;
        let entry = &mut self.entries[i];
        entry.raw = None;
        Some(&mut entry.value)
    }

    /// Set `key`, replacing the value in place or appending a new entry
    ///
    /// Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Option<Node> {
        let key = key.into();
        self.raw = None;
        match self.position(&key) {
            Some(i) => {
                let entry = &mut self.entries[i];
                entry.raw = None;
                Some(std::mem::replace(&mut entry.value, value))
            }
            None => {
                self.entries.push(Entry::new(key, value));
                None
            }
        }
    }

    /// Remove `key` along with the comment block directly above it
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let i = self.position(key)?;
        self.raw = None;
        let entry = self.entries.remove(i);
        let (detached, _) = split_leading(&entry.leading);
        if let Some(next) = self.entries.get_mut(i) {
            next.leading.insert_str(0, detached);
        }
        Some(entry.value)
    }

    /// Move the entry for `from` to the end of the mapping under key `to`
    ///
    /// The value subtree and the comments attached to the entry travel with
    /// it. Returns `false` if `from` is absent or `to` is already taken.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.contains_key(from);
        }
        if self.contains_key(to) {
            return false;
        }
        let Some(i) = self.position(from) else {
            return false;
        };
        self.raw = None;
        let mut entry = self.entries.remove(i);
        let (detached, attached) = split_leading(&entry.leading);
        if let Some(next) = self.entries.get_mut(i) {
            next.leading.insert_str(0, detached);
        }
        entry.leading = attached.to_string();
        entry.key = to.to_string();
        entry.key_raw = None;
        entry.raw = None;
        self.entries.push(entry);
        true
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }
}

impl Sequence {
    /// Empty block sequence
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty flow sequence
    #[inline]
    #[must_use]
    pub fn flow() -> Self {
        Self {
            flow: true,
            ..Self::default()
        }
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No items
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Written in flow style
    #[inline]
    #[must_use]
    pub fn is_flow(&self) -> bool {
        self.flow
    }

    /// Items in order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().map(|item| &item.value)
    }

    /// Item at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index).map(|item| &item.value)
    }

    /// Mutable item at `index`; the item is regenerated on output
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.raw = None;
        let item = self.items.get_mut(index)?;
        item.raw = None;
        Some(&mut item.value)
    }

    /// Append an item
    pub fn push(&mut self, value: Node) {
        self.raw = None;
        self.items.push(Item::new(value));
    }

    /// Replace the whole item at `index`, keeping the comments above it
    pub fn replace(&mut self, index: usize, value: Node) -> Option<Node> {
        let slot = self.get_mut(index)?;
        Some(std::mem::replace(slot, value))
    }

    /// Remove the item at `index` along with the comment block directly above it
    pub fn remove(&mut self, index: usize) -> Option<Node> {
        if index >= self.items.len() {
            return None;
        }
        self.raw = None;
        let item = self.items.remove(index);
        let (detached, _) = split_leading(&item.leading);
        if let Some(next) = self.items.get_mut(index) {
            next.leading.insert_str(0, detached);
        }
        Some(item.value)
    }

    /// Keep only items for which `keep` returns true; returns how many were removed
    pub fn retain(&mut self, mut keep: impl FnMut(&Node) -> bool) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.items.len() {
            if keep(&self.items[i].value) {
                i += 1;
            } else {
                self.remove(i);
                removed += 1;
            }
        }
        removed
    }
}
