//! Parsed YAML document
//!
//! [`Document`] owns the tree plus the formatting facts that live outside it
//! (line ending, final newline, trailing comments). An unmodified document
//! serializes to exactly the bytes it was parsed from.

use crate::emitter::Emitter;
use crate::error::{ParseError, PathError};
use crate::node::{Mapping, Node, Sequence};
use crate::parser::{resolve_references, Parser};
use serde_yaml::Value;
use std::fmt::{self, Display, Formatter};

/// Default indentation step for regenerated blocks
pub const DEFAULT_INDENT: usize = 2;

/// A YAML document that round-trips comments, order and styling
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
    trailing: String,
    eol: &'static str,
    final_newline: bool,
    indent_step: usize,
}

impl Document {
    /// Parse YAML text
    ///
    /// # Errors
    /// - `ParseError::Syntax` if the text is not valid YAML
    /// - `ParseError::Unsupported` for constructs the lossless tree cannot hold
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let has_content = text.lines().any(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        });
        let resolved = if has_content {
            Some(serde_yaml::from_str::<Value>(text)?)
        } else {
            None
        };

        let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let final_newline = text.is_empty() || text.ends_with('\n');
        let normalized = if final_newline {
            text.to_string()
        } else {
            format!("{text}{eol}")
        };
        let mut parsed = Parser::new(&normalized).parse()?;
        if let Some(resolved) = &resolved {
            resolve_references(&mut parsed.root, resolved);
        }

        Ok(Self {
            root: parsed.root,
            trailing: parsed.trailing,
            eol,
            final_newline,
            indent_step: DEFAULT_INDENT,
        })
    }

    /// Empty document whose root is a mapping
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::mapping(),
            trailing: String::new(),
            eol: "\n",
            final_newline: true,
            indent_step: DEFAULT_INDENT,
        }
    }

    /// Set the indentation step used for regenerated blocks
    #[inline]
    #[must_use]
    pub fn with_indent_step(mut self, step: usize) -> Self {
        self.indent_step = step.max(1);
        self
    }

    /// Serialize back to text
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut emitter = Emitter::new(self.eol, self.indent_step);
        emitter.root(&self.root);
        let mut out = emitter.finish();
        out.push_str(&self.trailing);
        if !self.final_newline && out.ends_with(self.eol) {
            out.truncate(out.len() - self.eol.len());
        }
        out
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Mutable root node
    #[inline]
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Semantic value of the whole document
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.root.to_value()
    }

    /// Node at a key path
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Node> {
        self.root.get_path(path)
    }

    /// Mutable node at a key path
    pub fn get_path_mut(&mut self, path: &[&str]) -> Option<&mut Node> {
        self.root.get_path_mut(path)
    }

    /// Mapping at `path`, created if missing
    ///
    /// # Errors
    /// `PathError` if a level has another shape
    pub fn ensure_mapping(&mut self, path: &[&str]) -> Result<&mut Mapping, PathError> {
        self.root.ensure_mapping(path)
    }

    /// Sequence at `path`, created if missing
    ///
    /// # Errors
    /// `PathError` if a level has another shape
    pub fn ensure_sequence(&mut self, path: &[&str]) -> Result<&mut Sequence, PathError> {
        self.root.ensure_sequence(path)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOPOLOGY: &str = r#"# lab for the demo
name: demo # inline

topology:
  defaults:
    kind: nokia_srlinux
  nodes:
    # spine layer
    r1:
      kind: nokia_srlinux   # default kind
      image: ghcr.io/nokia/srlinux:latest

    r2: {kind: linux}
  links:
  - endpoints: ["r1:e1-1", "r2:eth1"]
  - type: vxlan
    endpoint:
      node: r1
      interface: e1-2
    remote: 10.0.0.1
    vni: 100
"#;

    #[test]
    fn unmodified_round_trip_is_identical() {
        let doc = Document::parse(TOPOLOGY).unwrap();
        assert_eq!(doc.serialize(), TOPOLOGY);
    }

    #[test]
    fn round_trip_without_final_newline_and_crlf() {
        let text = "a: 1\r\nb:\r\n  - x\r\n  - y";
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.serialize(), text);
    }

    #[test]
    fn empty_document_round_trips() {
        let doc = Document::parse("").unwrap();
        assert_eq!(doc.serialize(), "");
        let doc = Document::parse("# only a comment\n").unwrap();
        assert_eq!(doc.serialize(), "# only a comment\n");
    }

    #[test]
    fn mutable_access_without_change_keeps_bytes() {
        let mut doc = Document::parse(TOPOLOGY).unwrap();
        let _ = doc.get_path_mut(&["topology", "nodes", "r1"]);
        assert_eq!(doc.serialize(), TOPOLOGY);
    }

    #[test]
    fn appended_node_keeps_comments() {
        let mut doc = Document::parse(TOPOLOGY).unwrap();
        let nodes = doc.ensure_mapping(&["topology", "nodes"]).unwrap();
        let mut r3 = Mapping::new();
        r3.insert("kind", Node::string("linux"));
        nodes.insert("r3", Node::Mapping(r3));

        let out = doc.serialize();
        assert!(out.contains("    # spine layer\n    r1:\n"));
        assert!(out.contains("kind: nokia_srlinux   # default kind\n"));
        assert!(out.contains("    r2: {kind: linux}\n    r3:\n      kind: linux\n  links:\n"));
    }

    #[test]
    fn edited_scalar_keeps_trailing_comment() {
        let mut doc = Document::parse(TOPOLOGY).unwrap();
        doc.ensure_mapping(&["topology", "nodes", "r1"])
            .unwrap()
            .insert("kind", Node::string("nokia_srsim"));

        let out = doc.serialize();
        assert!(out.contains("      kind: nokia_srsim   # default kind\n"));
        assert!(out.contains("name: demo # inline\n"));
    }

    #[test]
    fn removing_node_drops_attached_comment() {
        let mut doc = Document::parse(TOPOLOGY).unwrap();
        doc.ensure_mapping(&["topology", "nodes"]).unwrap().remove("r1");

        let out = doc.serialize();
        assert!(!out.contains("spine layer"));
        assert!(out.contains("  nodes:\n\n    r2: {kind: linux}\n"));
    }

    #[test]
    fn replacing_sequence_item_keeps_neighbours() {
        let mut doc = Document::parse(TOPOLOGY).unwrap();
        let links = doc.ensure_sequence(&["topology", "links"]).unwrap();
        links.replace(
            0,
            Node::flow_mapping([(
                "endpoints",
                Node::flow_sequence([Node::quoted("r1:e1-1"), Node::quoted("r3:eth1")]),
            )]),
        );

        let out = doc.serialize();
        assert!(out.contains("  - { endpoints: [\"r1:e1-1\", \"r3:eth1\"] }\n  - type: vxlan\n"));
    }

    #[test]
    fn invalid_yaml_is_a_syntax_error() {
        let err = Document::parse("a: [1, 2\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }

    #[test]
    fn aliases_take_their_anchored_value() {
        let text = "\
base: &img ghcr.io/nokia/srlinux:latest
nodes:
  r1:
    image: *img
  r2: {image: *img, kind: linux}
  list: [*img, x]
";
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.serialize(), text);

        let expected: Value = serde_yaml::from_str(text).unwrap();
        assert_eq!(doc.to_value(), expected);
        assert_eq!(
            doc.get_path(&["nodes", "r1", "image"]).and_then(Node::as_str),
            Some("ghcr.io/nokia/srlinux:latest")
        );
        assert_eq!(
            doc.get_path(&["nodes", "r2", "kind"]).and_then(Node::as_str),
            Some("linux")
        );
    }
}
