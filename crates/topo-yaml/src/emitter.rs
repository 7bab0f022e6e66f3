//! Tree to text
//!
//! Clean entries and items are copied from their authored text. Dirty ones
//! regenerate their own line(s) and recurse, so untouched descendants keep
//! their bytes.

use crate::node::{Entry, Item, Mapping, Node, Scalar, ScalarStyle, Sequence};
use crate::scan::{double_quote, render_string, Context};
use serde_yaml::Value;

pub(crate) struct Emitter<'a> {
    out: String,
    eol: &'a str,
    step: usize,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(eol: &'a str, step: usize) -> Self {
        Self {
            out: String::new(),
            eol,
            step: step.max(1),
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    pub(crate) fn root(&mut self, node: &Node) {
        match node {
            Node::Mapping(m) if is_block(node) || (m.raw.is_none() && !m.is_empty()) => {
                self.mapping_block(m, m.indent.unwrap_or(0), false);
            }
            Node::Sequence(s) if is_block(node) || (s.raw.is_none() && !s.is_empty()) => {
                self.sequence_block(s, s.indent.unwrap_or(0), false);
            }
            Node::Mapping(m) if m.is_empty() && m.raw.is_none() => {}
            other => {
                let text = inline(other, Context::Block);
                self.out.push_str(&text);
                if !text.ends_with('\n') {
                    self.out.push_str(self.eol);
                }
            }
        }
    }

    fn mapping_block(&mut self, m: &Mapping, indent: usize, compact_first: bool) {
        for (i, entry) in m.entries.iter().enumerate() {
            if !(compact_first && i == 0) {
                self.out.push_str(&entry.leading);
                self.indent(indent);
            }
            self.entry(entry, indent);
        }
    }

    fn entry(&mut self, entry: &Entry, indent: usize) {
        if let Some(raw) = &entry.raw {
            self.out.push_str(raw);
            return;
        }
        match &entry.key_raw {
            Some(raw) => self.out.push_str(raw),
            None => self.out.push_str(&render_string(&entry.key, Context::Block)),
        }
        self.out.push(':');
        self.after_indicator(&entry.value, indent, entry.gap.as_deref(), &entry.comment, false);
    }

    fn sequence_block(&mut self, s: &Sequence, indent: usize, compact_first: bool) {
        for (i, item) in s.items.iter().enumerate() {
            let first = compact_first && i == 0;
            if let Some(raw) = &item.raw {
                if !first {
                    self.out.push_str(&item.leading);
                    self.indent(indent);
                }
                self.out.push_str(raw);
                continue;
            }
            if is_compactable(item) {
                if !first {
                    self.out.push_str(&item.leading);
                    compact_leading(&item.value, &mut self.out);
                    self.indent(indent);
                }
                self.compact_item(&item.value, indent);
                continue;
            }
            if !first {
                self.out.push_str(&item.leading);
                self.indent(indent);
            }
            self.out.push('-');
            self.after_indicator(&item.value, indent, item.gap.as_deref(), &item.comment, true);
        }
    }

    /// `- key: v` / `- - v` with the child collection starting on the dash line
    fn compact_item(&mut self, value: &Node, indent: usize) {
        match value {
            Node::Mapping(m) => {
                let child = child_indent(m.indent, indent, false, self.step);
                self.out.push('-');
                self.indent(child - indent - 1);
                self.mapping_block(m, child, true);
            }
            Node::Sequence(s) => {
                let child = child_indent(s.indent, indent, false, self.step);
                self.out.push('-');
                self.indent(child - indent - 1);
                self.sequence_block(s, child, true);
            }
            Node::Scalar(_) => {}
        }
    }

    fn after_indicator(
        &mut self,
        value: &Node,
        indent: usize,
        gap: Option<&str>,
        comment: &str,
        in_item: bool,
    ) {
        match value {
            Node::Mapping(m) if is_block(value) => {
                self.out.push_str(comment);
                self.out.push_str(self.eol);
                let child = child_indent(m.indent, indent, false, self.step);
                self.mapping_block(m, child, false);
            }
            Node::Sequence(s) if is_block(value) => {
                self.out.push_str(comment);
                self.out.push_str(self.eol);
                let child = child_indent(s.indent, indent, !in_item, self.step);
                self.sequence_block(s, child, false);
            }
            _ => {
                let text = inline(value, Context::Block);
                if text.is_empty() {
                    self.out.push_str(comment);
                    self.out.push_str(self.eol);
                    return;
                }
                self.out.push_str(gap.unwrap_or(" "));
                self.out.push_str(&text);
                if !text.ends_with('\n') {
                    self.out.push_str(comment);
                    self.out.push_str(self.eol);
                }
            }
        }
    }

    fn indent(&mut self, n: usize) {
        self.out.extend(std::iter::repeat(' ').take(n));
    }
}

/// Non-empty block collection
fn is_block(node: &Node) -> bool {
    match node {
        Node::Mapping(m) => !m.flow && !m.is_empty(),
        Node::Sequence(s) => !s.flow && !s.is_empty(),
        Node::Scalar(_) => false,
    }
}

fn is_compactable(item: &Item) -> bool {
    is_block(&item.value) && !item.comment.contains('#')
}

/// Trivia of the first descendant that shares the dash line of a compact item
fn compact_leading(node: &Node, out: &mut String) {
    match node {
        Node::Mapping(m) => {
            if let Some(first) = m.entries.first() {
                out.push_str(&first.leading);
            }
        }
        Node::Sequence(s) => {
            if let Some(first) = s.items.first() {
                out.push_str(&first.leading);
                if first.raw.is_none() && is_compactable(first) {
                    compact_leading(&first.value, out);
                }
            }
        }
        Node::Scalar(_) => {}
    }
}

fn child_indent(stored: Option<usize>, parent: usize, allow_same: bool, step: usize) -> usize {
    match stored {
        Some(i) if i > parent || (allow_same && i == parent) => i,
        _ => parent + step,
    }
}

/// Single-line (or authored multi-line) rendering of a node
pub(crate) fn inline(node: &Node, context: Context) -> String {
    match node {
        Node::Scalar(s) => match &s.raw {
            Some(raw) if context == Context::Block || !raw.contains('\n') => raw.clone(),
            _ => scalar_text(s, context),
        },
        Node::Mapping(m) => {
            if let Some(raw) = m.raw.as_ref().filter(|_| m.flow) {
                return raw.clone();
            }
            if m.is_empty() {
                return "{}".to_string();
            }
            let pairs: Vec<String> = m
                .entries
                .iter()
                .map(|e| {
                    let key = e
                        .key_raw
                        .clone()
                        .unwrap_or_else(|| render_string(&e.key, Context::Flow));
                    format!("{key}: {}", inline(&e.value, Context::Flow))
                })
                .collect();
            format!("{{ {} }}", pairs.join(", "))
        }
        Node::Sequence(s) => {
            if let Some(raw) = s.raw.as_ref().filter(|_| s.flow) {
                return raw.clone();
            }
            let items: Vec<String> = s
                .items
                .iter()
                .map(|item| inline(&item.value, Context::Flow))
                .collect();
            format!("[{}]", items.join(", "))
        }
    }
}

fn scalar_text(s: &Scalar, context: Context) -> String {
    match (&s.value, s.style) {
        (Value::String(text), ScalarStyle::DoubleQuoted) => double_quote(text),
        (Value::String(text), ScalarStyle::Auto) => render_string(text, context),
        (Value::Null, _) => "null".to_string(),
        (Value::Bool(b), _) => b.to_string(),
        (Value::Number(n), _) => n.to_string(),
        (other, _) => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(node: &Node) -> String {
        let mut emitter = Emitter::new("\n", 2);
        emitter.root(node);
        emitter.finish()
    }

    #[test]
    fn fresh_tree_block_layout() {
        let mut root = Node::mapping();
        let nodes = root.ensure_mapping(&["topology", "nodes"]).unwrap();
        let mut r1 = crate::Mapping::new();
        r1.insert("kind", Node::string("nokia_srlinux"));
        nodes.insert("r1", Node::Mapping(r1));

        assert_eq!(
            emit(&root),
            "topology:\n  nodes:\n    r1:\n      kind: nokia_srlinux\n"
        );
    }

    #[test]
    fn fresh_sequence_of_mappings_is_compact() {
        let mut root = Node::mapping();
        let links = root.ensure_sequence(&["links"]).unwrap();
        let mut link = crate::Mapping::new();
        link.insert(
            "endpoints",
            Node::flow_sequence([Node::quoted("r1:e1"), Node::quoted("r2:e1")]),
        );
        link.insert("mtu", Node::scalar(Value::Number(9000.into())));
        links.push(Node::Mapping(link));

        assert_eq!(
            emit(&root),
            "links:\n  - endpoints: [\"r1:e1\", \"r2:e1\"]\n    mtu: 9000\n"
        );
    }

    #[test]
    fn flow_mapping_quotes_ambiguous_strings() {
        let node = Node::flow_mapping([
            ("node", Node::string("r1")),
            ("interface", Node::string("eth0:1")),
        ]);
        assert_eq!(
            inline(&node, Context::Block),
            "{ node: r1, interface: \"eth0:1\" }"
        );
    }

    #[test]
    fn empty_collections_render_inline() {
        let mut root = Node::mapping();
        root.ensure_mapping(&["a"]).unwrap();
        root.ensure_sequence(&["b"]).unwrap();
        assert_eq!(emit(&root), "a: {}\nb: []\n");
    }
}
