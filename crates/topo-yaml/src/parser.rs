//! Lossless block-structure parser
//!
//! Works line by line on indentation. Block mappings and sequences become
//! tree nodes; everything written inline (scalars, flow collections, block
//! scalars, multi-line plain scalars) is kept as authored text and given its
//! meaning by a standalone `serde_yaml` parse of just that value.

use crate::error::ParseError;
use crate::node::{Entry, Item, Mapping, Node, Scalar, ScalarStyle, Sequence};
use crate::scan::{is_dash, parse_key, split_inline};
use serde_yaml::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    /// Comment or document marker (`---`, `...`, `%YAML`)
    Trivia,
    Content,
}

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    /// End of content, before `\r\n` / `\n`
    end: usize,
    /// Start of the next line
    next: usize,
    indent: usize,
    kind: LineKind,
}

/// Parsed root plus the trivia after it
pub(crate) struct Parsed {
    pub(crate) root: Node,
    pub(crate) trailing: String,
}

pub(crate) struct Parser<'a> {
    src: &'a str,
    lines: Vec<Line>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// `src` must end with a newline
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            lines: split_lines(src),
            pos: 0,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Parsed, ParseError> {
        let root = match self.next_content(0) {
            None => Node::mapping(),
            Some(first) => {
                let line = self.lines[first];
                let content = self.content(first, line.indent);
                if is_dash(content) {
                    Node::Sequence(self.parse_sequence(line.indent, false)?)
                } else if parse_key(content).is_some() {
                    Node::Mapping(self.parse_mapping(line.indent, false)?)
                } else {
                    self.pos = first;
                    self.parse_root_inline(first)?
                }
            }
        };

        if let Some(stray) = self.next_content(self.pos) {
            return Err(ParseError::unsupported(
                stray,
                "content outside the root collection",
            ));
        }
        let trailing = self.slice_from(self.pos).to_string();
        Ok(Parsed { root, trailing })
    }

    fn parse_root_inline(&mut self, first: usize) -> Result<Node, ParseError> {
        let last = self
            .lines
            .iter()
            .rposition(|l| l.kind == LineKind::Content)
            .unwrap_or(first);
        let raw = &self.src[..self.lines[last].next];
        let value: Value = serde_yaml::from_str(raw)?;
        self.pos = last + 1;
        Ok(inline_node(value, raw.to_string()))
    }

    fn parse_mapping(&mut self, indent: usize, compact: bool) -> Result<Mapping, ParseError> {
        let mut mapping = Mapping {
            indent: Some(indent),
            ..Mapping::default()
        };
        if compact {
            let entry = self.parse_entry(self.pos, indent)?;
            mapping.entries.push(entry);
        }

        loop {
            let trivia_start = self.pos;
            let Some(j) = self.next_content(self.pos) else {
                break;
            };
            let line = self.lines[j];
            if line.indent < indent || is_dash(self.content(j, line.indent)) {
                break;
            }
            if line.indent > indent {
                return Err(ParseError::unsupported(j, "unexpected indentation"));
            }
            let leading = self.span(trivia_start, j).to_string();
            let mut entry = self.parse_entry(j, indent)?;
            entry.leading = leading;
            mapping.entries.push(entry);
        }
        Ok(mapping)
    }

    fn parse_entry(&mut self, j: usize, col: usize) -> Result<Entry, ParseError> {
        let line = self.lines[j];
        let content = self.content(j, col);
        let key = parse_key(content)
            .ok_or_else(|| ParseError::unsupported(j, "expected a `key:` entry"))?;
        let value_at = line.start + col + key.after_colon;
        let parts = split_inline(&content[key.after_colon..]);

        let mut entry = Entry::new(key.key.clone(), Node::null());
        entry.key_raw = Some(key.raw.to_string());
        self.pos = j + 1;

        if parts.value.is_empty() {
            entry.comment = parts.comment.to_string();
            match self.block_child(col, false)? {
                Some(child) => entry.value = child,
                None => {
                    if let Some(last) = self.continuation(j, col) {
                        entry.comment.clear();
                        entry.gap = Some(String::new());
                        entry.value = self.inline_value(value_at, last)?;
                    } else {
                        entry.value = Node::Scalar(Scalar {
                            value: Value::Null,
                            style: ScalarStyle::Auto,
                            raw: Some(String::new()),
                        });
                    }
                }
            }
        } else {
            entry.gap = Some(parts.gap.to_string());
            let value_start = value_at + parts.gap.len();
            match self.continuation(j, col) {
                Some(last) => entry.value = self.inline_value(value_start, last)?,
                None => {
                    entry.comment = parts.comment.to_string();
                    entry.value = inline_node(
                        semantic(&self.src[value_at..line.end]),
                        parts.value.to_string(),
                    );
                }
            }
        }

        entry.raw = Some(self.src[line.start + col..self.lines[self.pos - 1].next].to_string());
        Ok(entry)
    }

    fn parse_sequence(&mut self, indent: usize, compact: bool) -> Result<Sequence, ParseError> {
        let mut sequence = Sequence {
            indent: Some(indent),
            ..Sequence::default()
        };
        if compact {
            let item = self.parse_item(self.pos, indent)?;
            sequence.items.push(item);
        }

        loop {
            let trivia_start = self.pos;
            let Some(j) = self.next_content(self.pos) else {
                break;
            };
            let line = self.lines[j];
            if line.indent != indent || !is_dash(self.content(j, line.indent)) {
                if line.indent > indent {
                    return Err(ParseError::unsupported(j, "unexpected indentation"));
                }
                break;
            }
            let leading = self.span(trivia_start, j).to_string();
            let mut item = self.parse_item(j, indent)?;
            item.leading = leading;
            sequence.items.push(item);
        }
        Ok(sequence)
    }

    fn parse_item(&mut self, j: usize, col: usize) -> Result<Item, ParseError> {
        let line = self.lines[j];
        let content = self.content(j, col);
        let after = &content[1..];
        let parts = split_inline(after);
        let value_at = line.start + col + 1;
        let mut item = Item::new(Node::null());

        if parts.value.is_empty() {
            self.pos = j + 1;
            item.comment = parts.comment.to_string();
            match self.block_child(col, true)? {
                Some(child) => item.value = child,
                None => {
                    if let Some(last) = self.continuation(j, col) {
                        item.comment.clear();
                        item.gap = Some(String::new());
                        item.value = self.inline_value(value_at, last)?;
                    } else {
                        item.value = Node::Scalar(Scalar {
                            value: Value::Null,
                            style: ScalarStyle::Auto,
                            raw: Some(String::new()),
                        });
                    }
                }
            }
        } else {
            let value_col = col + 1 + parts.gap.len();
            let rest = &after[parts.gap.len()..];
            item.gap = Some(parts.gap.to_string());
            if is_dash(rest) {
                self.pos = j;
                item.value = Node::Sequence(self.parse_sequence(value_col, true)?);
            } else if parse_key(rest).is_some() {
                self.pos = j;
                item.value = Node::Mapping(self.parse_mapping(value_col, true)?);
            } else {
                self.pos = j + 1;
                let value_start = value_at + parts.gap.len();
                match self.continuation(j, col) {
                    Some(last) => item.value = self.inline_value(value_start, last)?,
                    None => {
                        item.comment = parts.comment.to_string();
                        item.value = inline_node(
                            semantic(&self.src[value_at..line.end]),
                            parts.value.to_string(),
                        );
                    }
                }
            }
        }

        item.raw = Some(self.src[line.start + col..self.lines[self.pos - 1].next].to_string());
        Ok(item)
    }

    /// Nested block collection below a `key:` or `-` at column `col`
    fn block_child(&mut self, col: usize, in_item: bool) -> Result<Option<Node>, ParseError> {
        let Some(c) = self.next_content(self.pos) else {
            return Ok(None);
        };
        let line = self.lines[c];
        let content = self.content(c, line.indent);
        let dash = is_dash(content);
        if line.indent > col {
            if dash {
                return Ok(Some(Node::Sequence(self.parse_sequence(line.indent, false)?)));
            }
            if parse_key(content).is_some() {
                return Ok(Some(Node::Mapping(self.parse_mapping(line.indent, false)?)));
            }
            return Ok(None);
        }
        // indentless sequence as a mapping value
        if line.indent == col && dash && !in_item {
            return Ok(Some(Node::Sequence(self.parse_sequence(col, false)?)));
        }
        Ok(None)
    }

    /// Last line of a value continuing past line `j`, if any
    ///
    /// Continuation lines are indented deeper than `col`; blank and comment
    /// lines inside the run belong to it, those after it do not.
    fn continuation(&mut self, j: usize, col: usize) -> Option<usize> {
        let mut last = None;
        let mut k = j + 1;
        while k < self.lines.len() {
            let line = self.lines[k];
            if line.kind != LineKind::Content {
                k += 1;
                continue;
            }
            if line.indent <= col {
                break;
            }
            last = Some(k);
            k += 1;
        }
        if let Some(last) = last {
            self.pos = last + 1;
        }
        last
    }

    /// Multi-line inline value from byte `start` through line `last`
    fn inline_value(&self, start: usize, last: usize) -> Result<Node, ParseError> {
        let raw = &self.src[start..self.lines[last].next];
        Ok(inline_node(semantic(raw), raw.to_string()))
    }

    fn next_content(&self, from: usize) -> Option<usize> {
        (from..self.lines.len()).find(|&i| self.lines[i].kind == LineKind::Content)
    }

    fn content(&self, j: usize, col: usize) -> &'a str {
        let line = self.lines[j];
        &self.src[line.start + col..line.end]
    }

    fn span(&self, from: usize, to: usize) -> &'a str {
        let start = self.lines.get(from).map_or(self.src.len(), |l| l.start);
        let end = self.lines.get(to).map_or(self.src.len(), |l| l.start);
        &self.src[start..end]
    }

    fn slice_from(&self, from: usize) -> &'a str {
        let start = self.lines.get(from).map_or(self.src.len(), |l| l.start);
        &self.src[start..]
    }
}

/// Meaning of an inline value written after `key:` or `-`
fn semantic(text: &str) -> Value {
    let snippet = format!("k:{text}");
    match serde_yaml::from_str::<Value>(&snippet) {
        Ok(Value::Mapping(mut map)) => map
            .remove(&Value::String("k".to_string()))
            .unwrap_or(Value::Null),
        _ => Value::String(text.trim().to_string()),
    }
}

fn inline_node(value: Value, raw: String) -> Node {
    let text = raw.trim_start();
    match value {
        Value::Sequence(_) if text.starts_with('[') => {
            let mut node = Node::from_value(&value);
            if let Node::Sequence(seq) = &mut node {
                seq.flow = true;
                seq.raw = Some(raw);
            }
            node
        }
        Value::Mapping(_) if text.starts_with('{') => {
            let mut node = Node::from_value(&value);
            if let Node::Mapping(map) = &mut node {
                map.flow = true;
                map.raw = Some(raw);
            }
            node
        }
        value => Node::Scalar(Scalar {
            value,
            style: ScalarStyle::Auto,
            raw: Some(raw),
        }),
    }
}

/// Give alias, anchor and tag values the meaning they have in the whole
/// document; a standalone parse of their text cannot see the anchors
pub(crate) fn resolve_references(node: &mut Node, resolved: &Value) {
    match node {
        Node::Mapping(map) => {
            let Value::Mapping(values) = resolved else {
                return;
            };
            for entry in &mut map.entries {
                if let Some(value) = values.get(entry.key.as_str()) {
                    resolve_references(&mut entry.value, value);
                }
            }
        }
        Node::Sequence(seq) => {
            let Value::Sequence(values) = resolved else {
                return;
            };
            for (item, value) in seq.items.iter_mut().zip(values) {
                resolve_references(&mut item.value, value);
            }
        }
        Node::Scalar(scalar) => {
            let Some(raw) = scalar.raw.as_deref().filter(|raw| is_reference(raw)) else {
                return;
            };
            if scalar.value != *resolved {
                let raw = raw.to_string();
                *node = inline_node(resolved.clone(), raw);
            }
        }
    }
}

fn is_reference(raw: &str) -> bool {
    let text = raw.trim_start();
    text.starts_with(['*', '&', '!'])
        || (text.starts_with(['[', '{']) && text.contains(['*', '&']))
}

fn split_lines(src: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    while start < src.len() {
        let newline = src[start..].find('\n').map_or(src.len(), |i| start + i);
        let next = (newline + 1).min(src.len());
        let end = if newline > start && src.as_bytes()[newline - 1] == b'\r' {
            newline - 1
        } else {
            newline
        };
        let text = &src[start..end];
        let body = text.trim_start_matches(' ');
        let indent = text.len() - body.len();
        let kind = if body.trim().is_empty() {
            LineKind::Blank
        } else if body.starts_with('#')
            || (indent == 0 && is_document_marker(text))
        {
            LineKind::Trivia
        } else {
            LineKind::Content
        };
        lines.push(Line {
            start,
            end,
            next,
            indent,
            kind,
        });
        start = next;
    }
    lines
}

fn is_document_marker(text: &str) -> bool {
    text.starts_with('%')
        || ((text.starts_with("---") || text.starts_with("..."))
            && text[3..].trim().is_empty())
}
