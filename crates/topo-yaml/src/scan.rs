//! Line-level scanning helpers shared by the parser and the emitter

use serde_yaml::Value;

/// Where a string is being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Context {
    /// Block mapping value, block sequence item or key
    Block,
    /// Inside `[...]` or `{...}`
    Flow,
}

/// Remainder of a line after `key:` or `-`, split into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InlineParts<'a> {
    /// Whitespace between the indicator and the value
    pub(crate) gap: &'a str,
    /// Value text without surrounding whitespace
    pub(crate) value: &'a str,
    /// Everything after the value: trailing spaces and an optional `# comment`
    pub(crate) comment: &'a str,
}

/// Split the rest of a line into gap, value and trailing comment
pub(crate) fn split_inline(rest: &str) -> InlineParts<'_> {
    let body = rest.trim_start_matches([' ', '\t']);
    let gap_len = rest.len() - body.len();
    if body.is_empty() || body.starts_with('#') {
        return InlineParts {
            gap: "",
            value: "",
            comment: rest,
        };
    }

    let end = comment_start(body).unwrap_or(body.len());
    let value = body[..end].trim_end_matches([' ', '\t']);
    InlineParts {
        gap: &rest[..gap_len],
        value,
        comment: &rest[gap_len + value.len()..],
    }
}

/// Byte offset of a `#` that starts a comment, honouring quoted scalars
fn comment_start(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut i = 0;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(b'"') => {
                if c == b'\\' {
                    i += 2;
                    continue;
                }
                if c == b'"' {
                    quote = None;
                }
            }
            Some(_) => {
                if c == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    quote = None;
                }
            }
            None => {
                let opens = i == 0 || matches!(bytes[i - 1], b' ' | b'\t' | b'[' | b'{' | b',');
                if (c == b'"' || c == b'\'') && opens {
                    quote = Some(c);
                } else if c == b'#' && i > 0 && matches!(bytes[i - 1], b' ' | b'\t') {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

/// A mapping key found at the start of a line's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyParts<'a> {
    /// Semantic key
    pub(crate) key: String,
    /// Key as authored (quotes included)
    pub(crate) raw: &'a str,
    /// Byte offset just past the `:`
    pub(crate) after_colon: usize,
}

/// Parse `key:` at the start of `content`; `None` if the content is not a mapping entry
pub(crate) fn parse_key(content: &str) -> Option<KeyParts<'_>> {
    let bytes = content.as_bytes();
    match bytes.first()? {
        b'"' | b'\'' => {
            let close = closing_quote(bytes)?;
            let raw = &content[..=close];
            let rest = &content[close + 1..];
            let trimmed = rest.trim_start_matches([' ', '\t']);
            let colon = close + 1 + (rest.len() - trimmed.len());
            if !is_value_indicator(bytes, colon) {
                return None;
            }
            let key = serde_yaml::from_str::<String>(raw).ok()?;
            Some(KeyParts {
                key,
                raw,
                after_colon: colon + 1,
            })
        }
        b'[' | b'{' | b'#' | b'?' | b'|' | b'>' | b'%' | b'@' | b'`' => None,
        b'-' if bytes.len() == 1 || matches!(bytes[1], b' ' | b'\t') => None,
        _ => {
            for (i, &c) in bytes.iter().enumerate() {
                if c == b'#' && i > 0 && matches!(bytes[i - 1], b' ' | b'\t') {
                    return None;
                }
                if is_value_indicator(bytes, i) {
                    let raw = content[..i].trim_end_matches([' ', '\t']);
                    if raw.is_empty() {
                        return None;
                    }
                    return Some(KeyParts {
                        key: raw.to_string(),
                        raw,
                        after_colon: i + 1,
                    });
                }
            }
            None
        }
    }
}

/// `:` at `i` followed by whitespace or end of line
fn is_value_indicator(bytes: &[u8], i: usize) -> bool {
    bytes.get(i) == Some(&b':') && matches!(bytes.get(i + 1), None | Some(b' ' | b'\t'))
}

fn closing_quote(bytes: &[u8]) -> Option<usize> {
    let quote = bytes[0];
    let mut i = 1;
    while i < bytes.len() {
        let c = bytes[i];
        if quote == b'"' && c == b'\\' {
            i += 2;
            continue;
        }
        if c == quote {
            if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Content is a block sequence item (`-` followed by whitespace or end of line)
pub(crate) fn is_dash(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

/// Split leading trivia into the part that stays in place and the comment
/// block attached directly above an entry
pub(crate) fn split_leading(leading: &str) -> (&str, &str) {
    let mut split = 0;
    let mut offset = 0;
    for line in leading.split_inclusive('\n') {
        offset += line.len();
        if !line.trim_start().starts_with('#') {
            split = offset;
        }
    }
    leading.split_at(split)
}

/// Whether `s` can be written as a plain scalar and read back as the same string
pub(crate) fn plain_safe(s: &str, context: Context) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    if s.trim() != s || s.chars().any(char::is_control) {
        return false;
    }
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return false;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return false;
    }
    if context == Context::Flow && s.contains([':', ',', '[', ']', '{', '}']) {
        return false;
    }
    matches!(serde_yaml::from_str::<Value>(s), Ok(Value::String(ref parsed)) if parsed == s)
}

/// Render a double-quoted scalar
pub(crate) fn double_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a string plainly when safe in `context`, double-quoted otherwise
pub(crate) fn render_string(s: &str, context: Context) -> String {
    if plain_safe(s, context) {
        s.to_string()
    } else {
        double_quote(s)
    }
}
